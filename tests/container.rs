use bobfile::{Bob, BobError, Config};
use tempfile::tempdir;

fn fresh_path(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    dir.path().join(name)
}

/// S1 + property: a freshly created, never-written-to container reports
/// an empty current object.
#[test]
fn create_with_no_writes_reports_empty_current() {
    let dir = tempdir().unwrap();
    let path = fresh_path(&dir, "s1.bob");

    let bob = Bob::create(Config::default(), &path).unwrap();
    assert_eq!(bob.current(), &[] as &[u8]);
    bob.close().unwrap();

    let bob = Bob::open(&path).unwrap();
    assert_eq!(bob.current(), &[] as &[u8]);
}

/// S2: explicit blocksize/cuesize, short payload round-trips through
/// close/open.
#[test]
fn small_payload_roundtrips_through_close_and_reopen() {
    let dir = tempdir().unwrap();
    let path = fresh_path(&dir, "s2.bob");

    let cfg = Config::default().with_blocksize(512).with_cuesize(1024);
    let mut bob = Bob::create(cfg, &path).unwrap();
    bob.set(b"hello").unwrap();
    bob.close().unwrap();

    let bob = Bob::open(&path).unwrap();
    assert_eq!(bob.current(), b"hello");
}

/// Property 4 (container round-trip), generalized to a handful of byte
/// strings and default auto-resolved sizes.
#[test]
fn container_roundtrip_for_several_payloads() {
    for payload in [&b""[..], b"x", b"the quick brown fox", &[0xABu8; 4096][..]] {
        let dir = tempdir().unwrap();
        let path = fresh_path(&dir, "roundtrip.bob");

        let mut bob = Bob::create(Config::default(), &path).unwrap();
        bob.set(payload).unwrap();
        bob.close().unwrap();

        let bob = Bob::open(&path).unwrap();
        assert_eq!(bob.current(), payload);
    }
}

/// S3: a long alternating sequence of replacements; only the last one
/// should survive a close/reopen.
#[test]
fn alternating_sets_keep_only_the_last_payload() {
    let dir = tempdir().unwrap();
    let path = fresh_path(&dir, "s3.bob");

    let mut bob = Bob::create(Config::default(), &path).unwrap();
    let mut last = Vec::new();
    for i in 0..100 {
        let payload = if i % 2 == 0 { b"aaaa".to_vec() } else { b"bbbb".to_vec() };
        bob.set(&payload).unwrap();
        last = payload;
    }
    bob.close().unwrap();

    let bob = Bob::open(&path).unwrap();
    assert_eq!(bob.current(), &last[..]);
}

/// Property 5: setting the same bytes twice in a row still reads back
/// correctly and doesn't corrupt the alias into `data`.
#[test]
fn repeated_identical_set_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = fresh_path(&dir, "idempotent.bob");

    let mut bob = Bob::create(Config::default(), &path).unwrap();
    bob.set(b"same").unwrap();
    let size_after_first = std::fs::metadata(&path).unwrap().len();
    bob.set(b"same").unwrap();
    let size_after_second = std::fs::metadata(&path).unwrap().len();
    assert_eq!(bob.current(), b"same");
    // One more record was appended, not a whole new cue segment.
    assert!(size_after_second >= size_after_first);
    bob.close().unwrap();
}

/// S6 / property 6: a payload large enough to force at least one cue
/// rollover still survives close/reopen, and the file grows to
/// accommodate at least a full cue.
#[test]
fn payload_spanning_a_full_cue_forces_rollover_and_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = fresh_path(&dir, "cue_rollover.bob");

    let cfg = Config::default().with_blocksize(512).with_cuesize(4096);
    let mut bob = Bob::create(cfg, &path).unwrap();

    // Push several payloads whose cumulative encoded size exceeds one cue
    // (4096 B), forcing at least one `new_cue` + `zap` cycle.
    let payload = vec![0x42u8; 4096];
    for _ in 0..3 {
        bob.set(&payload).unwrap();
    }
    bob.flush().unwrap();
    bob.close().unwrap();

    let bob = Bob::open(&path).unwrap();
    assert_eq!(bob.current(), &payload[..]);
}

/// Property 8: after a successful set + flush, the file size is a
/// multiple of the resolved blocksize.
#[test]
fn file_size_stays_block_aligned_after_flush() {
    let dir = tempdir().unwrap();
    let path = fresh_path(&dir, "aligned.bob");

    let cfg = Config::default().with_blocksize(512).with_cuesize(2048);
    let mut bob = Bob::create(cfg, &path).unwrap();
    bob.set(b"some payload data").unwrap();
    bob.flush().unwrap();

    let size = std::fs::metadata(&path).unwrap().len();
    assert_eq!(size % bob.resolved_blocksize(), 0);
}

/// `create` on an already-occupied path fails rather than truncating it.
#[test]
fn create_refuses_to_overwrite_existing_path() {
    let dir = tempdir().unwrap();
    let path = fresh_path(&dir, "exists.bob");
    Bob::create(Config::default(), &path).unwrap().close().unwrap();

    let err = Bob::create(Config::default(), &path).unwrap_err();
    assert!(bobfile::handle::is_already_exists(&err));
}

/// Opening a file with a corrupted magic reports a format error, not a
/// panic.
#[test]
fn open_rejects_bad_magic() {
    let dir = tempdir().unwrap();
    let path = fresh_path(&dir, "badmagic.bob");
    Bob::create(Config::default(), &path).unwrap().close().unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0] = b'X';
    std::fs::write(&path, &bytes).unwrap();

    match Bob::open(&path) {
        Err(BobError::Corrupt(_)) => {}
        other => panic!("expected Corrupt, got {other:?}"),
    }
}
