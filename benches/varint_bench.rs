use bobfile::buffered::BufferedFile;
use bobfile::varint::{decode_u64, encode_vec, Decoder};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_varint(c: &mut Criterion) {
    let magnitudes = [0u64, 127, 128, 1 << 20, 1 << 40, u64::MAX];

    c.bench_function("varint_encode", |b| {
        b.iter(|| {
            for &n in &magnitudes {
                black_box(encode_vec(black_box(n)));
            }
        })
    });

    let encoded: Vec<Vec<u8>> = magnitudes.iter().map(|&n| encode_vec(n)).collect();
    c.bench_function("varint_decode_whole_buffer", |b| {
        b.iter(|| {
            for buf in &encoded {
                black_box(decode_u64(black_box(buf)).unwrap());
            }
        })
    });

    c.bench_function("varint_decode_incremental", |b| {
        b.iter(|| {
            for buf in &encoded {
                let mut dec = Decoder::new();
                for &byte in buf {
                    if let Some(v) = dec.step(byte).unwrap() {
                        black_box(v);
                        break;
                    }
                }
            }
        })
    });
}

fn bench_buffered_write_slow_path(c: &mut Criterion) {
    let payload = vec![0xABu8; 64 * 1024];
    c.bench_function("buffered_write_crossing_block_boundaries", |b| {
        b.iter(|| {
            let file = tempfile::tempfile().unwrap();
            let mut bf = BufferedFile::new_write(file, 4096);
            bf.write(black_box(&payload)).unwrap();
            bf.commit().unwrap();
        })
    });
}

criterion_group!(benches, bench_varint, bench_buffered_write_slow_path);
criterion_main!(benches);
