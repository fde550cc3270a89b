//! Error taxonomy for the BOB container engine.
//!
//! Every public operation returns `Result<T, BobError>`. There is no panic
//! path for expected failures and no C-style sentinel return — the original
//! design notes describe an errno-style channel, but this is a systems
//! language with a real sum type, so the channel is just `Result`.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BobError {
    /// Caller passed something structurally wrong: a buffer/length mismatch,
    /// a `cuesize` that isn't a multiple of `blocksize`, etc.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Propagated unchanged from the syscall shims: "no space", "permission
    /// denied", "exists" (create), and so on.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Varint overflow/overlong, unknown record kind, unknown config id,
    /// unexpected EOF inside a record, header bounds/alignment failure.
    /// All format-corruption failures collapse to this single variant —
    /// the caller's only recourse is to treat the file as unreadable.
    #[error("corrupt container: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, BobError>;
