//! Error model for the whole crate.
//!
//! Dispositions:
//! - `Io`, `NotFound`: transient, callers log and continue.
//! - `TruncatedRecord`, `EncodingTooLarge`, `IndexSkew`, `WriterClosed`: fatal, callers abort.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path not found in store: {0}")]
    NotFound(String),

    #[error("record truncated while reading")]
    TruncatedRecord,

    #[error("path too long to encode: {0} bytes (max 65535)")]
    EncodingTooLarge(usize),

    #[error("index points at offset whose stored path {stored:?} does not match the lookup key {key:?}; database is corrupt")]
    IndexSkew { key: String, stored: String },

    #[error("write attempted after the writer was closed")]
    WriterClosed,

    #[error("missing index sidecar file: {0}")]
    MissingIndex(PathBuf),

    #[error("malformed index file: {0}")]
    IndexDecode(#[from] serde_json::Error),

    #[error("walker already started")]
    AlreadyStarted,

    #[error("walker is not in a state from which this call is valid")]
    InvalidState,
}
