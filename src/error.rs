//! Unified error hierarchy for the CAFC container.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type returned by every public operation in this crate.
#[derive(Error, Debug)]
pub enum CafcError {
    #[error("container format error")]
    Format(#[from] FormatError),

    #[error("cryptographic operation failed")]
    Crypto(#[from] CryptoError),

    #[error("master key operation failed")]
    MasterKey(#[from] MasterKeyError),

    #[error("storage error")]
    Storage(#[from] StorageError),

    #[error("seek error")]
    Seek(#[from] SeekError),

    #[error("truncate error")]
    Truncate(#[from] TruncateError),

    #[error("channel is closed")]
    Closed(#[from] ClosedError),

    #[error("invalid argument")]
    Argument(#[from] ArgumentError),
}

/// Errors arising from a malformed or inconsistent on-disk container.
///
/// Non-recoverable for the affected file: once raised, the caller should
/// stop reading this container rather than retry.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("bad magic: expected \"CENC\"")]
    BadMagic,

    #[error("unsupported container version: {found}")]
    UnsupportedVersion { found: u16 },

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(u32),

    #[error("invalid chunk length prefix: {len} (bound {bound})")]
    InvalidLengthPrefix { len: u32, bound: u32 },

    #[error("container is unfinalized: original_size is 0 but body bytes exist")]
    UnfinalizedContainer,

    #[error("unexpected end of stream while reading {context}")]
    TruncatedStream { context: &'static str },

    #[error("unsupported keyset envelope schema version: {found}")]
    UnsupportedKeysetSchema { found: u32 },
}

/// AEAD seal/open failures. Never retried.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("authentication failed while opening chunk {chunk_index}")]
    AuthenticationFailed { chunk_index: u64 },

    #[error("authentication failed while unwrapping keyset")]
    KeysetAuthenticationFailed,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

/// The keyset could not be unwrapped under the supplied master key.
/// Fatal at startup.
#[derive(Error, Debug)]
pub enum MasterKeyError {
    #[error("keyset at {path} could not be unwrapped: wrong master key or tampered keyset")]
    UnwrapFailed { path: PathBuf },
}

/// Underlying file I/O failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised by codec functions that operate on a generic `impl io::Write`
    /// / `impl io::Read` handle with no path to attribute the failure to.
    #[error("I/O error: {0}")]
    Bare(#[from] std::io::Error),
}

impl StorageError {
    pub fn at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Unsupported seek request on a Writer.
#[derive(Error, Debug)]
pub enum SeekError {
    #[error("no backward seek: current position {current}, requested {requested}")]
    Backward { current: u64, requested: u64 },

    #[error("forward seek gap too large: {gap} bytes exceeds the {limit} byte limit")]
    GapTooLarge { gap: u64, limit: u64 },
}

/// Unsupported truncate request on a Writer.
#[derive(Error, Debug)]
pub enum TruncateError {
    #[error("cannot truncate to {requested}: already wrote {written} bytes of sealed chunks")]
    AlreadySealed { requested: u64, written: u64 },
}

/// Operation attempted on a channel that has already been closed.
#[derive(Error, Debug)]
pub enum ClosedError {
    #[error("operation attempted on a closed {what}")]
    AlreadyClosed { what: &'static str },
}

/// A caller-supplied argument violates a documented precondition.
#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("chunk_size must be > 0")]
    NonPositiveChunkSize,
}
