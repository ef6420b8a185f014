//! Error taxonomy for the journal.
//!
//! Every fallible operation on [`crate::Journal`] returns one of the types
//! below rather than a bare [`std::io::Error`], so callers can distinguish a
//! configuration mistake from a transient I/O failure from a fatal
//! corruption finding without string-matching messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to open a journal.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("journal path {0:?} does not exist or is not a directory")]
    NotADirectory(PathBuf),

    #[error("`max_log_file_size` must be a positive number of bytes")]
    InvalidMaxLogFileSize,

    #[error("failed to replay existing journal segments")]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Fatal failure encountered while replaying a journal directory at startup.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("segment {log_number} has an unrecognized file header")]
    BadMagic { log_number: u64 },

    #[error("segment {log_number} has format version {found}, which this build does not support (max {max})")]
    UnsupportedVersion { log_number: u64, found: u16, max: u16 },

    #[error("segment {log_number} failed to decode entry at record {record_id}")]
    EntryDecode {
        log_number: u64,
        record_id: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure to submit a single entry, raised synchronously before any
/// on-disk work has been attempted.
#[derive(Debug, Error)]
pub enum SubmitError<E> {
    #[error("failed to encode entry")]
    Encoding(#[source] E),
}

/// Failure to submit a batch, raised synchronously before the batch segment
/// has been created.
#[derive(Debug, Error)]
pub enum BatchSubmitError<E> {
    #[error("failed to encode entry {index} of batch")]
    Encoding {
        index: usize,
        #[source]
        source: E,
    },
}

/// Cause delivered to [`crate::Listener::on_failure`] when a durable append
/// (synchronous, asynchronous, or batch) could not be completed.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("oversize record did not fit its dedicated overflow segment on retry")]
    FatalOverflowRetryFailed,

    #[error("batch segment size did not match the size required by its records")]
    BatchSizingInvariantViolated,
}
