//! Error taxonomy for the streaming blob layer.
//!
//! Remote-store faults fall into a closed terminal set (missing bucket or
//! key, unsatisfiable range) and an open retryable set (everything else).
//! The backoff executor stops early on terminal errors; the streaming
//! reader ends the stream cleanly on them.

use thiserror::Error;

/// Errors produced by the blob store boundary, the backoff executor and the
/// stream sessions.
#[derive(Debug, Error)]
pub enum Error {
    /// The bucket/container does not exist. Terminal: retrying cannot help.
    #[error("bucket {0:?} does not exist")]
    BucketNotFound(String),

    /// The object does not exist. Terminal.
    #[error("key {0:?} does not exist")]
    KeyNotFound(String),

    /// The requested byte range is not satisfiable (offset past end of
    /// object). Terminal; the reader treats this as end-of-object.
    #[error("requested range {0} is not satisfiable")]
    InvalidRange(String),

    /// Transient remote fault (server error, throttling, bad gateway).
    #[error("remote store: {0}")]
    Remote(String),

    /// Transport or pipe failure.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The backoff executor's overall deadline fired. Wraps the last
    /// attempt's error.
    #[error("backoff time limit exceeded: {source}")]
    TimeoutExceeded {
        #[source]
        source: Box<Error>,
    },

    /// The caller's cancellation context fired during a backoff wait.
    /// Wraps the last attempt's error.
    #[error("cancelled while backing off: {source}")]
    Cancelled {
        #[source]
        source: Box<Error>,
    },

    /// Read/Write was called on a session that was never opened.
    #[error("stream session not opened")]
    NotOpened,
}

/// Retry classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retrying can never succeed (closed set: missing bucket/key, bad range).
    Terminal,
    /// Transient; worth retrying under a backoff budget.
    Retryable,
}

impl Error {
    /// Classify for retry decisions. Anything outside the closed terminal
    /// set is assumed transient.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::BucketNotFound(_) | Error::KeyNotFound(_) | Error::InvalidRange(_) => {
                ErrorClass::Terminal
            }
            _ => ErrorClass::Retryable,
        }
    }
}
