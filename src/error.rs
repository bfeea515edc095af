//! Structured error handling for the chunk pipeline.
//!
//! Two layers of errors exist: [`ItemError`] is the failure taxonomy surfaced
//! by item collaborators (processors and writers) and consumed by the failure
//! classifier, while [`ChunkflowError`] is the crate-level error returned to
//! callers of the orchestrator. An aborted run carries the triggering
//! [`ItemError`] as its source so the original cause is never discarded.

use thiserror::Error;

/// Failure raised by an item processor or writer.
///
/// The kind determines how the failure classifier may treat it: `Fatal`
/// always aborts the run, `Recoverable` and `Write` are eligible for
/// skip/retry classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// Business-level failure that may be skipped or retried.
    #[error("recoverable processing failure: {message}")]
    Recoverable { message: String },

    /// Unrecoverable failure. The run aborts regardless of classifier.
    #[error("fatal processing failure: {message}")]
    Fatal { message: String },

    /// Failure raised by an item writer. Classified like processing errors
    /// but forces a chunk-level rollback first.
    #[error("write failure: {message}")]
    Write { message: String },
}

impl ItemError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::Recoverable {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Fatal errors bypass classification entirely.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// Crate-level error for orchestration and configuration operations.
#[derive(Debug, Error)]
pub enum ChunkflowError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid chunk state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("retry limit of {attempts} attempts exceeded")]
    RetryLimitExceeded { attempts: u32 },

    #[error("skip limit of {limit} exceeded")]
    SkipLimitExceeded { limit: u32 },

    #[error("transaction boundary failure during {operation}: {reason}")]
    Transaction { operation: String, reason: String },

    /// The run terminated in the aborted state. The triggering item error
    /// propagates unchanged as the source.
    #[error("run aborted: {source}")]
    Aborted {
        #[source]
        source: ItemError,
    },
}

pub type Result<T> = std::result::Result<T, ChunkflowError>;
