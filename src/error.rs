//! Error types for the archival pipeline.
//!
//! Core components return [`ArchiveError`]. Every variant maps onto a closed
//! [`FailureKind`] through [`ArchiveError::kind`], which is the only place the
//! retry executor looks when deciding whether to try again.

use anyhow::{Context, Result};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure category used by the retry executor and the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Likely to succeed on a later attempt.
    Transient,
    /// Will fail again no matter how often it is retried.
    Permanent,
    /// The caller asked us to stop. Neither a success nor a failure.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("network error: {0}")]
    Network(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("upstream responded with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid data: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Auth(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to persist {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl ArchiveError {
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ArchiveError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    ///
    /// | variant                         | kind      |
    /// |---------------------------------|-----------|
    /// | `Network`, `Timeout`            | transient |
    /// | `Upstream` 429 / 5xx            | transient |
    /// | `Upstream` anything else        | permanent |
    /// | `Io`, `Persistence`             | by [`io::ErrorKind`] |
    /// | `Validation`, `Auth`, `Serialization` | permanent |
    /// | `Cancelled`                     | cancelled |
    pub fn kind(&self) -> FailureKind {
        match self {
            ArchiveError::Network(_) | ArchiveError::Timeout(_) => FailureKind::Transient,
            ArchiveError::Upstream { status, .. } => upstream_kind(*status),
            ArchiveError::Io(e) => io_kind(e.kind()),
            ArchiveError::Persistence { source, .. } => io_kind(source.kind()),
            ArchiveError::Validation(_)
            | ArchiveError::Auth(_)
            | ArchiveError::Serialization(_) => FailureKind::Permanent,
            ArchiveError::Cancelled => FailureKind::Cancelled,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == FailureKind::Cancelled
    }
}

fn upstream_kind(status: u16) -> FailureKind {
    match status {
        429 => FailureKind::Transient,
        500..=599 => FailureKind::Transient,
        _ => FailureKind::Permanent,
    }
}

fn io_kind(kind: io::ErrorKind) -> FailureKind {
    match kind {
        io::ErrorKind::NotFound
        | io::ErrorKind::InvalidInput
        | io::ErrorKind::InvalidData
        | io::ErrorKind::Unsupported
        | io::ErrorKind::AlreadyExists => FailureKind::Permanent,
        _ => FailureKind::Transient,
    }
}

/// Extension trait adding archiver-specific context to command-layer errors.
pub trait ArchiveErrorContext<T> {
    /// Add context for opening the store directory.
    fn context_store(self, store_dir: &str) -> Result<T>;

    /// Add context for a single chat's state operation.
    fn context_chat(self, chat_id: i64) -> Result<T>;

    /// Add context for statistics persistence.
    fn context_statistics(self) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ArchiveErrorContext<T>
    for std::result::Result<T, E>
{
    fn context_store(self, store_dir: &str) -> Result<T> {
        self.with_context(|| {
            format!(
                "Failed to prepare store directory {}. Check that it is writable.",
                store_dir
            )
        })
    }

    fn context_chat(self, chat_id: i64) -> Result<T> {
        self.with_context(|| format!("Failed to update sync state for chat {}", chat_id))
    }

    fn context_statistics(self) -> Result<T> {
        self.context("Failed to persist statistics snapshot")
    }
}
