//! Error types for the keel Raft layer.

use openraft::error::Fatal;
use openraft::{ErrorSubject, ErrorVerb, StorageError};
use thiserror::Error;

/// Errors raised while building or bootstrapping a Raft node.
#[derive(Debug, Error)]
pub enum RaftNodeError {
    #[error("invalid raft config: {0}")]
    Config(#[from] openraft::ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError<u64>),

    #[error("raft stopped: {0}")]
    Fatal(#[from] Fatal<u64>),

    #[error("initialize failed: {0}")]
    Initialize(String),

    #[error("no leader elected: {0}")]
    NoLeader(String),
}

pub(crate) fn read_err(e: impl std::fmt::Display) -> StorageError<u64> {
    StorageError::from_io_error(
        ErrorSubject::Store,
        ErrorVerb::Read,
        std::io::Error::other(e.to_string()),
    )
}

pub(crate) fn write_err(e: impl std::fmt::Display) -> StorageError<u64> {
    StorageError::from_io_error(
        ErrorSubject::Store,
        ErrorVerb::Write,
        std::io::Error::other(e.to_string()),
    )
}
