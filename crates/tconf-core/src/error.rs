//! Typed errors shared across the configuration engine.

use std::path::PathBuf;

use thiserror::Error;

/// A value rejected by a property validator.
///
/// The message is shown to the operator as-is, so it should read as a
/// complete sentence about the value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    pub message: String,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure to recover a `RemoteResult` from a host-side process.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("no RemoteResult marker found in output")]
    MissingMarker,
    #[error("malformed RemoteResult payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The write finished, but an interrupt arrived while it was in progress.
    #[error("interrupted while writing {0}")]
    Interrupted(PathBuf),
}

impl StoreError {
    /// True when `err` carries an interrupted property write.
    pub fn is_interrupt(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<StoreError>(), Some(StoreError::Interrupted(_)))
    }
}
