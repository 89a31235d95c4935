//! Error handling for favloader

use thiserror::Error;

/// Main error type for favloader
#[derive(Debug, Error)]
pub enum FavloaderError {
    #[error("no media found")]
    NoMediaFound,

    #[error("operation cancelled by user")]
    Cancelled,

    #[error("unrecognized feed node")]
    UnrecognizedNode,

    #[error("required collaborator not configured: {0}")]
    CollaboratorMissing(&'static str),

    #[error("another operation is already in progress")]
    OperationInProgress,

    #[error("batch not found: {0}")]
    BatchNotFound(String),

    #[error("batch already finalized: {0}")]
    BatchFinalized(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FavloaderError {
    /// Whether an operation-level error is a user-initiated abort.
    ///
    /// Callers skip error alerting for these but still run cleanup.
    pub fn is_cancellation(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<FavloaderError>(),
            Some(FavloaderError::Cancelled)
        )
    }
}
