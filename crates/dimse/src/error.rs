//! Error types for DIMSE operations

use thiserror::Error;

/// Result type alias for DIMSE operations
pub type Result<T> = std::result::Result<T, DimseError>;

/// Error types that can occur during DIMSE operations
#[derive(Error, Debug)]
pub enum DimseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("Malformed data set: {0}")]
    DataSet(String),

    #[error("Association rejected: {0}")]
    AssociationRejected(String),

    /// The peer released the association. Not a failure.
    #[error("Association released")]
    AssociationReleased,

    /// The peer aborted the association, or the transport closed under us.
    #[error("Association aborted")]
    AssociationAborted,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("DIMSE operation failed: {0}")]
    OperationFailed(String),

    #[error("Invalid AE Title: {0}")]
    InvalidAeTitle(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl DimseError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new data set error
    pub fn data_set(msg: impl Into<String>) -> Self {
        Self::DataSet(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new operation failed error
    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::OperationFailed(msg.into())
    }

    /// True for the two normal ways an association ends
    pub fn is_association_end(&self) -> bool {
        matches!(
            self,
            DimseError::AssociationReleased | DimseError::AssociationAborted
        )
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DimseError::Network(_) | DimseError::AssociationRejected(_)
        )
    }
}
