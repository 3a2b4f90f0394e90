//! Archive error type and its mapping onto DIMSE status codes

use dimse::types::status;
use dimse::DimseError;
use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{0}")]
    NotAuthorized(String),

    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    #[error("Invalid object instance: {0}")]
    InvalidObjectInstance(String),

    #[error("Cannot understand: {0}")]
    CannotUnderstand(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Unknown move destination: {0}")]
    MoveDestinationUnknown(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ProcessingFailure(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("DIMSE error: {0}")]
    Dimse(#[from] DimseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ArchiveError {
    pub fn not_authorized(msg: impl Into<String>) -> Self {
        Self::NotAuthorized(msg.into())
    }

    pub fn processing_failure(msg: impl Into<String>) -> Self {
        Self::ProcessingFailure(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Status code reported to the peer for this error
    pub fn status(&self) -> u16 {
        match self {
            ArchiveError::NotAuthorized(_) => status::REFUSED_NOT_AUTHORIZED,
            ArchiveError::MissingAttribute(_) => status::MISSING_ATTRIBUTE,
            ArchiveError::InvalidObjectInstance(_) => status::INVALID_OBJECT_INSTANCE,
            ArchiveError::CannotUnderstand(_) => status::CANNOT_UNDERSTAND,
            ArchiveError::NotSupported(_) => status::UNABLE_TO_PROCESS,
            ArchiveError::MoveDestinationUnknown(_) => status::MOVE_DESTINATION_UNKNOWN,
            ArchiveError::NotFound(_)
            | ArchiveError::ProcessingFailure(_)
            | ArchiveError::Backend(_)
            | ArchiveError::Dimse(_)
            | ArchiveError::Config(_) => status::PROCESSING_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
