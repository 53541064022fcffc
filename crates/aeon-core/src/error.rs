//! Error types for the AEON core.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, AeonError>;

/// Faults that can cross the routing engine boundary.
///
/// Provider failures are not in here: they are turned into assistant content by the
/// engine and never reach the caller as errors.
#[derive(Error, Debug)]
pub enum AeonError {
    /// Neither message text nor files were supplied.
    #[error("Empty message")]
    EmptyInput,

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AeonError {
    /// True for faults caused by the request itself rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AeonError::EmptyInput)
    }
}

impl From<tempfile::PersistError> for AeonError {
    fn from(err: tempfile::PersistError) -> Self {
        AeonError::Storage(err.error)
    }
}
