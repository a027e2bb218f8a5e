//! Error types for the root entry point and document helpers.

use thiserror::Error;

/// Structured error types for document state operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// The document has not completed its initial sync and load
    #[error("Document is not ready (synced: {synced}, loaded: {loaded})")]
    DocumentNotReady { synced: bool, loaded: bool },

    /// An encoded update or state vector could not be decoded
    #[error("Failed to decode document update: {reason}")]
    UpdateDecode { reason: String },

    /// A decoded update could not be applied to the document
    #[error("Failed to apply document update: {reason}")]
    UpdateApply { reason: String },
}

impl StateError {
    /// Check if this error is a readiness failure
    pub fn is_not_ready(&self) -> bool {
        matches!(self, StateError::DocumentNotReady { .. })
    }

    /// Check if this error came from update decoding or application
    pub fn is_update_error(&self) -> bool {
        matches!(
            self,
            StateError::UpdateDecode { .. } | StateError::UpdateApply { .. }
        )
    }
}

impl From<StateError> for crate::Error {
    fn from(err: StateError) -> Self {
        crate::Error::State(err)
    }
}
