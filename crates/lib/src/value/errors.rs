//! Error types for value classification and conversion.

use thiserror::Error;

/// Structured error types for application values.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ValueError {
    /// The value has no storable shape (atomic, sequence, keyed map or rich text)
    #[error("Unsupported value kind '{kind}': {reason}")]
    UnsupportedValueKind { kind: String, reason: String },

    /// A mirrored value could not be read back as the requested type
    #[error("Value deserialization failed: {reason}")]
    Deserialize { reason: String },
}

impl ValueError {
    /// Check if this error is a classification failure
    pub fn is_unsupported_kind(&self) -> bool {
        matches!(self, ValueError::UnsupportedValueKind { .. })
    }

    /// Check if this error is a typed read failure
    pub fn is_deserialize_error(&self) -> bool {
        matches!(self, ValueError::Deserialize { .. })
    }
}

impl From<ValueError> for crate::Error {
    fn from(err: ValueError) -> Self {
        crate::Error::Value(err)
    }
}
