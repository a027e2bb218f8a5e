//! Error types for synchronizer operations.
//!
//! Every variant describes a usage error. All of them are raised before the
//! first shared-document write of the rejected call, so the mirror and the shared
//! container stay structurally equal.

use thiserror::Error;

/// Structured error types for synchronizers and facades.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SyncError {
    /// A rich-text value is already bound to a document position
    #[error("Rich text is already attached to a document and cannot be attached again")]
    UnsupportedReattachment,

    /// Seeding was attempted against a container that already has content
    #[error("Cannot seed a non-empty shared {container} ({len} existing entries)")]
    NonEmptyTarget { container: &'static str, len: u32 },

    /// The shared document holds a container kind this engine does not mirror
    #[error("Unrecognized shared type: {kind}")]
    UnrecognizedSharedType { kind: String },

    /// A symbol-keyed property was written through the record presentation
    #[error("Symbol keys are not supported: Symbol({description})")]
    SymbolKeyUnsupported { description: String },

    /// An index lies beyond the end of the container, or inside a character of a text
    #[error("Index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A rich-text edit was attempted before the text was attached to a document
    #[error("Rich text is not attached to a document")]
    TextNotAttached,

    /// The shared container was removed from the document
    #[error("The shared {container} was removed from the document")]
    Detached { container: &'static str },
}

impl SyncError {
    /// Check if this error is a rich-text reattachment
    pub fn is_reattachment(&self) -> bool {
        matches!(self, SyncError::UnsupportedReattachment)
    }

    /// Check if this error is a seeding conflict
    pub fn is_non_empty_target(&self) -> bool {
        matches!(self, SyncError::NonEmptyTarget { .. })
    }

    /// Check if this error is an unmodelled shared container
    pub fn is_unrecognized_shared_type(&self) -> bool {
        matches!(self, SyncError::UnrecognizedSharedType { .. })
    }

    /// Check if this error is a symbol-keyed write
    pub fn is_symbol_key(&self) -> bool {
        matches!(self, SyncError::SymbolKeyUnsupported { .. })
    }

    /// Check if this error is an out-of-range index
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, SyncError::IndexOutOfBounds { .. })
    }

    /// Check if this error is an edit on a detached text
    pub fn is_not_attached(&self) -> bool {
        matches!(self, SyncError::TextNotAttached)
    }

    /// Check if this error is a write to a removed container
    pub fn is_detached(&self) -> bool {
        matches!(self, SyncError::Detached { .. })
    }
}

impl From<SyncError> for crate::Error {
    fn from(err: SyncError) -> Self {
        crate::Error::Sync(err)
    }
}
