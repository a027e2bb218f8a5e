//!
//! ymirror: native collection semantics over a shared Y-CRDT document.
//!
//! This library keeps local, in-memory mirrors of sequences, keyed maps and rich text
//! consistent with the shared containers of a [`yrs`] document, in both directions.
//!
//! ## Core Concepts
//!
//! * **Values (`value::Value`)**: Plain application values that can cross into the shared
//!   document. Every value is classified as atomic, sequence, keyed map or rich text.
//! * **Nodes (`node::Node`)**: What a mirror holds. Atoms are stored by value, containers
//!   as facades over their own synchronizer.
//! * **Synchronizers (`sync`)**: Bridges pairing one shared container with one local mirror
//!   and one change subscription. Local mutations become insert/delete primitives inside a
//!   single transaction; remote deltas are replayed onto the mirror only.
//! * **Facades (`facade::SyncedArray`, `facade::SyncedMap`)**: Handles exposing the native
//!   sequence and map/record contracts (`splice`, `sort`, `fill`, `set`, `delete`, ...).
//! * **Rich text (`text::SyncedText`)**: A derived string and operation log, re-derived on
//!   every edit.
//! * **Root state (`state::open`)**: Adopts an existing root map or seeds it from a fallback
//!   value once a `state::SharedDocument` is ready.
//! * **Presence (`presence::PeerPresence`)**: A typed mirror of ephemeral per-peer state.

pub mod constants;
pub mod facade;
pub mod node;
pub mod presence;
pub mod state;
pub mod sync;
pub mod text;
pub mod value;

pub use facade::{PropertyKey, SyncedArray, SyncedMap, Symbol};
pub use node::Node;
pub use state::{SharedDocument, open, open_with_config};
pub use sync::{ChangeOrigin, WatchGuard};
pub use text::SyncedText;
pub use value::{Value, ValueKind, classify};

/// Y-CRDT types re-exported for convenience.
///
/// Client code can reach `Doc`, `Any` and the container references through this module
/// without adding `yrs` as a separate dependency.
pub mod y_crdt {
    pub use yrs::*;
}

/// Result type used throughout the ymirror library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the ymirror library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured errors from value classification and conversion
    #[error(transparent)]
    Value(value::ValueError),

    /// Structured errors from the synchronizers and facades
    #[error(transparent)]
    Sync(sync::SyncError),

    /// Structured errors from the root entry point and document helpers
    #[error(transparent)]
    State(state::StateError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Value(_) => "value",
            Error::Sync(_) => "sync",
            Error::State(_) => "state",
        }
    }

    /// Check if this error indicates a value with no storable shape.
    pub fn is_unsupported_value(&self) -> bool {
        match self {
            Error::Value(value_err) => value_err.is_unsupported_kind(),
            _ => false,
        }
    }

    /// Check if this error indicates a rich-text value bound to a second position.
    pub fn is_reattachment(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_reattachment(),
            _ => false,
        }
    }

    /// Check if this error indicates seeding against a populated container.
    pub fn is_non_empty_target(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_non_empty_target(),
            _ => false,
        }
    }

    /// Check if this error indicates a symbol-keyed property write.
    pub fn is_symbol_key(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_symbol_key(),
            _ => false,
        }
    }

    /// Check if this error indicates a shared container kind that cannot be mirrored.
    pub fn is_unrecognized_shared_type(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_unrecognized_shared_type(),
            _ => false,
        }
    }

    /// Check if this error indicates an index outside the container.
    pub fn is_out_of_bounds(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_out_of_bounds(),
            _ => false,
        }
    }

    /// Check if this error indicates a write through a handle whose container was removed.
    pub fn is_detached(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_detached(),
            _ => false,
        }
    }

    /// Check if this error indicates the document has not finished its initial sync/load.
    pub fn is_document_not_ready(&self) -> bool {
        match self {
            Error::State(state_err) => state_err.is_not_ready(),
            _ => false,
        }
    }

    /// Check if this error came from decoding or applying a document update.
    pub fn is_update_error(&self) -> bool {
        match self {
            Error::State(state_err) => state_err.is_update_error(),
            _ => false,
        }
    }

    /// Check if this error is a usage error of the synchronized collections.
    ///
    /// Every error raised by the collections themselves is a programmer error that
    /// no retry can fix; only update decoding/application depends on external input.
    pub fn is_usage_error(&self) -> bool {
        !self.is_update_error()
    }
}
