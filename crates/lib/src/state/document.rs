//! Shared document handle with readiness tracking.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use handle_trait::Handle;
use tracing::debug;
use yrs::{
    Doc, ReadTxn, StateVector, Transact, Update,
    updates::{decoder::Decode, encoder::Encode},
};

use super::{DocumentConfig, StateError};
use crate::{Result, sync::SyncContext};

struct DocumentInner {
    doc: Doc,
    config: DocumentConfig,
    synced: AtomicBool,
    loaded: AtomicBool,
}

/// A Y-CRDT document plus the readiness flags the root entry point checks.
///
/// A provider marks the document synced once the initial exchange with its peers has
/// completed, and loaded once local persistence has been read. Clones are handles to
/// the same document.
#[derive(Clone, Handle)]
pub struct SharedDocument {
    inner: Arc<DocumentInner>,
}

impl SharedDocument {
    /// Wrap `doc`; neither synced nor loaded yet.
    pub fn new(doc: Doc) -> Self {
        Self::with_config(doc, DocumentConfig::default())
    }

    /// Wrap `doc` with explicit settings; neither synced nor loaded yet.
    pub fn with_config(doc: Doc, config: DocumentConfig) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                doc,
                config,
                synced: AtomicBool::new(false),
                loaded: AtomicBool::new(false),
            }),
        }
    }

    /// Wrap a document that needs no initial sync or load, e.g. a purely local one.
    pub fn ready(doc: Doc) -> Self {
        let document = Self::new(doc);
        document.mark_synced();
        document.mark_loaded();
        document
    }

    pub fn mark_synced(&self) {
        if !self.inner.synced.swap(true, Ordering::AcqRel) {
            debug!(client_id = self.inner.doc.client_id(), "document synced");
        }
    }

    pub fn mark_loaded(&self) {
        if !self.inner.loaded.swap(true, Ordering::AcqRel) {
            debug!(client_id = self.inner.doc.client_id(), "document loaded");
        }
    }

    pub fn is_synced(&self) -> bool {
        self.inner.synced.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.loaded.load(Ordering::Acquire)
    }

    /// Both synced and loaded
    pub fn is_ready(&self) -> bool {
        self.is_synced() && self.is_loaded()
    }

    pub(crate) fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(StateError::DocumentNotReady {
                synced: self.is_synced(),
                loaded: self.is_loaded(),
            }
            .into())
        }
    }

    /// The underlying document
    pub fn doc(&self) -> &Doc {
        &self.inner.doc
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.inner.config
    }

    pub(crate) fn context(&self) -> SyncContext {
        SyncContext::new(self.inner.doc.clone(), &self.inner.config.origin_prefix)
    }

    /// Encoded state vector (v1), for a peer to compute a diff against.
    pub fn state_vector(&self) -> Vec<u8> {
        self.inner.doc.transact().state_vector().encode_v1()
    }

    /// The whole document as one update (v1).
    pub fn encode_state_as_update(&self) -> Vec<u8> {
        self.inner
            .doc
            .transact()
            .encode_state_as_update_v1(&StateVector::default())
    }

    /// Everything a peer with `state_vector` is missing, as one update (v1).
    pub fn encode_diff(&self, state_vector: &[u8]) -> Result<Vec<u8>> {
        let state_vector =
            StateVector::decode_v1(state_vector).map_err(|e| StateError::UpdateDecode {
                reason: e.to_string(),
            })?;
        Ok(self
            .inner
            .doc
            .transact()
            .encode_state_as_update_v1(&state_vector))
    }

    /// Merge an update (v1) received from a peer.
    ///
    /// The transaction carries no origin, so every synchronizer replays the resulting
    /// deltas as remote changes.
    pub fn apply_update(&self, update: &[u8]) -> Result<()> {
        let bytes = update.len();
        let update = Update::decode_v1(update).map_err(|e| StateError::UpdateDecode {
            reason: e.to_string(),
        })?;
        let mut txn = self.inner.doc.transact_mut();
        txn.apply_update(update)
            .map_err(|e| StateError::UpdateApply {
                reason: e.to_string(),
            })?;
        debug!(bytes, "applied remote update");
        Ok(())
    }
}

impl std::fmt::Debug for SharedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDocument")
            .field("client_id", &self.inner.doc.client_id())
            .field("synced", &self.is_synced())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
