//! Root synchronized-state entry point.
//!
//! [`open`] turns a ready [`SharedDocument`] into the root [`SyncedMap`]: existing
//! content under the top-level name is adopted as it is, otherwise the root map is
//! created and seeded from the fallback value.

mod config;
mod document;
mod errors;

pub use config::{DocumentConfig, StateConfig};
pub use document::SharedDocument;
pub use errors::StateError;

use tracing::debug;
use yrs::{Map, ReadTxn, Transact};

use crate::{
    Result,
    constants::DEFAULT_TOP_LEVEL_NAME,
    facade::SyncedMap,
    value::{Value, ValueError},
};

/// Open the root map named `top_level_name`.
///
/// Fails with `DocumentNotReady` until the document is both synced and loaded. When
/// the root map already exists its content is adopted and `initial` is ignored;
/// otherwise the map is created and seeded from `initial`, which must be a keyed map.
///
/// ```
/// # use ymirror::{SharedDocument, open, Value};
/// # use ymirror::y_crdt::Doc;
/// let document = SharedDocument::ready(Doc::new());
/// let state = open(&document, serde_json::json!({"todos": []}), "")?;
/// assert!(state.get("todos").unwrap().as_array().unwrap().is_empty());
///
/// // Opening again adopts what is there.
/// let again = open(&document, serde_json::json!({"other": 1}), "")?;
/// assert_eq!(again.keys(), ["todos"]);
/// # Ok::<(), ymirror::Error>(())
/// ```
pub fn open(document: &SharedDocument, initial: impl Into<Value>, top_level_name: &str) -> Result<SyncedMap> {
    document.ensure_ready()?;
    let existed = document.doc().transact().get_map(top_level_name).is_some();
    let root = document.doc().get_or_insert_map(top_level_name);
    // Content merged from a peer before the root was first requested only becomes
    // readable as a map here.
    let populated = root.len(&document.doc().transact()) > 0;
    if existed || populated {
        debug!(name = top_level_name, "adopting existing root map");
        return SyncedMap::attach(document, root, None);
    }

    let entries = match initial.into() {
        Value::Map(entries) => entries,
        other => {
            return Err(ValueError::UnsupportedValueKind {
                kind: other.kind().to_string(),
                reason: "the root value must be a keyed map".to_string(),
            }
            .into());
        }
    };
    debug!(
        name = top_level_name,
        entries = entries.len(),
        "seeding new root map"
    );
    SyncedMap::attach(document, root, Some(entries))
}

/// [`open`] with the top-level name taken from `config`.
pub fn open_with_config(
    document: &SharedDocument,
    initial: impl Into<Value>,
    config: &StateConfig,
) -> Result<SyncedMap> {
    open(document, initial, &config.top_level_name)
}

/// [`open`] under the default (empty) top-level name.
pub fn open_default(document: &SharedDocument, initial: impl Into<Value>) -> Result<SyncedMap> {
    open(document, initial, DEFAULT_TOP_LEVEL_NAME)
}
