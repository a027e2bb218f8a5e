//! Configuration for documents and root state.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ORIGIN_PREFIX, DEFAULT_TOP_LEVEL_NAME};

/// Per-document settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Prefix of the transaction origins the synchronizers tag.
    ///
    /// Other tooling on the same document, such as an undo manager tracking engine
    /// transactions, can recognise them by this prefix.
    pub origin_prefix: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            origin_prefix: DEFAULT_ORIGIN_PREFIX.to_string(),
        }
    }
}

/// Settings of [`crate::state::open_with_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Name of the root shared map.
    pub top_level_name: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            top_level_name: DEFAULT_TOP_LEVEL_NAME.to_string(),
        }
    }
}
