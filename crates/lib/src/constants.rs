//! Constants used throughout the ymirror library.

/// Default name of the root shared map opened by [`crate::state::open`].
pub const DEFAULT_TOP_LEVEL_NAME: &str = "";

/// Default prefix of the transaction origins tagged by synchronizers.
pub const DEFAULT_ORIGIN_PREFIX: &str = "ymirror";

/// Separator between the origin prefix and the per-synchronizer counter.
pub const ORIGIN_SEPARATOR: char = ':';

/// Prefix of the keys under which presence mirrors register awareness listeners.
pub const PRESENCE_LISTENER_PREFIX: &str = "ymirror-presence";
