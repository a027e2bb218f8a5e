//! Synchronizers: bridges between shared containers and local mirrors.
//!
//! Each synchronizer owns exactly one change subscription on its container and tags the
//! transactions it opens with an origin of its own. Deltas carrying that origin are
//! skipped by the replay path; everything else (network merges, other writers) is
//! replayed onto the mirror. This makes every change land in each mirror exactly once.

mod array;
mod context;
mod errors;
mod map;
pub mod ordering;
pub(crate) mod resolve;
mod watch;

pub(crate) use array::ArraySynchronizer;
pub(crate) use context::{OriginTag, SyncContext};
pub use errors::SyncError;
pub(crate) use map::MapSynchronizer;
pub use resolve::shared_to_any;
pub use watch::{ChangeOrigin, WatchGuard};
pub(crate) use watch::Watchers;
