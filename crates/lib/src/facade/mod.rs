//! Facades: native sequence and map contracts over the synchronizers.
//!
//! Application code works with [`SyncedArray`] and [`SyncedMap`] the way it would with
//! an ordinary sequence or map. Reads pass through to the local mirror; mutations are
//! dispatched to the synchronizer, and operations that natively return the receiver
//! return the facade itself.

mod array;
mod map;

pub use array::SyncedArray;
pub use map::{PropertyKey, Symbol, SyncedMap};
