//! Lifecycle tracking for encoded image storage
//!
//! Every encode attempt produces a [`ResourceHandle`] backed by either an
//! in-memory buffer or a temporary file. A [`ResourceTracker`] keeps them
//! reachable until they are explicitly released.

pub mod handle;
pub mod tracker;

pub use handle::{HandleState, ResourceHandle, StorageKind};
pub use tracker::{ReleaseSummary, ResourceTracker};
