//! Local, observable mirror of the remote game catalog.
//!
//! The catalog is fed from two sources that do not coordinate with each
//! other: full snapshots returned by `get_games` and per-game patches derived
//! from the backend's push events. Every write carries a generation taken
//! from a shared [`GenerationClock`]; a write older than what the store
//! already holds for that game is discarded instead of clobbering it.
//!
//! # Operations
//!
//! - **Snapshot**: merge a `get_games` result and replace the resident scope
//! - **Patch**: apply a status / hidden / favorite change from an event
//! - **Query**: sorted, filtered records plus `total` / `installed` counts
//! - **Remove**: drop a record after the backend confirmed a hide
//! - **Subscribe**: receive a fresh [`CatalogSnapshot`] after every commit

pub mod error;
pub mod generation;
pub mod observer;
pub mod record;
pub mod store;
pub mod transition;

// Re-export primary types for convenience.
pub use error::CatalogError;
pub use generation::GenerationClock;
pub use observer::{Subscribers, Subscription};
pub use record::{GamePatch, GameRecord};
pub use store::{
    CatalogSnapshot, CatalogStore, PatchOutcome, QueryResult, RecordFilter, SnapshotOutcome,
};
pub use transition::can_transition;
