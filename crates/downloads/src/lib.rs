//! Download pipeline tracking.
//!
//! Mirrors what the backend reports about downloads: an ordered queue of
//! active entries (managed and storefront-driven), monotonic byte progress,
//! and a completed history that only the user clears.

pub mod tracker;
pub mod types;

pub use tracker::DownloadTracker;
pub use types::{
    CompletedDownloadEntry, DownloadOrigin, DownloadQueueEntry, DownloadsSnapshot, Progress,
};
