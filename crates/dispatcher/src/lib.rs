//! Push event routing.
//!
//! One task consumes the backend's event channel in order, stamps each
//! decoded event with the next generation from the shared
//! [`GenerationClock`](fusion_catalog::GenerationClock), and applies it to
//! the catalog and the download tracker. Malformed or unknown events are
//! logged and dropped; nothing in the loop awaits a command.

pub mod config;
pub mod dispatcher;

pub use config::DispatcherConfig;
pub use dispatcher::{DispatcherHandle, EventDispatcher};
