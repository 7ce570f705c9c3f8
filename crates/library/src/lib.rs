//! Library view state on top of the shared catalog.
//!
//! The backend is reached through the [`CommandGateway`] trait; the app
//! provides an implementation over its transport. [`FilterView`] decides
//! which filter changes are local and which need a fresh fetch, and
//! [`LibraryController`] runs the commands of one view, discarding results
//! that arrive after the view is gone.

pub mod controller;
pub mod error;
pub mod filter;
pub mod gateway;

// Re-export primary types for convenience.
pub use controller::{Activation, LibraryController, RefreshOutcome};
pub use error::{GatewayError, LibraryError};
pub use filter::{FilterEffect, FilterView, LibraryView};
pub use gateway::{CommandGateway, GatewayFuture};
