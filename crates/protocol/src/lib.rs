//! Wire types shared between the launcher backend and the library state engine.
//!
//! Everything here is plain data: game records as the backend reports them,
//! command arguments, and the push events emitted while games are hidden,
//! downloaded, installed and uninstalled.

pub mod constants;
pub mod envelope;
pub mod error;
pub mod events;
pub mod types;

// Re-export primary types for convenience.
pub use constants::EventType;
pub use envelope::EventMessage;
pub use error::ProtocolError;
pub use events::{
    GameDownloadExternal, GameDownloadProgress, GameDownloadQueued, GameEvent, GameRef,
};
pub use types::{
    DownloadOptions, Game, GameFilters, GameKey, GameSource, GameStatus, GameVersion,
    StatusFilter, VersionDownloadInfo,
};
