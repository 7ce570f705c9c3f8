//! Error types for catalog mutations.

use fusion_protocol::{GameKey, GameStatus};

/// Invariant violations reported by the catalog.
///
/// Neither is fatal: the offending write is ignored and the store stays
/// queryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown game {0}")]
    UnknownKey(GameKey),

    #[error("invalid transition for {key}: {from} -> {to}")]
    InvalidTransition {
        key: GameKey,
        from: GameStatus,
        to: GameStatus,
    },
}
