//! Error types for library commands.

use fusion_catalog::CatalogError;

/// Failure reported by a [`CommandGateway`](crate::CommandGateway) call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("no backend connected")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by [`LibraryController`](crate::LibraryController).
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// The command failed; the catalog was left untouched.
    #[error("command failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
