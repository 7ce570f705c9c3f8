//! Request/response surface of the launcher backend.

use std::future::Future;
use std::pin::Pin;

use fusion_protocol::{DownloadOptions, Game, GameFilters, GameKey, GameVersion, VersionDownloadInfo};

use crate::error::GatewayError;

/// Boxed future returned by every [`CommandGateway`] call.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// Abstraction over the backend command channel.
///
/// The app implements this on top of its transport; tests use an in-memory
/// mock. Implementations own whatever they need from the arguments, since
/// the returned future only borrows `self`.
pub trait CommandGateway: Send + Sync {
    /// Lists games matching `filters`. `refetch` asks the backend to
    /// rescan storefronts instead of answering from its cache.
    fn fetch_games(&self, refetch: bool, filters: &GameFilters) -> GatewayFuture<'_, Vec<Game>>;

    fn hide_game(&self, key: &GameKey) -> GatewayFuture<'_, ()>;

    fn uninstall_game(&self, key: &GameKey) -> GatewayFuture<'_, ()>;

    fn fetch_versions(&self, key: &GameKey) -> GatewayFuture<'_, Vec<GameVersion>>;

    fn fetch_version_info(
        &self,
        key: &GameKey,
        version_id: &str,
    ) -> GatewayFuture<'_, VersionDownloadInfo>;

    fn download_game(
        &self,
        key: &GameKey,
        version_id: &str,
        options: &DownloadOptions,
    ) -> GatewayFuture<'_, ()>;

    fn launch_game(&self, key: &GameKey) -> GatewayFuture<'_, ()>;
}
