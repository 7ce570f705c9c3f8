//! Engine composition and the replay run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use fusion_catalog::{CatalogStore, GenerationClock};
use fusion_dispatcher::{DispatcherConfig, EventDispatcher};
use fusion_downloads::{DownloadTracker, DownloadsSnapshot};
use fusion_library::{
    CommandGateway, FilterView, GatewayError, GatewayFuture, LibraryController, LibraryView,
};
use fusion_protocol::{
    DownloadOptions, EventMessage, Game, GameFilters, GameKey, GameVersion, VersionDownloadInfo,
};

use crate::config::ReplayConfig;

/// Serves `get_games` from a JSON file holding an array of games.
///
/// Commands other than `fetch_games` are accepted and logged; the recorded
/// event log carries their effects.
pub struct FileGateway {
    snapshot: PathBuf,
}

impl FileGateway {
    pub fn new(snapshot: impl Into<PathBuf>) -> Self {
        Self {
            snapshot: snapshot.into(),
        }
    }

    fn accept(&self, command: &'static str, key: &GameKey) -> GatewayFuture<'_, ()> {
        tracing::debug!(command, game = %key, "command accepted");
        let result: Result<(), GatewayError> = Ok(());
        Box::pin(async move { result })
    }
}

async fn load_games(path: &Path, query: Option<String>) -> Result<Vec<Game>, GatewayError> {
    let content = tokio::fs::read_to_string(path).await?;
    let games: Vec<Game> = serde_json::from_str(&content)?;
    Ok(games
        .into_iter()
        .filter(|g| matches_query(g, query.as_deref()))
        .collect())
}

/// Case-insensitive title match, the way the backend searches.
fn matches_query(game: &Game, query: Option<&str>) -> bool {
    match query {
        Some(q) => game.title.to_lowercase().contains(&q.to_lowercase()),
        None => true,
    }
}

impl CommandGateway for FileGateway {
    fn fetch_games(&self, _refetch: bool, filters: &GameFilters) -> GatewayFuture<'_, Vec<Game>> {
        let query = filters.normalized_query().map(str::to_owned);
        Box::pin(load_games(&self.snapshot, query))
    }

    fn hide_game(&self, key: &GameKey) -> GatewayFuture<'_, ()> {
        self.accept("hide_game", key)
    }

    fn uninstall_game(&self, key: &GameKey) -> GatewayFuture<'_, ()> {
        self.accept("uninstall_game", key)
    }

    fn fetch_versions(&self, _key: &GameKey) -> GatewayFuture<'_, Vec<GameVersion>> {
        let result: Result<Vec<GameVersion>, GatewayError> = Ok(Vec::new());
        Box::pin(async move { result })
    }

    fn fetch_version_info(
        &self,
        key: &GameKey,
        version_id: &str,
    ) -> GatewayFuture<'_, VersionDownloadInfo> {
        let result: Result<VersionDownloadInfo, GatewayError> = Err(GatewayError::Backend(
            format!("no version info for {key} {version_id}"),
        ));
        Box::pin(async move { result })
    }

    fn download_game(
        &self,
        key: &GameKey,
        _version_id: &str,
        _options: &DownloadOptions,
    ) -> GatewayFuture<'_, ()> {
        self.accept("download_game", key)
    }

    fn launch_game(&self, key: &GameKey) -> GatewayFuture<'_, ()> {
        self.accept("launch_game", key)
    }
}

/// What the replay prints once the event log has been consumed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub library: LibraryView,
    pub downloads: DownloadsSnapshot,
    pub events_read: usize,
    pub lines_skipped: usize,
}

/// Composition root: owns the shared stores and wires them together.
pub struct Engine {
    config: ReplayConfig,
    catalog: Arc<CatalogStore>,
    downloads: Arc<DownloadTracker>,
    dispatcher: EventDispatcher,
    controller: LibraryController,
}

impl Engine {
    pub fn new(config: ReplayConfig, gateway: Arc<dyn CommandGateway>) -> Self {
        let clock = GenerationClock::new();
        let catalog = Arc::new(CatalogStore::new());
        let downloads = Arc::new(DownloadTracker::new());
        let dispatcher =
            EventDispatcher::new(Arc::clone(&catalog), Arc::clone(&downloads), clock.clone());
        let view = FilterView::new()
            .with_status(config.default_status_filter)
            .with_include_hidden(config.include_hidden);
        let controller = LibraryController::new(gateway, Arc::clone(&catalog), clock, view);

        Self {
            config,
            catalog,
            downloads,
            dispatcher,
            controller,
        }
    }

    pub fn controller(&self) -> &LibraryController {
        &self.controller
    }

    /// Loads the snapshot, streams every line of `events` through the
    /// dispatcher and waits for it to drain.
    pub async fn replay(&self, events: &Path) -> anyhow::Result<ReplayReport> {
        self.controller
            .refresh(false)
            .await
            .context("failed to load game snapshot")?;
        let (total, installed) = self.catalog.counts();
        tracing::info!(total, installed, "snapshot loaded");

        let file = tokio::fs::File::open(events)
            .await
            .with_context(|| format!("failed to open {}", events.display()))?;
        let mut lines = BufReader::new(file).lines();

        let cancel = CancellationToken::new();
        let handle = self.dispatcher.clone().spawn(
            DispatcherConfig::with_capacity(self.config.event_channel_capacity),
            cancel,
        );

        let mut events_read = 0;
        let mut lines_skipped = 0;
        let mut line_no = 0;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match EventMessage::from_json(line) {
                Ok(msg) => {
                    if !handle.send(msg).await {
                        anyhow::bail!("event dispatcher stopped early");
                    }
                    events_read += 1;
                }
                Err(e) => {
                    tracing::warn!(line = line_no, error = %e, "skipping unreadable event line");
                    lines_skipped += 1;
                }
            }
        }
        handle.shutdown().await;

        tracing::info!(events_read, lines_skipped, "event log replayed");
        Ok(ReplayReport {
            library: self.controller.view(),
            downloads: self.downloads.snapshot(),
            events_read,
            lines_skipped,
        })
    }
}

/// Runs one replay of `snapshot` and `events`.
pub async fn run(
    config: ReplayConfig,
    snapshot: &Path,
    events: &Path,
) -> anyhow::Result<ReplayReport> {
    let gateway = Arc::new(FileGateway::new(snapshot));
    let engine = Engine::new(config, gateway);
    let report = engine.replay(events).await;
    engine.controller().teardown();
    report
}
