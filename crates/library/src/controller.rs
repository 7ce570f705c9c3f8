//! Command surface of a library view.
//!
//! Commands go to the backend through a [`CommandGateway`]; their results
//! reach the catalog only through generation-stamped writes, so a fetch
//! that resolves after newer events can not roll state back. A view that
//! has been torn down discards everything still in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fusion_catalog::{CatalogError, CatalogStore, GenerationClock, SnapshotOutcome};
use fusion_protocol::{DownloadOptions, GameKey, GameVersion, StatusFilter, VersionDownloadInfo};

use crate::error::LibraryError;
use crate::filter::{FilterEffect, FilterView, LibraryView};
use crate::gateway::CommandGateway;

/// What happened to a `fetch_games` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied(SnapshotOutcome),
    /// The view was torn down or a newer refresh was issued meanwhile.
    Discarded,
}

/// Result of activating a game tile.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    Launched,
    /// Not installed: the versions to offer in the install dialog.
    ChooseVersion(Vec<GameVersion>),
}

/// Drives one library view against the backend and the shared catalog.
pub struct LibraryController {
    gateway: Arc<dyn CommandGateway>,
    catalog: Arc<CatalogStore>,
    clock: GenerationClock,
    view: Mutex<FilterView>,
    /// Sequence of the most recently issued refresh.
    latest_refresh: AtomicU64,
    alive: CancellationToken,
}

impl LibraryController {
    pub fn new(
        gateway: Arc<dyn CommandGateway>,
        catalog: Arc<CatalogStore>,
        clock: GenerationClock,
        view: FilterView,
    ) -> Self {
        Self {
            gateway,
            catalog,
            clock,
            view: Mutex::new(view),
            latest_refresh: AtomicU64::new(0),
            alive: CancellationToken::new(),
        }
    }

    fn lock_view(&self) -> MutexGuard<'_, FilterView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn filter_view(&self) -> FilterView {
        self.lock_view().clone()
    }

    /// The grid for the current filters.
    pub fn view(&self) -> LibraryView {
        self.lock_view().derive(&self.catalog)
    }

    pub fn is_alive(&self) -> bool {
        !self.alive.is_cancelled()
    }

    /// Fetches the games matching the current query and merges them.
    ///
    /// The snapshot is stamped with the generation current at issue time,
    /// so any event processed while the request was in flight wins over it.
    pub async fn refresh(&self, refetch: bool) -> Result<RefreshOutcome, LibraryError> {
        let request_id = Uuid::new_v4();
        let seq = self.latest_refresh.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.clock.current();
        let filters = self.lock_view().fetch_filters();
        debug!(%request_id, generation, refetch, query = ?filters.query, "fetching games");

        let games = tokio::select! {
            _ = self.alive.cancelled() => {
                debug!(%request_id, "view torn down, discarding fetch");
                return Ok(RefreshOutcome::Discarded);
            }
            result = self.gateway.fetch_games(refetch, &filters) => {
                result.inspect_err(|e| warn!(%request_id, error = %e, "fetch_games failed"))?
            }
        };

        if !self.is_alive() {
            debug!(%request_id, "view torn down, discarding fetch");
            return Ok(RefreshOutcome::Discarded);
        }
        if self.latest_refresh.load(Ordering::SeqCst) != seq {
            debug!(%request_id, "superseded by a newer fetch, discarding");
            return Ok(RefreshOutcome::Discarded);
        }

        let count = games.len();
        let outcome = self.catalog.apply_snapshot(games, generation);
        debug!(%request_id, count, applied = outcome.applied, stale = outcome.stale, "games merged");
        Ok(RefreshOutcome::Applied(outcome))
    }

    /// Changes the search text, refetching when it actually changed.
    pub async fn set_query(&self, query: impl Into<String>) -> Result<FilterEffect, LibraryError> {
        let effect = self.lock_view().set_query(query);
        if effect == FilterEffect::Refetch {
            self.refresh(false).await?;
        }
        Ok(effect)
    }

    /// Changes the status tab. Purely local.
    pub fn set_status(&self, status: StatusFilter) -> LibraryView {
        let mut view = self.lock_view();
        view.set_status(status);
        view.derive(&self.catalog)
    }

    pub fn set_include_hidden(&self, include_hidden: bool) -> LibraryView {
        let mut view = self.lock_view();
        view.set_include_hidden(include_hidden);
        view.derive(&self.catalog)
    }

    /// Hides a game on the backend and, once confirmed, drops it locally.
    pub async fn hide_game(&self, key: &GameKey) -> Result<(), LibraryError> {
        self.gateway
            .hide_game(key)
            .await
            .inspect_err(|e| warn!(game = %key, error = %e, "hide_game failed"))?;

        if !self.is_alive() {
            debug!(game = %key, "view torn down, skipping local hide");
            return Ok(());
        }
        // An unknown key was already logged by the store.
        let _ = self.catalog.remove(key, self.clock.advance());
        info!(game = %key, "game hidden");
        Ok(())
    }

    pub async fn uninstall_game(&self, key: &GameKey) -> Result<(), LibraryError> {
        self.gateway
            .uninstall_game(key)
            .await
            .inspect_err(|e| warn!(game = %key, error = %e, "uninstall_game failed"))?;
        debug!(game = %key, "uninstall requested");
        Ok(())
    }

    pub async fn fetch_versions(&self, key: &GameKey) -> Result<Vec<GameVersion>, LibraryError> {
        Ok(self.gateway.fetch_versions(key).await?)
    }

    pub async fn fetch_version_info(
        &self,
        key: &GameKey,
        version_id: &str,
    ) -> Result<VersionDownloadInfo, LibraryError> {
        Ok(self.gateway.fetch_version_info(key, version_id).await?)
    }

    /// Starts a download. Progress arrives through the event stream.
    pub async fn download_game(
        &self,
        key: &GameKey,
        version_id: &str,
        options: &DownloadOptions,
    ) -> Result<(), LibraryError> {
        self.gateway
            .download_game(key, version_id, options)
            .await
            .inspect_err(|e| warn!(game = %key, version_id, error = %e, "download_game failed"))?;
        info!(
            game = %key,
            version_id,
            location = %options.install_location.display(),
            "download requested"
        );
        Ok(())
    }

    pub async fn launch_game(&self, key: &GameKey) -> Result<(), LibraryError> {
        self.gateway
            .launch_game(key)
            .await
            .inspect_err(|e| warn!(game = %key, error = %e, "launch_game failed"))?;
        info!(game = %key, "game launched");
        Ok(())
    }

    /// Opens a game tile: launches an installed game, otherwise returns the
    /// versions to choose from.
    pub async fn activate(&self, key: &GameKey) -> Result<Activation, LibraryError> {
        let record = self
            .catalog
            .get(key)
            .ok_or_else(|| CatalogError::UnknownKey(key.clone()))?;

        if record.is_installed() {
            self.launch_game(key).await?;
            Ok(Activation::Launched)
        } else {
            Ok(Activation::ChooseVersion(self.fetch_versions(key).await?))
        }
    }

    /// Marks the view as gone. Results still in flight are dropped.
    pub fn teardown(&self) {
        debug!("library view torn down");
        self.alive.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use fusion_catalog::GamePatch;
    use fusion_protocol::{Game, GameFilters, GameSource, GameStatus};
    use tokio::sync::oneshot;

    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::GatewayFuture;

    /// Records every call; answers from canned data.
    #[derive(Default)]
    struct MockGateway {
        games: Mutex<Vec<Game>>,
        versions: Vec<GameVersion>,
        calls: Mutex<Vec<String>>,
        filters: Mutex<Vec<GameFilters>>,
        fail: bool,
        /// Holds the next `fetch_games` until the sender fires.
        gates: Mutex<HashMap<usize, oneshot::Receiver<()>>>,
    }

    impl MockGateway {
        fn with_games(games: Vec<Game>) -> Self {
            Self {
                games: Mutex::new(games),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        /// Blocks the `n`th fetch (0-based) until the returned sender fires.
        fn gate_fetch(&self, n: usize) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(n, rx);
            tx
        }

        fn set_games(&self, games: Vec<Game>) {
            *self.games.lock().unwrap() = games;
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(GatewayError::Backend("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    impl CommandGateway for MockGateway {
        fn fetch_games(&self, refetch: bool, filters: &GameFilters) -> GatewayFuture<'_, Vec<Game>> {
            let n = {
                let mut all = self.filters.lock().unwrap();
                all.push(filters.clone());
                all.len() - 1
            };
            let gate = self.gates.lock().unwrap().remove(&n);
            let result = self.record(format!("fetch_games:{refetch}"));
            let games = self.games.lock().unwrap().clone();
            Box::pin(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                result.map(|()| games)
            })
        }

        fn hide_game(&self, key: &GameKey) -> GatewayFuture<'_, ()> {
            let result = self.record(format!("hide_game:{key}"));
            Box::pin(async move { result })
        }

        fn uninstall_game(&self, key: &GameKey) -> GatewayFuture<'_, ()> {
            let result = self.record(format!("uninstall_game:{key}"));
            Box::pin(async move { result })
        }

        fn fetch_versions(&self, key: &GameKey) -> GatewayFuture<'_, Vec<GameVersion>> {
            let result = self.record(format!("fetch_versions:{key}"));
            let versions = self.versions.clone();
            Box::pin(async move { result.map(|()| versions) })
        }

        fn fetch_version_info(
            &self,
            key: &GameKey,
            version_id: &str,
        ) -> GatewayFuture<'_, VersionDownloadInfo> {
            let result = self.record(format!("fetch_version_info:{key}:{version_id}"));
            Box::pin(async move {
                result.map(|()| VersionDownloadInfo {
                    install_size: 2048,
                    download_size: 1024,
                })
            })
        }

        fn download_game(
            &self,
            key: &GameKey,
            version_id: &str,
            options: &DownloadOptions,
        ) -> GatewayFuture<'_, ()> {
            let result = self.record(format!(
                "download_game:{key}:{version_id}:{}",
                options.install_location.display()
            ));
            Box::pin(async move { result })
        }

        fn launch_game(&self, key: &GameKey) -> GatewayFuture<'_, ()> {
            let result = self.record(format!("launch_game:{key}"));
            Box::pin(async move { result })
        }
    }

    fn game(id: &str, title: &str, status: GameStatus) -> Game {
        Game {
            id: id.into(),
            source: GameSource::Itchio,
            title: title.into(),
            developer: None,
            status,
            path: None,
            favorite: false,
            hidden: false,
            cover_url: None,
        }
    }

    fn key(id: &str) -> GameKey {
        GameKey::new(id, GameSource::Itchio)
    }

    fn controller(gateway: Arc<MockGateway>) -> (LibraryController, GenerationClock) {
        let clock = GenerationClock::new();
        let ctl = LibraryController::new(
            gateway,
            Arc::new(CatalogStore::new()),
            clock.clone(),
            FilterView::new(),
        );
        (ctl, clock)
    }

    fn two_games() -> Vec<Game> {
        vec![
            game("a", "Alpha", GameStatus::Installed),
            game("b", "Beta", GameStatus::NotInstalled),
        ]
    }

    #[tokio::test]
    async fn refresh_applies_snapshot() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let (ctl, _) = controller(Arc::clone(&gw));

        let outcome = ctl.refresh(true).await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Applied(o) if o.applied == 2));
        let view = ctl.view();
        assert_eq!((view.total, view.installed, view.not_installed), (2, 1, 1));
        assert_eq!(gw.calls(), vec!["fetch_games:true"]);
    }

    #[tokio::test]
    async fn refresh_failure_leaves_store_untouched() {
        let gw = Arc::new(MockGateway::failing());
        let (ctl, _) = controller(gw);

        let err = ctl.refresh(false).await.unwrap_err();

        assert!(matches!(err, LibraryError::Gateway(GatewayError::Backend(_))));
        assert!(ctl.catalog().is_empty());
    }

    #[tokio::test]
    async fn refresh_stamps_generation_at_issue_time() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let (ctl, clock) = controller(Arc::clone(&gw));
        ctl.refresh(false).await.unwrap();

        // Next fetch is held in flight while an event installs `b`.
        let release = gw.gate_fetch(1);
        let fetch = ctl.refresh(false);
        tokio::pin!(fetch);
        tokio::select! {
            biased;
            _ = &mut fetch => panic!("fetch should be gated"),
            _ = tokio::task::yield_now() => {}
        }

        let catalog = Arc::clone(ctl.catalog());
        catalog
            .apply_patch(&key("b"), GamePatch::Status(GameStatus::Downloading), clock.advance())
            .unwrap();

        release.send(()).unwrap();
        let outcome = fetch.await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Applied(o) if o.stale == 1));
        assert_eq!(catalog.get(&key("b")).unwrap().status, GameStatus::Downloading);
    }

    #[tokio::test]
    async fn teardown_discards_in_flight_fetch() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let release = gw.gate_fetch(0);
        let (ctl, _) = controller(Arc::clone(&gw));
        let ctl = Arc::new(ctl);

        let task = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move { ctl.refresh(false).await })
        };
        tokio::task::yield_now().await;

        ctl.teardown();
        let _ = release.send(());
        let outcome = task.await.unwrap().unwrap();

        assert_eq!(outcome, RefreshOutcome::Discarded);
        assert!(ctl.catalog().is_empty());
        assert!(!ctl.is_alive());
    }

    #[tokio::test]
    async fn superseded_fetch_is_discarded() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let release_first = gw.gate_fetch(0);
        let (ctl, _) = controller(Arc::clone(&gw));
        let ctl = Arc::new(ctl);

        let first = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move { ctl.refresh(false).await })
        };
        tokio::task::yield_now().await;

        gw.set_games(vec![game("b", "Beta", GameStatus::NotInstalled)]);
        let second = ctl.refresh(false).await.unwrap();
        let _ = release_first.send(());
        let first = first.await.unwrap().unwrap();

        assert!(matches!(second, RefreshOutcome::Applied(_)));
        assert_eq!(first, RefreshOutcome::Discarded);
        assert_eq!(ctl.view().total, 1);
    }

    #[tokio::test]
    async fn set_query_refetches_only_on_change() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let (ctl, _) = controller(Arc::clone(&gw));

        assert_eq!(ctl.set_query("alp").await.unwrap(), FilterEffect::Refetch);
        assert_eq!(ctl.set_query(" alp ").await.unwrap(), FilterEffect::Unchanged);

        assert_eq!(gw.calls(), vec!["fetch_games:false"]);
        let sent = gw.filters.lock().unwrap().clone();
        assert_eq!(sent[0].query.as_deref(), Some("alp"));
        assert_eq!(sent[0].status, None);
    }

    #[tokio::test]
    async fn set_status_needs_no_round_trip() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let (ctl, _) = controller(Arc::clone(&gw));
        ctl.refresh(false).await.unwrap();

        let view = ctl.set_status(StatusFilter::Installed);

        assert_eq!(view.games.len(), 1);
        assert_eq!(view.games[0].key, key("a"));
        assert_eq!(gw.calls().len(), 1);
    }

    #[tokio::test]
    async fn hide_removes_after_confirmation() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let (ctl, clock) = controller(Arc::clone(&gw));
        ctl.refresh(false).await.unwrap();
        let before = clock.current();

        ctl.hide_game(&key("a")).await.unwrap();

        assert!(ctl.catalog().get(&key("a")).is_none());
        assert_eq!(ctl.view().total, 1);
        assert!(clock.current() > before);
    }

    #[tokio::test]
    async fn failed_hide_keeps_record() {
        let gw = Arc::new(MockGateway::failing());
        let (ctl, _) = controller(gw);
        ctl.catalog().apply_snapshot(two_games(), 0);

        let err = ctl.hide_game(&key("a")).await.unwrap_err();

        assert!(matches!(err, LibraryError::Gateway(_)));
        assert!(ctl.catalog().get(&key("a")).is_some());
    }

    #[tokio::test]
    async fn pass_through_commands_do_not_touch_store() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let (ctl, _) = controller(Arc::clone(&gw));
        ctl.refresh(false).await.unwrap();
        let before = ctl.catalog().snapshot();

        ctl.uninstall_game(&key("a")).await.unwrap();
        let info = ctl.fetch_version_info(&key("b"), "v1").await.unwrap();
        ctl.download_game(
            &key("b"),
            "v1",
            &DownloadOptions {
                install_location: PathBuf::from("/games"),
            },
        )
        .await
        .unwrap();

        assert_eq!(info.install_size, 2048);
        assert_eq!(ctl.catalog().snapshot(), before);
        assert_eq!(
            gw.calls()[1..],
            [
                "uninstall_game:itchio:a".to_string(),
                "fetch_version_info:itchio:b:v1".to_string(),
                "download_game:itchio:b:v1:/games".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn activate_launches_installed_game() {
        let gw = Arc::new(MockGateway::with_games(two_games()));
        let (ctl, _) = controller(Arc::clone(&gw));
        ctl.refresh(false).await.unwrap();

        assert_eq!(ctl.activate(&key("a")).await.unwrap(), Activation::Launched);
        assert_eq!(gw.calls().last().unwrap(), "launch_game:itchio:a");
    }

    #[tokio::test]
    async fn activate_offers_versions_otherwise() {
        let version = GameVersion {
            id: "v1".into(),
            game_id: "b".into(),
            source: GameSource::Itchio,
            name: "1.0".into(),
            download_size: 10,
            external: false,
        };
        let gw = Arc::new(MockGateway {
            games: Mutex::new(two_games()),
            versions: vec![version.clone()],
            ..Default::default()
        });
        let (ctl, _) = controller(Arc::clone(&gw));
        ctl.refresh(false).await.unwrap();

        let activation = ctl.activate(&key("b")).await.unwrap();

        assert_eq!(activation, Activation::ChooseVersion(vec![version]));
    }

    #[tokio::test]
    async fn activate_unknown_game_errors() {
        let gw = Arc::new(MockGateway::default());
        let (ctl, _) = controller(gw);

        let err = ctl.activate(&key("ghost")).await.unwrap_err();

        assert!(matches!(err, LibraryError::Catalog(CatalogError::UnknownKey(_))));
    }

    #[tokio::test]
    async fn launch_failure_surfaces() {
        let gw = Arc::new(MockGateway::failing());
        let (ctl, _) = controller(gw);
        assert!(ctl.launch_game(&key("a")).await.is_err());
    }
}
