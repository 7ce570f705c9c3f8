use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storefront a game belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameSource {
    Itchio,
    LegacyGames,
    EpicGames,
}

impl GameSource {
    /// Wire name of the storefront.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameSource::Itchio => "itchio",
            GameSource::LegacyGames => "legacyGames",
            GameSource::EpicGames => "epicGames",
        }
    }
}

impl fmt::Display for GameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install lifecycle of a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    #[default]
    NotInstalled,
    Downloading,
    Installing,
    Installed,
    Uninstalling,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::NotInstalled => "notInstalled",
            GameStatus::Downloading => "downloading",
            GameStatus::Installing => "installing",
            GameStatus::Installed => "installed",
            GameStatus::Uninstalling => "uninstalling",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite identity of a game: the same id may exist on several storefronts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameKey {
    pub id: String,
    pub source: GameSource,
}

impl GameKey {
    pub fn new(id: impl Into<String>, source: GameSource) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

/// A game as reported by the backend's `get_games` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub source: GameSource,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl Game {
    pub fn key(&self) -> GameKey {
        GameKey::new(self.id.clone(), self.source)
    }
}

/// Status filter of the library view.
///
/// `NotInstalled` covers every status other than `Installed`, so that the
/// filtered list always matches the `total - installed` count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    #[default]
    All,
    Installed,
    NotInstalled,
}

impl StatusFilter {
    /// Whether a game with the given status passes this filter.
    pub fn matches(&self, status: GameStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Installed => status == GameStatus::Installed,
            StatusFilter::NotInstalled => status != GameStatus::Installed,
        }
    }
}

/// Filters sent along with `get_games`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusFilter>,
}

impl GameFilters {
    /// The free-text query, trimmed, or `None` when blank.
    pub fn normalized_query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// The effective status filter (`All` when unset).
    pub fn status(&self) -> StatusFilter {
        self.status.unwrap_or_default()
    }
}

/// A downloadable version of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameVersion {
    pub id: String,
    pub game_id: String,
    pub source: GameSource,
    pub name: String,
    pub download_size: u64,
    /// Served by a third-party site; the transfer happens outside the launcher.
    #[serde(default)]
    pub external: bool,
}

/// Sizes reported for a specific version before downloading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDownloadInfo {
    pub install_size: u64,
    #[serde(default)]
    pub download_size: u64,
}

/// Options passed to `download_game`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOptions {
    pub install_location: PathBuf,
}
