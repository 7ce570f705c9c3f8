//! Push events emitted by the backend while it works on games.

use serde::{Deserialize, Serialize};

use crate::constants::EventType;
use crate::types::{GameKey, GameSource};

/// Payload of the events that only name a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRef {
    pub game_id: String,
    pub game_source: GameSource,
}

impl GameRef {
    pub fn key(&self) -> GameKey {
        GameKey::new(self.game_id.clone(), self.game_source)
    }
}

impl From<&GameKey> for GameRef {
    fn from(key: &GameKey) -> Self {
        Self {
            game_id: key.id.clone(),
            game_source: key.source,
        }
    }
}

/// A managed download entered the backend's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDownloadQueued {
    pub game_id: String,
    pub game_source: GameSource,
    pub game_title: String,
    pub download_size: u64,
    #[serde(default)]
    pub downloaded: u64,
}

/// Bytes received so far for a queued download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDownloadProgress {
    pub game_id: String,
    pub game_source: GameSource,
    pub downloaded: u64,
}

/// A download started outside the launcher (e.g. in the browser).
///
/// The size is often unknown until the transfer finishes; `0` means unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDownloadExternal {
    pub game_id: String,
    pub game_source: GameSource,
    pub game_title: String,
    #[serde(default)]
    pub download_size: u64,
}

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Hidden(GameRef),
    Uninstalling(GameRef),
    Uninstalled(GameRef),
    DownloadQueued(GameDownloadQueued),
    DownloadProgress(GameDownloadProgress),
    DownloadExternal(GameDownloadExternal),
    Installing(GameRef),
    Installed(GameRef),
}

impl GameEvent {
    /// The game this event is about.
    pub fn key(&self) -> GameKey {
        match self {
            GameEvent::Hidden(r)
            | GameEvent::Uninstalling(r)
            | GameEvent::Uninstalled(r)
            | GameEvent::Installing(r)
            | GameEvent::Installed(r) => r.key(),
            GameEvent::DownloadQueued(e) => GameKey::new(e.game_id.clone(), e.game_source),
            GameEvent::DownloadProgress(e) => GameKey::new(e.game_id.clone(), e.game_source),
            GameEvent::DownloadExternal(e) => GameKey::new(e.game_id.clone(), e.game_source),
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            GameEvent::Hidden(_) => EventType::GameHidden,
            GameEvent::Uninstalling(_) => EventType::GameUninstalling,
            GameEvent::Uninstalled(_) => EventType::GameUninstalled,
            GameEvent::DownloadQueued(_) => EventType::GameDownloadQueued,
            GameEvent::DownloadProgress(_) => EventType::GameDownloadProgress,
            GameEvent::DownloadExternal(_) => EventType::GameDownloadExternal,
            GameEvent::Installing(_) => EventType::GameInstalling,
            GameEvent::Installed(_) => EventType::GameInstalled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_payload_uses_camel_case() {
        let json = r#"{"gameId":"a","gameSource":"itchio","gameTitle":"Foo","downloadSize":1000}"#;
        let queued: GameDownloadQueued = serde_json::from_str(json).unwrap();
        assert_eq!(queued.game_title, "Foo");
        assert_eq!(queued.download_size, 1000);
        assert_eq!(queued.downloaded, 0);
    }

    #[test]
    fn external_size_defaults_to_unknown() {
        let json = r#"{"gameId":"b","gameSource":"legacyGames","gameTitle":"Bar"}"#;
        let external: GameDownloadExternal = serde_json::from_str(json).unwrap();
        assert_eq!(external.download_size, 0);
    }

    #[test]
    fn event_key_and_type() {
        let ev = GameEvent::DownloadProgress(GameDownloadProgress {
            game_id: "a".into(),
            game_source: GameSource::Itchio,
            downloaded: 10,
        });
        assert_eq!(ev.key(), GameKey::new("a", GameSource::Itchio));
        assert_eq!(ev.event_type(), EventType::GameDownloadProgress);

        let key = GameKey::new("z", GameSource::EpicGames);
        let ev = GameEvent::Installed(GameRef::from(&key));
        assert_eq!(ev.key(), key);
        assert_eq!(ev.event_type(), EventType::GameInstalled);
    }
}
