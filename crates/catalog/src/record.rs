//! Domain types for catalog entries.

use fusion_protocol::{Game, GameKey, GameStatus};
use serde::Serialize;

/// A game as mirrored locally, stamped with the generation of the last
/// write the store accepted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    #[serde(flatten)]
    pub key: GameKey,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
    pub status: GameStatus,
    pub hidden: bool,
    pub favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub generation: u64,
}

impl GameRecord {
    pub fn from_game(game: Game, generation: u64) -> Self {
        Self {
            key: GameKey::new(game.id, game.source),
            title: game.title,
            developer: game.developer,
            status: game.status,
            hidden: game.hidden,
            favorite: game.favorite,
            install_path: game.path,
            cover_url: game.cover_url,
            generation,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.status == GameStatus::Installed
    }
}

/// A partial, event-driven change to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePatch {
    Status(GameStatus),
    Hidden(bool),
    Favorite(bool),
}
