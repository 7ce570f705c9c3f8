use serde::{Deserialize, Serialize};

/// Push event name as emitted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    GameHidden,
    GameUninstalling,
    GameUninstalled,
    GameDownloadQueued,
    GameDownloadProgress,
    GameDownloadExternal,
    GameInstalling,
    GameInstalled,

    /// Forward compatibility: unrecognized names deserialize here, verbatim.
    Unknown(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::GameHidden => "game-hidden",
            EventType::GameUninstalling => "game-uninstalling",
            EventType::GameUninstalled => "game-uninstalled",
            EventType::GameDownloadQueued => "game-download-queued",
            EventType::GameDownloadProgress => "game-download-progress",
            EventType::GameDownloadExternal => "game-download-external",
            EventType::GameInstalling => "game-installing",
            EventType::GameInstalled => "game-installed",
            EventType::Unknown(name) => name.as_str(),
        }
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "game-hidden" => EventType::GameHidden,
            "game-uninstalling" => EventType::GameUninstalling,
            "game-uninstalled" => EventType::GameUninstalled,
            "game-download-queued" => EventType::GameDownloadQueued,
            "game-download-progress" => EventType::GameDownloadProgress,
            "game-download-external" => EventType::GameDownloadExternal,
            "game-installing" => EventType::GameInstalling,
            "game-installed" => EventType::GameInstalled,
            _ => EventType::Unknown(name),
        }
    }
}

impl From<EventType> for String {
    fn from(event: EventType) -> Self {
        match event {
            EventType::Unknown(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}
