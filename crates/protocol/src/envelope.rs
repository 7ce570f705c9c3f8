use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::EventType;
use crate::error::ProtocolError;
use crate::events::GameEvent;

/// Envelope for every push event.
///
/// The `payload` field uses `serde_json::value::RawValue` to defer
/// deserialization until the event name has been matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub event: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
}

impl EventMessage {
    /// Creates a new message with the given event name and payload.
    pub fn new<T: Serialize>(
        event: EventType,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match payload {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            event,
            payload: raw,
        })
    }

    /// Wraps a decoded event back into its wire envelope.
    pub fn from_event(event: &GameEvent) -> Result<Self, serde_json::Error> {
        let et = event.event_type();
        match event {
            GameEvent::Hidden(p)
            | GameEvent::Uninstalling(p)
            | GameEvent::Uninstalled(p)
            | GameEvent::Installing(p)
            | GameEvent::Installed(p) => Self::new(et, Some(p)),
            GameEvent::DownloadQueued(p) => Self::new(et, Some(p)),
            GameEvent::DownloadProgress(p) => Self::new(et, Some(p)),
            GameEvent::DownloadExternal(p) => Self::new(et, Some(p)),
        }
    }

    /// Parses one JSON-encoded envelope.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        match &self.payload {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Decodes the envelope into a typed event.
    ///
    /// Unknown event names and payloads that do not match the event's shape
    /// are reported as errors; the caller decides whether to drop them.
    pub fn decode(&self) -> Result<GameEvent, ProtocolError> {
        match &self.event {
            EventType::GameHidden => self.required_payload().map(GameEvent::Hidden),
            EventType::GameUninstalling => self.required_payload().map(GameEvent::Uninstalling),
            EventType::GameUninstalled => self.required_payload().map(GameEvent::Uninstalled),
            EventType::GameDownloadQueued => {
                self.required_payload().map(GameEvent::DownloadQueued)
            }
            EventType::GameDownloadProgress => {
                self.required_payload().map(GameEvent::DownloadProgress)
            }
            EventType::GameDownloadExternal => {
                self.required_payload().map(GameEvent::DownloadExternal)
            }
            EventType::GameInstalling => self.required_payload().map(GameEvent::Installing),
            EventType::GameInstalled => self.required_payload().map(GameEvent::Installed),
            EventType::Unknown(name) => Err(ProtocolError::UnknownEvent(name.clone())),
        }
    }

    fn required_payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let event = self.event.as_str().to_owned();
        match self.parse_payload::<T>() {
            Ok(Some(p)) => Ok(p),
            Ok(None) => Err(ProtocolError::MissingPayload(event)),
            Err(source) => Err(ProtocolError::Malformed { event, source }),
        }
    }
}
