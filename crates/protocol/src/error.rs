//! Error types for decoding push events.

/// Errors produced while turning a raw event message into a [`GameEvent`](crate::GameEvent).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown event type {0}")]
    UnknownEvent(String),

    #[error("event {0} has no payload")]
    MissingPayload(String),

    #[error("malformed {event} payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
