//! Shared error types.

use thiserror::Error;

/// Failure to decode a server-pushed frame.
///
/// Unknown event names are not errors; see [`crate::ServerEvent::decode`].
#[derive(Debug, Error)]
pub enum EventError {
    /// The frame was not a JSON envelope at all.
    #[error("invalid event frame: {0}")]
    Frame(#[source] serde_json::Error),
    /// A recognized event carried a payload of the wrong shape.
    #[error("malformed `{event}` payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EventError {
    /// Name of the event the error belongs to, if the frame got that far.
    pub fn event(&self) -> Option<&str> {
        match self {
            EventError::Frame(_) => None,
            EventError::Malformed { event, .. } => Some(event),
        }
    }
}
