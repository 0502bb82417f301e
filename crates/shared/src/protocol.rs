//! Wire format of the server-pushed event stream.
//!
//! Every text frame is a JSON envelope:
//!
//! ```json
//! {"type": "case-updated", "data": {"caseId": 42}, "ts": "2024-05-01T12:00:00Z"}
//! ```
//!
//! `data` and `ts` are optional. The envelope is decoded in two steps so that
//! unknown event names can be told apart from malformed known ones.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::EventError;
use crate::models::{optional_id, EntityId, EntityKind, Notification};

/// Event names as sent by the backend.
pub mod events {
    pub const CONNECTED: &str = "connected";
    pub const REGULATION_UPDATED: &str = "regulation-updated";
    pub const CASE_UPDATED: &str = "case-updated";
    pub const CLIENT_UPDATED: &str = "client-updated";
    pub const DOCUMENT_UPDATED: &str = "document-updated";
    pub const SUGGESTION_GENERATED: &str = "ai-suggestion-generated";
    pub const SUGGESTION_VERIFIED: &str = "ai-suggestion-verified";
    pub const NOTIFICATION: &str = "notification";
    pub const DOCUMENT_UPLOADED: &str = "document-uploaded";
    pub const DOCUMENT_DELETED: &str = "document-deleted";
}

/// A raw frame from the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Server send time. RFC 3339 strings and epoch milliseconds are
    /// understood; anything else reads as absent rather than failing the frame.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub ts: Option<DateTime<Utc>>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}

impl ServerEnvelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data: Some(data),
            ts: None,
        }
    }

    /// Parse a text frame into an envelope.
    pub fn parse(text: &str) -> Result<Self, EventError> {
        serde_json::from_str(text).map_err(EventError::Frame)
    }

    /// Decode the payload into a typed event. See [`ServerEvent::decode`].
    pub fn decode(&self) -> Result<Option<ServerEvent>, EventError> {
        ServerEvent::decode(&self.event, self.data.clone())
    }
}

/// A recognized server event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Handshake confirmation sent right after the socket opens.
    Connected { client_id: Option<String> },
    /// A regulation, case, client or document changed.
    EntityUpdated {
        kind: EntityKind,
        id: Option<EntityId>,
    },
    SuggestionGenerated {
        case_id: Option<EntityId>,
        suggestion_id: Option<EntityId>,
    },
    SuggestionVerified {
        case_id: Option<EntityId>,
        suggestion_id: Option<EntityId>,
    },
    /// Free-form notification for the user.
    Notification(Notification),
    DocumentUploaded {
        case_id: EntityId,
        document_id: Option<EntityId>,
        file_name: Option<String>,
    },
    DocumentDeleted {
        case_id: EntityId,
        document_id: Option<EntityId>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedPayload {
    client_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegulationRef {
    #[serde(default, deserialize_with = "optional_id")]
    regulation_id: Option<EntityId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseRef {
    #[serde(default, deserialize_with = "optional_id")]
    case_id: Option<EntityId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRef {
    #[serde(default, deserialize_with = "optional_id")]
    client_id: Option<EntityId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef {
    #[serde(default, deserialize_with = "optional_id")]
    document_id: Option<EntityId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionRef {
    #[serde(default, deserialize_with = "optional_id")]
    case_id: Option<EntityId>,
    #[serde(default, deserialize_with = "optional_id")]
    suggestion_id: Option<EntityId>,
}

#[derive(Deserialize)]
struct NotificationPayload {
    title: Option<String>,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentChange {
    case_id: EntityId,
    #[serde(default, deserialize_with = "optional_id")]
    document_id: Option<EntityId>,
    #[serde(alias = "filename")]
    file_name: Option<String>,
}

/// Title used when a notification arrives without one.
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Notification";

impl ServerEvent {
    /// Decode a named event.
    ///
    /// Returns `Ok(None)` for names this client does not know, so that new
    /// server events do not break older clients. A known name with a payload
    /// missing a required field is [`EventError::Malformed`].
    pub fn decode(name: &str, payload: Option<Value>) -> Result<Option<Self>, EventError> {
        let payload = match payload {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value,
        };

        let event = match name {
            events::CONNECTED => {
                let p: ConnectedPayload = payload_as(name, payload)?;
                ServerEvent::Connected {
                    client_id: p.client_id,
                }
            }
            events::REGULATION_UPDATED => {
                let p: RegulationRef = payload_as(name, payload)?;
                ServerEvent::EntityUpdated {
                    kind: EntityKind::Regulation,
                    id: p.regulation_id,
                }
            }
            events::CASE_UPDATED => {
                let p: CaseRef = payload_as(name, payload)?;
                ServerEvent::EntityUpdated {
                    kind: EntityKind::Case,
                    id: p.case_id,
                }
            }
            events::CLIENT_UPDATED => {
                let p: ClientRef = payload_as(name, payload)?;
                ServerEvent::EntityUpdated {
                    kind: EntityKind::Client,
                    id: p.client_id,
                }
            }
            events::DOCUMENT_UPDATED => {
                let p: DocumentRef = payload_as(name, payload)?;
                ServerEvent::EntityUpdated {
                    kind: EntityKind::Document,
                    id: p.document_id,
                }
            }
            events::SUGGESTION_GENERATED => {
                let p: SuggestionRef = payload_as(name, payload)?;
                ServerEvent::SuggestionGenerated {
                    case_id: p.case_id,
                    suggestion_id: p.suggestion_id,
                }
            }
            events::SUGGESTION_VERIFIED => {
                let p: SuggestionRef = payload_as(name, payload)?;
                ServerEvent::SuggestionVerified {
                    case_id: p.case_id,
                    suggestion_id: p.suggestion_id,
                }
            }
            events::NOTIFICATION => {
                let p: NotificationPayload = payload_as(name, payload)?;
                let title = p
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string());
                ServerEvent::Notification(Notification::new(title, p.message))
            }
            events::DOCUMENT_UPLOADED => {
                let p: DocumentChange = payload_as(name, payload)?;
                ServerEvent::DocumentUploaded {
                    case_id: p.case_id,
                    document_id: p.document_id,
                    file_name: p.file_name,
                }
            }
            events::DOCUMENT_DELETED => {
                let p: DocumentChange = payload_as(name, payload)?;
                ServerEvent::DocumentDeleted {
                    case_id: p.case_id,
                    document_id: p.document_id,
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(event))
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => events::CONNECTED,
            ServerEvent::EntityUpdated { kind, .. } => match kind {
                EntityKind::Regulation => events::REGULATION_UPDATED,
                EntityKind::Case => events::CASE_UPDATED,
                EntityKind::Client => events::CLIENT_UPDATED,
                EntityKind::Document => events::DOCUMENT_UPDATED,
            },
            ServerEvent::SuggestionGenerated { .. } => events::SUGGESTION_GENERATED,
            ServerEvent::SuggestionVerified { .. } => events::SUGGESTION_VERIFIED,
            ServerEvent::Notification(_) => events::NOTIFICATION,
            ServerEvent::DocumentUploaded { .. } => events::DOCUMENT_UPLOADED,
            ServerEvent::DocumentDeleted { .. } => events::DOCUMENT_DELETED,
        }
    }
}

fn payload_as<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, EventError> {
    serde_json::from_value(payload).map_err(|source| EventError::Malformed {
        event: event.to_string(),
        source,
    })
}
