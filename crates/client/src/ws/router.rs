//! Fan-out of server events into cache invalidations and notifications.
//!
//! [`effects_for`] is the whole dispatch table and has no side effects;
//! [`EventRouter`] applies its result to the cache, the notifier and the
//! connection store.

use std::fmt;
use std::sync::Arc;

use casepulse_shared::{CacheKey, EntityId, Notification, ServerEnvelope, ServerEvent};
use chrono::Utc;
use serde_json::Value;

use crate::cache::QueryCache;
use crate::notify::Notifier;
use crate::stores::ConnectionStore;

/// One side effect of a server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Invalidate(CacheKey),
    Notify(Notification),
}

/// What happened to a routed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Dispatched,
    /// Event name not known to this client.
    Unknown,
    /// Known event with an unusable payload, or not an event frame at all.
    Malformed,
}

/// Side effects of `event`, in the order they are applied.
pub fn effects_for(event: &ServerEvent) -> Vec<Effect> {
    match event {
        ServerEvent::Connected { .. } => Vec::new(),
        ServerEvent::EntityUpdated { kind, id } => vec![Effect::Invalidate(
            CacheKey::entity_or_collection(*kind, id.clone()),
        )],
        ServerEvent::SuggestionGenerated { case_id, .. } => vec![
            Effect::Invalidate(CacheKey::suggestions_for(case_id.clone())),
            Effect::Notify(suggestion_notification(case_id.as_ref())),
        ],
        ServerEvent::SuggestionVerified { case_id, .. } => {
            vec![Effect::Invalidate(CacheKey::suggestions_for(case_id.clone()))]
        }
        ServerEvent::Notification(notification) => vec![
            Effect::Invalidate(CacheKey::Alerts),
            Effect::Notify(notification.clone()),
        ],
        ServerEvent::DocumentUploaded {
            case_id, file_name, ..
        } => vec![
            Effect::Invalidate(CacheKey::CaseDocuments(case_id.clone())),
            Effect::Notify(upload_notification(file_name.as_deref())),
        ],
        ServerEvent::DocumentDeleted { case_id, .. } => {
            vec![Effect::Invalidate(CacheKey::CaseDocuments(case_id.clone()))]
        }
    }
}

fn suggestion_notification(case_id: Option<&EntityId>) -> Notification {
    let message = match case_id {
        Some(id) => format!("A new AI suggestion is ready for case {id}."),
        None => "A new AI suggestion is ready for review.".to_string(),
    };
    Notification::new("New AI suggestion", message)
}

fn upload_notification(file_name: Option<&str>) -> Notification {
    let message = match file_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("\"{name}\" was uploaded."),
        None => "A new document was uploaded.".to_string(),
    };
    Notification::new("Document uploaded", message)
}

/// Applies server events to the cache and notification layers.
#[derive(Clone)]
pub struct EventRouter {
    cache: Arc<dyn QueryCache>,
    notifier: Arc<dyn Notifier>,
    store: ConnectionStore,
}

impl EventRouter {
    pub fn new(
        cache: Arc<dyn QueryCache>,
        notifier: Arc<dyn Notifier>,
        store: ConnectionStore,
    ) -> Self {
        Self {
            cache,
            notifier,
            store,
        }
    }

    /// Route one text frame from the socket.
    pub fn route_frame(&self, text: &str) -> RouteOutcome {
        match ServerEnvelope::parse(text) {
            Ok(envelope) => self.route(&envelope.event, envelope.data),
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable frame");
                RouteOutcome::Malformed
            }
        }
    }

    /// Route a named event. Unknown and malformed events are logged and dropped.
    pub fn route(&self, name: &str, payload: Option<Value>) -> RouteOutcome {
        match ServerEvent::decode(name, payload) {
            Ok(Some(event)) => {
                self.dispatch(&event);
                RouteOutcome::Dispatched
            }
            Ok(None) => {
                tracing::debug!(event = name, "ignoring unknown server event");
                RouteOutcome::Unknown
            }
            Err(e) => {
                tracing::warn!(event = name, error = %e, "dropping malformed server event");
                RouteOutcome::Malformed
            }
        }
    }

    /// Stamp `last_event_at`, then apply the effects of `event`.
    pub fn dispatch(&self, event: &ServerEvent) {
        self.store.set_last_event_at(Utc::now());

        if let ServerEvent::Connected { client_id } = event {
            tracing::debug!(client_id = client_id.as_deref(), "server confirmed subscription");
        }

        for effect in effects_for(event) {
            match effect {
                Effect::Invalidate(key) => {
                    tracing::debug!(event = event.name(), %key, "invalidating");
                    self.cache.invalidate(&key);
                }
                Effect::Notify(notification) => {
                    tracing::debug!(event = event.name(), title = %notification.title, "notifying");
                    self.notifier.notify(notification);
                }
            }
        }
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter").finish_non_exhaustive()
    }
}
