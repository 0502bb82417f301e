//! Casepulse real-time client.
//!
//! Keeps one authenticated event-stream connection to the casepulse backend,
//! reconnects with exponential backoff when it drops, and turns server pushes
//! into read-cache invalidations and user notifications.

pub mod auth_session;
pub mod cache;
pub mod client;
pub mod components;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod stores;
pub mod ws;

pub use auth_session::{AuthSession, AuthTokenSource, SessionBinding};
pub use cache::QueryCache;
pub use client::RealtimeClient;
pub use components::StatusIndicator;
pub use config::RealtimeConfig;
pub use error::{ConfigError, TransportError};
pub use notify::{NotificationFeed, Notifier};
pub use stores::{ConnectionState, ConnectionStatus, ConnectionStore, Subscription};
pub use ws::{ConnectionManager, EventRouter, ManagerHandle, ReconnectConfig};

pub use casepulse_shared::{CacheKey, EntityId, EntityKind, Notification, ServerEvent};
