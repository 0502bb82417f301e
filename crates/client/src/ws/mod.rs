//! WebSocket module for live updates from the casepulse backend.
//!
//! This module provides:
//! - A connection manager with exponential-backoff reconnect
//! - A transport abstraction with a tokio-tungstenite implementation
//! - An event router that turns server events into cache invalidations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐  connect / disconnect  ┌─────────────────────┐
//! │  SessionBinding   │ ─────────────────────▶ │  ConnectionManager  │
//! │ (auth token watch)│                        │  (single task)      │
//! └───────────────────┘                        └─────────────────────┘
//!                                     open │   ▲ TransportEvent  │ status, attempts,
//!                                          ▼   │                 ▼ error
//!                                  ┌──────────────┐      ┌─────────────────┐
//!                                  │  Connector   │      │ ConnectionStore │
//!                                  │ (WsConnector)│      └─────────────────┘
//!                                  └──────────────┘               │
//!                                          │ text frames          ▼
//!                                          ▼               status indicator
//!                                  ┌──────────────┐
//!                                  │ EventRouter  │ ──▶ QueryCache::invalidate
//!                                  └──────────────┘ ──▶ Notifier::notify
//! ```
//!
//! UI code never talks to the socket. It reads the [`ConnectionStore`](crate::ConnectionStore)
//! and the query cache, which the router keeps fresh.

pub mod backoff;
pub mod connection;
mod manager;
pub mod router;

pub use backoff::{
    delay_for_attempt, ReconnectConfig, RetryDecision, RetryTimer, INITIAL_DELAY, MAX_DELAY,
    MAX_RECONNECT_ATTEMPTS,
};
pub use connection::{
    CloseKind, Connector, OpenRequest, TransportEvent, TransportHandle, TransportSink, WsConnector,
};
pub use manager::{exhausted_message, ConnectionManager, ManagerHandle};
pub use router::{effects_for, Effect, EventRouter, RouteOutcome};
