//! Connection state store.
//!
//! Holds the status of the real-time connection for anything that wants to
//! display it. The connection manager is the only writer; readers either
//! take a [`ConnectionStore::snapshot`], register a listener with
//! [`ConnectionStore::subscribe`], or await changes through
//! [`ConnectionStore::watch`].

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

/// Status of the event-stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a status indicator needs to know about the connection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Last transport-level error, cleared when a connection attempt starts or succeeds.
    pub error: Option<String>,
    /// Consecutive failed attempts since the last successful connection.
    pub reconnect_attempts: u32,
    /// When the last recognized server event arrived.
    pub last_event_at: Option<DateTime<Utc>>,
}

type Listener = Arc<dyn Fn(&ConnectionState) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

struct StoreInner {
    state: watch::Sender<ConnectionState>,
    listeners: Mutex<Listeners>,
}

/// Shared handle to the connection state. Cloning is cheap.
#[derive(Clone)]
pub struct ConnectionStore {
    inner: Arc<StoreInner>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            inner: Arc::new(StoreInner {
                state,
                listeners: Mutex::new(Listeners::default()),
            }),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.borrow().status
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.borrow().reconnect_attempts
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.borrow().last_event_at
    }

    pub fn snapshot(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Call `listener` with the new state after every change.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called. It runs on whatever
    /// task performed the write and must not block.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        let mut listeners = self.inner.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));

        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        self.update(|state| state.status = status);
    }

    /// Returns the new attempt count.
    pub(crate) fn increment_reconnect_attempts(&self) -> u32 {
        let mut attempts = 0;
        self.update(|state| {
            state.reconnect_attempts = state.reconnect_attempts.saturating_add(1);
            attempts = state.reconnect_attempts;
        });
        attempts
    }

    pub(crate) fn reset_reconnect_attempts(&self) {
        self.update(|state| state.reconnect_attempts = 0);
    }

    pub(crate) fn set_last_event_at(&self, at: DateTime<Utc>) {
        self.update(|state| state.last_event_at = Some(at));
    }

    /// Apply several field changes as one observable transition.
    ///
    /// Listeners are notified once, and only if something changed.
    pub(crate) fn update(&self, apply: impl FnOnce(&mut ConnectionState)) {
        let changed = self.inner.state.send_if_modified(|state| {
            let before = state.clone();
            apply(state);
            *state != before
        });
        if !changed {
            return;
        }

        let snapshot = self.snapshot();
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl Default for ConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStore")
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

/// Registration returned by [`ConnectionStore::subscribe`].
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.listeners.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}
