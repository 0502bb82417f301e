//! Ready-wired real-time client.

use std::sync::Arc;

use tokio::sync::watch;

use crate::auth_session::SessionBinding;
use crate::cache::QueryCache;
use crate::components::StatusIndicator;
use crate::config::RealtimeConfig;
use crate::notify::Notifier;
use crate::stores::ConnectionStore;
use crate::ws::{ConnectionManager, Connector, EventRouter, WsConnector};

/// Store, router, connection manager and session binding for one session.
///
/// Construct once at startup inside a tokio runtime. The connection follows
/// the token in `tokens`; consumers read [`RealtimeClient::store`].
pub struct RealtimeClient {
    manager: ConnectionManager,
    binding: SessionBinding,
    max_attempts: u32,
}

impl RealtimeClient {
    /// Start a client that connects over WebSocket.
    pub fn start(
        config: RealtimeConfig,
        tokens: watch::Receiver<Option<String>>,
        cache: Arc<dyn QueryCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_connector(config, tokens, cache, notifier, Arc::new(WsConnector))
    }

    /// Start a client over an arbitrary transport.
    pub fn with_connector(
        config: RealtimeConfig,
        tokens: watch::Receiver<Option<String>>,
        cache: Arc<dyn QueryCache>,
        notifier: Arc<dyn Notifier>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let store = ConnectionStore::new();
        let router = EventRouter::new(cache, notifier, store.clone());
        let max_attempts = config.reconnect.max_attempts;
        let manager = ConnectionManager::spawn(
            config,
            connector,
            Arc::new(tokens.clone()),
            router,
            store,
        );
        let binding = SessionBinding::spawn(tokens, manager.handle());

        Self {
            manager,
            binding,
            max_attempts,
        }
    }

    pub fn store(&self) -> &ConnectionStore {
        self.manager.store()
    }

    /// Indicator for the current state.
    pub fn indicator(&self) -> StatusIndicator {
        StatusIndicator::for_state(&self.store().snapshot(), self.max_attempts)
    }

    /// Reconnect immediately instead of waiting, re-arming retries if they ran out.
    pub fn retry_now(&self) {
        self.manager.retry_now();
    }

    /// Stop following the session and tear the connection down.
    pub async fn shutdown(self) {
        self.binding.stop();
        self.manager.shutdown().await;
    }
}
