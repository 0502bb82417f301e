//! casepulse-watch - follow the live update stream from the command line.
//!
//! Reads its configuration from `CASEPULSE_WS_*` variables and the token from
//! `CASEPULSE_TOKEN`, then logs every invalidation, notification and status
//! change until interrupted.

use std::sync::Arc;

use anyhow::Context;
use casepulse_client::{
    logging, AuthSession, CacheKey, NotificationFeed, QueryCache, RealtimeClient, RealtimeConfig,
};

const ENV_TOKEN: &str = "CASEPULSE_TOKEN";

struct LoggingCache;

impl QueryCache for LoggingCache {
    fn invalidate(&self, key: &CacheKey) {
        tracing::info!(%key, "invalidate");
    }

    fn set_cached_value(&self, key: &CacheKey, value: serde_json::Value) {
        tracing::info!(%key, %value, "seed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = RealtimeConfig::from_env().context("reading real-time configuration")?;
    let session = AuthSession::new();
    match std::env::var(ENV_TOKEN) {
        Ok(token) => session.login(token),
        Err(_) => tracing::warn!("{ENV_TOKEN} is not set, waiting without a session"),
    }

    let (feed, mut notifications) = NotificationFeed::channel();
    let client = RealtimeClient::start(
        config,
        session.watch(),
        Arc::new(LoggingCache),
        Arc::new(feed),
    );

    let _status = client.store().subscribe(|state| {
        tracing::info!(
            status = %state.status,
            attempts = state.reconnect_attempts,
            error = state.error.as_deref(),
            "connection status"
        );
    });

    loop {
        tokio::select! {
            Some(notification) = notifications.recv() => {
                tracing::info!(
                    title = %notification.title,
                    message = %notification.message,
                    "notification"
                );
            }
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl-C")?;
                break;
            }
        }
    }

    tracing::info!("shutting down");
    client.shutdown().await;
    Ok(())
}
