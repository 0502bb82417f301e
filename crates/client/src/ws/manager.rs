//! Connection manager: the state machine that owns the event-stream socket.
//!
//! A single task owns the transport handle, the retry timer and all writes
//! to the [`ConnectionStore`]. Callers talk to it through [`ManagerHandle`];
//! transports and timers talk to it through an internal channel. Because
//! everything is processed one message at a time on that task, no state
//! change can interleave with another.
//!
//! ```text
//!                connect()                Opened
//! Disconnected ───────────▶ Connecting ──────────▶ Connected
//!                             ▲     │                 │
//!                 retry timer │     │ OpenFailed      │ Closed(Abnormal): back to
//!                             │     ▼                 │ Connecting, retry timer armed
//!                             └── Error               │
//!                                                     │ Closed(Intentional)
//!                                                     ▼
//!                                               Disconnected
//!
//! disconnect() from any state: Disconnected, timer cancelled, attempts reset.
//! ```
//!
//! Transport events carry the generation of the socket that produced them,
//! and timer expiries the sequence number of the timer. Anything from a
//! socket or timer that has since been replaced is ignored.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::backoff::{RetryDecision, RetryTimer};
use super::connection::{
    CloseKind, Connector, OpenRequest, TransportEvent, TransportHandle, TransportSink,
};
use super::router::EventRouter;
use crate::auth_session::AuthTokenSource;
use crate::config::RealtimeConfig;
use crate::stores::{ConnectionStatus, ConnectionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Connect,
    Disconnect,
    RetryNow,
    Shutdown,
}

enum Internal {
    Transport { generation: u64, event: TransportEvent },
    RetryElapsed { seq: u64 },
}

/// Cloneable handle for requesting connection changes.
///
/// Requests are queued and applied in order; a handle outliving its manager
/// silently does nothing.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl ManagerHandle {
    /// Open a connection if none is open, opening or scheduled.
    pub fn connect(&self) {
        self.send(Command::Connect);
    }

    /// Close the connection, cancel any pending retry and reset the attempt counter.
    pub fn disconnect(&self) {
        self.send(Command::Disconnect);
    }

    /// Skip the backoff wait, or start over after the retry budget ran out.
    pub fn retry_now(&self) {
        self.send(Command::RetryNow);
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!(?command, "connection manager is gone");
        }
    }
}

/// Owner of the real-time connection.
///
/// Dropping the manager tears the connection down.
pub struct ConnectionManager {
    handle: ManagerHandle,
    store: ConnectionStore,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Start the manager task. The connection stays closed until [`connect`](Self::connect).
    pub fn spawn(
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        tokens: Arc<dyn AuthTokenSource>,
        router: EventRouter,
        store: ConnectionStore,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            config,
            connector,
            tokens,
            router,
            store: store.clone(),
            internal_tx,
            transport: None,
            generation: 0,
            retry: None,
            retry_seq: 0,
        };
        let task = tokio::spawn(actor.run(commands_rx, internal_rx));

        Self {
            handle: ManagerHandle {
                commands: commands_tx,
            },
            store,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> ManagerHandle {
        self.handle.clone()
    }

    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    pub fn connect(&self) {
        self.handle.connect();
    }

    pub fn disconnect(&self) {
        self.handle.disconnect();
    }

    pub fn retry_now(&self) {
        self.handle.retry_now();
    }

    /// Tear down and wait for the manager task to finish.
    pub async fn shutdown(mut self) {
        self.handle.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "connection manager task failed");
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.handle.send(Command::Shutdown);
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

struct PendingRetry {
    seq: u64,
    _timer: RetryTimer,
}

struct Actor {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    tokens: Arc<dyn AuthTokenSource>,
    router: EventRouter,
    store: ConnectionStore,
    internal_tx: mpsc::UnboundedSender<Internal>,
    transport: Option<Box<dyn TransportHandle>>,
    generation: u64,
    retry: Option<PendingRetry>,
    retry_seq: u64,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Connect) => self.connect(),
                    Some(Command::Disconnect) => self.disconnect(),
                    Some(Command::RetryNow) => self.retry_now(),
                    Some(Command::Shutdown) | None => break,
                },
                Some(message) = internal.recv() => match message {
                    Internal::Transport { generation, event } => {
                        self.on_transport_event(generation, event)
                    }
                    Internal::RetryElapsed { seq } => self.on_retry_elapsed(seq),
                },
            }
        }

        self.disconnect();
        tracing::debug!("connection manager stopped");
    }

    fn connect(&mut self) {
        if self.transport.is_some() {
            tracing::debug!(status = %self.store.status(), "connect ignored, socket already live");
            return;
        }
        if self.retry.is_some() {
            tracing::debug!("connect ignored, reconnect already scheduled");
            return;
        }
        if self.retries_exhausted() {
            self.store.reset_reconnect_attempts();
        }
        self.open();
    }

    fn disconnect(&mut self) {
        self.cancel_retry();
        if let Some(transport) = self.transport.take() {
            tracing::info!("closing real-time connection");
            transport.close();
        }
        self.store.update(|state| {
            state.status = ConnectionStatus::Disconnected;
            state.error = None;
            state.reconnect_attempts = 0;
        });
    }

    fn retry_now(&mut self) {
        if self.transport.is_some() {
            tracing::debug!("manual retry ignored, socket already live");
            return;
        }
        tracing::info!("manual reconnect requested");
        self.cancel_retry();
        self.store.reset_reconnect_attempts();
        self.open();
    }

    fn open(&mut self) {
        let Some(token) = self.tokens.auth_token() else {
            tracing::info!("no auth token, staying disconnected");
            self.store.update(|state| {
                state.status = ConnectionStatus::Disconnected;
                state.error = None;
                state.reconnect_attempts = 0;
            });
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        let tx = self.internal_tx.clone();
        let sink = TransportSink::from_fn(move |event| {
            tx.send(Internal::Transport { generation, event }).is_ok()
        });

        self.store.update(|state| {
            state.status = ConnectionStatus::Connecting;
            state.error = None;
        });
        tracing::info!(
            endpoint = %self.config.endpoint,
            generation,
            attempt = self.store.reconnect_attempts(),
            "opening real-time connection"
        );

        let request = OpenRequest {
            url: self.config.connect_url(&token),
            connect_timeout: self.config.connect_timeout,
        };
        self.transport = Some(self.connector.open(request, sink));
    }

    fn on_transport_event(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.generation || self.transport.is_none() {
            tracing::trace!(generation, current = self.generation, ?event, "stale transport event");
            return;
        }

        match event {
            TransportEvent::Opened => {
                self.cancel_retry();
                self.store.update(|state| {
                    state.status = ConnectionStatus::Connected;
                    state.error = None;
                    state.reconnect_attempts = 0;
                });
                tracing::info!(generation, "real-time connection established");
            }
            TransportEvent::OpenFailed(reason) => {
                self.transport = None;
                tracing::warn!(generation, %reason, "real-time connection failed");
                self.store.update(|state| {
                    state.status = ConnectionStatus::Error;
                    state.error = Some(reason);
                });
                self.schedule_retry();
            }
            TransportEvent::Message(text) => {
                if self.store.status().is_connected() {
                    self.router.route_frame(&text);
                } else {
                    tracing::debug!(generation, "frame before open ignored");
                }
            }
            TransportEvent::Closed(CloseKind::Intentional) => {
                self.transport = None;
                tracing::info!(generation, "real-time connection closed by server");
                self.store.set_status(ConnectionStatus::Disconnected);
            }
            TransportEvent::Closed(CloseKind::Abnormal(reason)) => {
                self.transport = None;
                let was_connected = self.store.status().is_connected();
                tracing::warn!(generation, %reason, "real-time connection dropped");
                self.store.update(|state| {
                    state.status = if was_connected {
                        ConnectionStatus::Connecting
                    } else {
                        ConnectionStatus::Error
                    };
                    state.error = Some(reason);
                });
                self.schedule_retry();
            }
        }
    }

    fn on_retry_elapsed(&mut self, seq: u64) {
        match &self.retry {
            Some(pending) if pending.seq == seq => {
                self.retry = None;
                self.open();
            }
            _ => tracing::trace!(seq, "stale retry timer"),
        }
    }

    fn schedule_retry(&mut self) {
        let attempts = self.store.increment_reconnect_attempts();

        match self.config.reconnect.next_retry(attempts) {
            RetryDecision::Retry { delay } => {
                self.retry_seq += 1;
                let seq = self.retry_seq;
                let tx = self.internal_tx.clone();
                let timer = RetryTimer::start(delay, move || {
                    let _ = tx.send(Internal::RetryElapsed { seq });
                });
                self.retry = Some(PendingRetry { seq, _timer: timer });
                tracing::info!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
            }
            RetryDecision::Exhausted => {
                let message = exhausted_message(attempts);
                tracing::warn!(attempts, "giving up on real-time connection");
                self.store.update(|state| {
                    state.status = ConnectionStatus::Error;
                    state.error = Some(message);
                });
            }
        }
    }

    fn cancel_retry(&mut self) {
        if let Some(pending) = self.retry.take() {
            tracing::debug!(seq = pending.seq, "pending reconnect cancelled");
        }
    }

    fn retries_exhausted(&self) -> bool {
        let max = self.config.reconnect.max_attempts;
        max > 0 && self.store.reconnect_attempts() >= max
    }
}

/// Message shown once automatic reconnection has stopped.
pub fn exhausted_message(attempts: u32) -> String {
    format!(
        "Unable to reach the live update service after {attempts} attempts. \
         Please reload the page to reconnect."
    )
}
