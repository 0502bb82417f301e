//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use casepulse_client::ws::{Connector, OpenRequest, TransportEvent, TransportHandle, TransportSink};
use casepulse_client::{
    CacheKey, ConnectionState, ConnectionStatus, ConnectionStore, Notification, Notifier,
    QueryCache,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// One socket opened by [`ScriptedConnector`].
pub struct OpenedSocket {
    pub request: OpenRequest,
    pub sink: TransportSink,
    pub closed: Arc<AtomicBool>,
    pub at: Instant,
}

impl OpenedSocket {
    pub fn emit(&self, event: TransportEvent) {
        self.sink.emit(event);
    }

    pub fn token(&self) -> Option<String> {
        self.request
            .url
            .query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Connector whose sockets are driven by the test.
pub struct ScriptedConnector {
    opened: mpsc::UnboundedSender<OpenedSocket>,
}

impl ScriptedConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OpenedSocket>) {
        let (opened, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { opened }), rx)
    }
}

struct ScriptedHandle {
    closed: Arc<AtomicBool>,
}

impl TransportHandle for ScriptedHandle {
    fn close(self: Box<Self>) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, request: OpenRequest, sink: TransportSink) -> Box<dyn TransportHandle> {
        let closed = Arc::new(AtomicBool::new(false));
        let _ = self.opened.send(OpenedSocket {
            request,
            sink,
            closed: closed.clone(),
            at: Instant::now(),
        });
        Box::new(ScriptedHandle { closed })
    }
}

#[derive(Default)]
pub struct RecordingCache {
    pub invalidated: Mutex<Vec<CacheKey>>,
}

impl QueryCache for RecordingCache {
    fn invalidate(&self, key: &CacheKey) {
        self.invalidated.lock().push(key.clone());
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.shown.lock().push(notification);
    }
}

/// Generous bound; with the paused clock it only matters if a test is stuck.
const WAIT: Duration = Duration::from_secs(600);

pub async fn next_open(rx: &mut mpsc::UnboundedReceiver<OpenedSocket>) -> OpenedSocket {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a socket to open")
        .expect("connector dropped")
}

pub async fn wait_for(
    store: &ConnectionStore,
    predicate: impl FnMut(&ConnectionState) -> bool,
) -> ConnectionState {
    let mut rx = store.watch();
    let state = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for connection state")
        .expect("store dropped")
        .clone();
    state
}

pub async fn wait_status(store: &ConnectionStore, status: ConnectionStatus) -> ConnectionState {
    wait_for(store, |s| s.status == status).await
}

/// Let queued messages be processed without moving the clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Assert nothing opens within `window` of (paused) time.
pub async fn assert_no_open(rx: &mut mpsc::UnboundedReceiver<OpenedSocket>, window: Duration) {
    tokio::time::sleep(window).await;
    settle().await;
    assert!(rx.try_recv().is_err(), "unexpected socket opened");
}
