//! The client follows the auth session: login connects, logout disconnects,
//! and a new token gets a new socket.

mod common;

use std::sync::Arc;
use std::time::Duration;

use casepulse_client::ws::TransportEvent;
use casepulse_client::{
    AuthSession, ConnectionStatus, RealtimeClient, RealtimeConfig, ReconnectConfig,
};
use common::*;
use tokio::sync::mpsc;

fn start(
    session: &AuthSession,
    config: RealtimeConfig,
) -> (RealtimeClient, mpsc::UnboundedReceiver<OpenedSocket>) {
    let (connector, sockets) = ScriptedConnector::new();
    let client = RealtimeClient::with_connector(
        config,
        session.watch(),
        Arc::new(RecordingCache::default()),
        Arc::new(RecordingNotifier::default()),
        connector,
    );
    (client, sockets)
}

#[tokio::test(start_paused = true)]
async fn stays_idle_until_login() {
    let session = AuthSession::new();
    let (client, mut sockets) = start(&session, RealtimeConfig::default());

    assert_no_open(&mut sockets, Duration::from_secs(5)).await;
    assert_eq!(client.store().status(), ConnectionStatus::Disconnected);
    assert_eq!(client.indicator().label, "Disconnected");
}

#[tokio::test(start_paused = true)]
async fn token_present_at_startup_connects() {
    let session = AuthSession::new();
    session.login("alice");
    let (client, mut sockets) = start(&session, RealtimeConfig::default());

    let socket = next_open(&mut sockets).await;
    assert_eq!(socket.token().as_deref(), Some("alice"));
    socket.emit(TransportEvent::Opened);
    wait_status(client.store(), ConnectionStatus::Connected).await;
    assert_eq!(client.indicator().label, "Connected");
}

#[tokio::test(start_paused = true)]
async fn login_connects_and_logout_disconnects() {
    let session = AuthSession::new();
    let (client, mut sockets) = start(&session, RealtimeConfig::default());

    session.login("alice");
    let socket = next_open(&mut sockets).await;
    socket.emit(TransportEvent::Opened);
    wait_status(client.store(), ConnectionStatus::Connected).await;

    session.logout();
    let state = wait_status(client.store(), ConnectionStatus::Disconnected).await;
    assert_eq!(state.reconnect_attempts, 0);
    assert!(socket.is_closed());
    assert_no_open(&mut sockets, Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn new_token_replaces_the_socket() {
    let session = AuthSession::new();
    session.login("alice");
    let (client, mut sockets) = start(&session, RealtimeConfig::default());

    let first = next_open(&mut sockets).await;
    first.emit(TransportEvent::Opened);
    wait_status(client.store(), ConnectionStatus::Connected).await;

    session.login("bob");
    let second = next_open(&mut sockets).await;
    assert!(first.is_closed());
    assert_eq!(second.token().as_deref(), Some("bob"));

    second.emit(TransportEvent::Opened);
    wait_status(client.store(), ConnectionStatus::Connected).await;
    assert_no_open(&mut sockets, Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn same_token_again_keeps_the_socket() {
    let session = AuthSession::new();
    session.login("alice");
    let (client, mut sockets) = start(&session, RealtimeConfig::default());

    let socket = next_open(&mut sockets).await;
    socket.emit(TransportEvent::Opened);
    wait_status(client.store(), ConnectionStatus::Connected).await;

    session.login("alice");
    assert_no_open(&mut sockets, Duration::from_secs(5)).await;
    assert!(!socket.is_closed());
}

#[tokio::test(start_paused = true)]
async fn new_token_rearms_after_giving_up() {
    let session = AuthSession::new();
    session.login("alice");
    let config = RealtimeConfig::default().reconnect(ReconnectConfig::new().max_attempts(1));
    let (client, mut sockets) = start(&session, config);

    next_open(&mut sockets)
        .await
        .emit(TransportEvent::OpenFailed("refused".into()));
    wait_for(client.store(), |s| {
        s.status == ConnectionStatus::Error && s.reconnect_attempts == 1
    })
    .await;
    assert_eq!(client.indicator().label, "Connection error");

    session.login("bob");
    let socket = next_open(&mut sockets).await;
    assert_eq!(socket.token().as_deref(), Some("bob"));
    assert_eq!(client.store().reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn retry_now_on_the_client() {
    let session = AuthSession::new();
    session.login("alice");
    let config = RealtimeConfig::default().reconnect(ReconnectConfig::new().max_attempts(1));
    let (client, mut sockets) = start(&session, config);

    next_open(&mut sockets)
        .await
        .emit(TransportEvent::OpenFailed("refused".into()));
    wait_status(client.store(), ConnectionStatus::Error).await;
    assert_no_open(&mut sockets, Duration::from_secs(60)).await;

    client.retry_now();
    let socket = next_open(&mut sockets).await;
    socket.emit(TransportEvent::Opened);
    wait_status(client.store(), ConnectionStatus::Connected).await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_socket() {
    let session = AuthSession::new();
    session.login("alice");
    let (client, mut sockets) = start(&session, RealtimeConfig::default());

    let socket = next_open(&mut sockets).await;
    socket.emit(TransportEvent::Opened);
    wait_status(client.store(), ConnectionStatus::Connected).await;
    let store = client.store().clone();

    client.shutdown().await;
    assert!(socket.is_closed());
    assert_eq!(store.status(), ConnectionStatus::Disconnected);

    // The session outlives the client; later logins go nowhere.
    session.login("bob");
    assert_no_open(&mut sockets, Duration::from_secs(5)).await;
}
