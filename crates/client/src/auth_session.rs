//! Binding between the auth session and the real-time connection.
//!
//! The real-time client never refreshes or validates tokens. It reads the
//! current token when opening a socket and follows token changes:
//! login connects, logout disconnects, and switching accounts reopens the
//! socket, because a socket's identity is fixed when it opens.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ws::ManagerHandle;

/// Read access to the current auth token.
pub trait AuthTokenSource: Send + Sync + 'static {
    fn auth_token(&self) -> Option<String>;
}

impl AuthTokenSource for watch::Receiver<Option<String>> {
    fn auth_token(&self) -> Option<String> {
        normalize(self.borrow().clone())
    }
}

/// In-process holder of the auth token, for hosts without their own
/// observable session.
#[derive(Debug)]
pub struct AuthSession {
    token: watch::Sender<Option<String>>,
}

impl AuthSession {
    pub fn new() -> Self {
        let (token, _) = watch::channel(None);
        Self { token }
    }

    pub fn login(&self, token: impl Into<String>) {
        self.token.send_replace(Some(token.into()));
    }

    pub fn logout(&self) {
        self.token.send_replace(None);
    }

    pub fn token(&self) -> Option<String> {
        normalize(self.token.borrow().clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Receiver observing token changes.
    pub fn watch(&self) -> watch::Receiver<Option<String>> {
        self.token.subscribe()
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

/// What a token change means for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    /// No token before, token now.
    Connect,
    /// Token removed.
    Disconnect,
    /// A different token replaced the previous one.
    Restart,
}

pub fn session_change(previous: Option<&str>, next: Option<&str>) -> SessionChange {
    match (previous, next) {
        (None, None) => SessionChange::Unchanged,
        (None, Some(_)) => SessionChange::Connect,
        (Some(_), None) => SessionChange::Disconnect,
        (Some(a), Some(b)) if a == b => SessionChange::Unchanged,
        (Some(_), Some(_)) => SessionChange::Restart,
    }
}

/// Task that drives the connection manager from token changes.
///
/// Stops when the token source goes away (treated as a logout) or when the
/// binding is dropped.
pub struct SessionBinding {
    task: JoinHandle<()>,
}

impl SessionBinding {
    pub fn spawn(mut tokens: watch::Receiver<Option<String>>, manager: ManagerHandle) -> Self {
        let task = tokio::spawn(async move {
            let mut current = normalize(tokens.borrow_and_update().clone());
            if current.is_some() {
                tracing::debug!("auth token present at startup");
                manager.connect();
            }

            while tokens.changed().await.is_ok() {
                let next = normalize(tokens.borrow_and_update().clone());
                apply(&manager, session_change(current.as_deref(), next.as_deref()));
                current = next;
            }

            if current.is_some() {
                tracing::debug!("auth session dropped, disconnecting");
                manager.disconnect();
            }
        });

        Self { task }
    }

    pub fn stop(self) {}
}

impl Drop for SessionBinding {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn apply(manager: &ManagerHandle, change: SessionChange) {
    match change {
        SessionChange::Unchanged => {}
        SessionChange::Connect => {
            tracing::info!("logged in, opening real-time connection");
            manager.connect();
        }
        SessionChange::Disconnect => {
            tracing::info!("logged out, closing real-time connection");
            manager.disconnect();
        }
        SessionChange::Restart => {
            tracing::info!("auth token changed, reopening real-time connection");
            manager.disconnect();
            manager.connect();
        }
    }
}

/// Empty tokens count as no token.
fn normalize(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_transitions() {
        assert_eq!(session_change(None, None), SessionChange::Unchanged);
        assert_eq!(session_change(None, Some("a")), SessionChange::Connect);
        assert_eq!(session_change(Some("a"), None), SessionChange::Disconnect);
        assert_eq!(session_change(Some("a"), Some("a")), SessionChange::Unchanged);
        assert_eq!(session_change(Some("a"), Some("b")), SessionChange::Restart);
    }

    #[test]
    fn session_tracks_login_state() {
        let session = AuthSession::new();
        let rx = session.watch();
        assert!(!session.is_authenticated());

        session.login("secret");
        assert_eq!(rx.auth_token().as_deref(), Some("secret"));

        session.login("   ");
        assert!(!session.is_authenticated());
        assert_eq!(rx.auth_token(), None);

        session.logout();
        assert_eq!(session.token(), None);
    }
}
