//! Transport abstraction for the event stream.
//!
//! A [`Connector`] opens one socket per call and reports its lifecycle as
//! [`TransportEvent`]s through a [`TransportSink`]. It never reconnects on its
//! own; retrying is the connection manager's job.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

/// Why a socket closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseKind {
    /// Normal close from either side; nothing to recover from.
    Intentional,
    /// Network drop, protocol error or unexpected close code.
    Abnormal(String),
}

/// Lifecycle and data events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Opened,
    /// The socket never opened.
    OpenFailed(String),
    /// A text frame, in the order the socket received it.
    Message(String),
    /// An open socket closed.
    Closed(CloseKind),
}

/// Parameters for opening a socket.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    /// Endpoint including the auth token query parameter.
    pub url: Url,
    pub connect_timeout: Duration,
}

/// Where a transport reports its events.
///
/// Each sink is bound to exactly one transport. Events sent after the
/// manager has moved on to a newer transport are discarded.
#[derive(Clone)]
pub struct TransportSink {
    emit: Arc<dyn Fn(TransportEvent) -> bool + Send + Sync>,
}

impl TransportSink {
    pub fn from_fn<F>(emit: F) -> Self
    where
        F: Fn(TransportEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            emit: Arc::new(emit),
        }
    }

    /// Report an event. Returns `false` once nobody is listening any more.
    pub fn emit(&self, event: TransportEvent) -> bool {
        (self.emit)(event)
    }
}

impl fmt::Debug for TransportSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSink").finish_non_exhaustive()
    }
}

/// Opens sockets to the event stream.
pub trait Connector: Send + Sync + 'static {
    /// Start opening a socket. Runs inside the tokio runtime and must not block;
    /// progress is reported through `sink`.
    fn open(&self, request: OpenRequest, sink: TransportSink) -> Box<dyn TransportHandle>;
}

/// Owning handle to one socket.
pub trait TransportHandle: Send {
    /// Close the socket. No further events are expected to matter after this.
    fn close(self: Box<Self>);
}

mod connection_native;

pub use connection_native::WsConnector;
