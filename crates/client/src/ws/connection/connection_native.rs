//! WebSocket transport using tokio-tungstenite.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};

use super::{CloseKind, Connector, OpenRequest, TransportEvent, TransportHandle, TransportSink};
use crate::error::TransportError;

/// Opens a plain or TLS WebSocket per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, request: OpenRequest, sink: TransportSink) -> Box<dyn TransportHandle> {
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(run_socket(request, sink, close_rx));
        Box::new(WsTransport {
            close_tx: Some(close_tx),
        })
    }
}

/// Dropping the handle closes the socket as well.
struct WsTransport {
    close_tx: Option<oneshot::Sender<()>>,
}

impl TransportHandle for WsTransport {
    fn close(mut self: Box<Self>) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn run_socket(
    request: OpenRequest,
    sink: TransportSink,
    mut close_rx: oneshot::Receiver<()>,
) {
    let host = request.url.host_str().unwrap_or_default().to_string();
    let handshake =
        tokio::time::timeout(request.connect_timeout, connect_async(request.url.as_str()));

    let ws_stream = tokio::select! {
        _ = &mut close_rx => {
            tracing::debug!(%host, "socket closed before the handshake finished");
            return;
        }
        result = handshake => match result {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                sink.emit(TransportEvent::OpenFailed(TransportError::Handshake(e).to_string()));
                return;
            }
            Err(_) => {
                let err = TransportError::Timeout(request.connect_timeout);
                sink.emit(TransportEvent::OpenFailed(err.to_string()));
                return;
            }
        },
    };

    tracing::debug!(%host, "socket open");
    sink.emit(TransportEvent::Opened);

    let (mut write, mut read) = ws_stream.split();

    let kind = loop {
        tokio::select! {
            _ = &mut close_rx => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: Utf8Bytes::from_static("client closing"),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    tracing::debug!(%host, error = %e, "close frame not delivered");
                }
                return;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(%host, frame = text.as_str(), "frame received");
                    if !sink.emit(TransportEvent::Message(text.as_str().to_owned())) {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => break close_kind(frame),
                // Pong replies are queued by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => break CloseKind::Abnormal(e.to_string()),
                None => break CloseKind::Abnormal("connection lost".to_string()),
            }
        }
    };

    tracing::debug!(%host, ?kind, "socket closed by peer");
    sink.emit(TransportEvent::Closed(kind));
}

/// Only a normal (1000) close frame counts as a deliberate server close.
fn close_kind(frame: Option<CloseFrame>) -> CloseKind {
    match frame {
        Some(frame) if frame.code == CloseCode::Normal => CloseKind::Intentional,
        Some(frame) if frame.reason.is_empty() => {
            CloseKind::Abnormal(format!("closed with code {}", u16::from(frame.code)))
        }
        Some(frame) => CloseKind::Abnormal(format!(
            "closed with code {}: {}",
            u16::from(frame.code),
            frame.reason.as_str()
        )),
        None => CloseKind::Abnormal("closed without status".to_string()),
    }
}
