//! Client error types.
//!
//! None of these reach UI code: transport failures are folded into
//! [`crate::ConnectionState::error`] by the connection manager.

use std::time::Duration;

use thiserror::Error;

/// Invalid real-time configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported endpoint scheme `{0}` (expected ws, wss, http or https)")]
    UnsupportedScheme(String),
    #[error("{var} must be a non-negative integer, got `{value}`")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Failure to open the event-stream socket.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
}
