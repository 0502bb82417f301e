//! Stores for client-side state.

pub mod connection;

pub use connection::{ConnectionState, ConnectionStatus, ConnectionStore, Subscription};
