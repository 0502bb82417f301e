//! Shared types for the casepulse real-time update channel.
//!
//! The backend pushes [`ServerEnvelope`] frames; clients decode them into
//! [`ServerEvent`]s and translate those into [`CacheKey`] invalidations.

pub mod error;
pub mod models;
pub mod protocol;

pub use error::*;
pub use models::*;
pub use protocol::*;
