//! Server side: accept loop, session handler, stream handler.
//!
//! Fan-out is two levels deep (one task per connection, one per stream)
//! and both levels are bounded by [`ServerConfig`] limits.

/// Server configuration.
pub mod config;

/// The accept loop.
pub mod listener;

/// Session and stream handlers.
pub mod session;

pub use config::{DEFAULT_LISTEN_ADDR, ServerConfig};
pub use listener::{ConnectionId, Server, is_transient_accept_error};
pub use session::{handle_stream, serve_session};
