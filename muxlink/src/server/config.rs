//! Configuration for the probe server.

use std::time::Duration;

use crate::session::SessionConfig;

/// Default listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7078";

/// Configuration for the accept loop and its handlers.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind the listener to
    pub listen_addr: String,

    /// Maximum number of connections served at once.
    ///
    /// At capacity the accept loop stops accepting until a connection ends.
    pub max_connections: usize,

    /// Maximum number of stream handlers running at once per session
    pub max_streams_per_session: usize,

    /// Pause after a transient accept error before accepting again
    pub accept_retry_delay: Duration,

    /// Configuration for each accepted session
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            max_connections: 1024,
            max_streams_per_session: 256,
            accept_retry_delay: Duration::from_millis(100),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a configuration listening on `addr` with default limits.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            listen_addr: addr.into(),
            ..Self::default()
        }
    }

    /// Cap the number of concurrently served connections (at least 1).
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Cap the number of concurrent stream handlers per session (at least 1).
    pub fn with_max_streams_per_session(mut self, max: usize) -> Self {
        self.max_streams_per_session = max.max(1);
        self
    }

    /// Set the pause after a transient accept error.
    pub fn with_accept_retry_delay(mut self, delay: Duration) -> Self {
        self.accept_retry_delay = delay;
        self
    }

    /// Set the per-session configuration.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}
