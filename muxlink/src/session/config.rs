//! Configuration for multiplexed sessions.

use std::time::Duration;

/// Matches the yamux default backlog.
pub const DEFAULT_ACCEPT_BACKLOG: usize = 256;

/// Configuration for yamux sessions.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Interval between transport-level keep-alive pings.
    pub keepalive_interval: Duration,

    /// How long `close` waits for the session to flush its shutdown
    /// before the connection is torn down forcibly.
    pub close_timeout: Duration,

    /// Inbound streams that may wait for an acceptor. Streams arriving
    /// while the backlog is full are refused.
    pub accept_backlog: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(30),
            close_timeout: Duration::from_secs(1),
            accept_backlog: DEFAULT_ACCEPT_BACKLOG,
        }
    }
}

impl SessionConfig {
    /// Set the keep-alive interval.
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set the close grace period.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Set the inbound backlog. Clamped to at least 1.
    pub fn with_accept_backlog(mut self, backlog: usize) -> Self {
        self.accept_backlog = backlog.max(1);
        self
    }

    /// Map onto the yamux configuration. Keep-alive and backlog are
    /// surfaced; everything else keeps the yamux defaults.
    pub(crate) fn to_yamux(&self) -> tokio_yamux::Config {
        tokio_yamux::Config {
            keepalive_interval: self.keepalive_interval,
            accept_backlog: self.accept_backlog.max(1),
            ..tokio_yamux::Config::default()
        }
    }
}
