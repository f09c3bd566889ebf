//! Configuration for the failover client.

use std::time::Duration;

/// Configuration for the probe loop.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Delay between the end of one probe and the start of the next.
    pub probe_interval: Duration,

    /// Upper bound on a single probe exchange.
    ///
    /// `None` waits as long as the transport does; a stalled peer is then
    /// only detected by the session keep-alive.
    pub probe_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(1),
            probe_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Set the probe interval.
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Bound every probe by `timeout`.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Configuration for fast loopback tests.
    pub fn local_network() -> Self {
        Self {
            probe_interval: Duration::from_millis(50),
            probe_timeout: Some(Duration::from_millis(500)),
        }
    }
}
