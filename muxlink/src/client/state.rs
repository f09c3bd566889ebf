//! Observable client state and metrics.

use std::fmt;
use std::time::Duration;

use crate::endpoint::Endpoint;

/// Where the failover loop currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Opening a session to the endpoint.
    Connecting(Endpoint),
    /// A session is open and idle between probes.
    Connected(Endpoint),
    /// A probe is in flight on the session.
    Probing(Endpoint),
    /// The last probe failed; the session is being replaced.
    Failed(Endpoint),
    /// The loop was cancelled and the session closed.
    Closed,
}

impl LinkState {
    /// The endpoint this state refers to, if any.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            LinkState::Connecting(ep)
            | LinkState::Connected(ep)
            | LinkState::Probing(ep)
            | LinkState::Failed(ep) => Some(ep),
            LinkState::Closed => None,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Connecting(ep) => write!(f, "CONNECTING({ep})"),
            LinkState::Connected(ep) => write!(f, "CONNECTED({ep})"),
            LinkState::Probing(ep) => write!(f, "PROBING({ep})"),
            LinkState::Failed(ep) => write!(f, "FAILED({ep})"),
            LinkState::Closed => f.write_str("CLOSED"),
        }
    }
}

/// Counters for one failover client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMetrics {
    /// Total number of session attempts made
    pub connection_attempts: u64,

    /// Total number of sessions established
    pub connections_established: u64,

    /// Total number of probes started
    pub probes_sent: u64,

    /// Total number of probes answered with a pong
    pub probes_succeeded: u64,

    /// Total number of failed probes
    pub probes_failed: u64,

    /// Number of times the candidate ring was rotated
    pub failovers: u64,

    /// Round-trip time of the most recent successful probe
    pub last_probe_rtt: Option<Duration>,
}

impl LinkMetrics {
    /// Record a session attempt.
    pub fn record_connection_attempt(&mut self) {
        self.connection_attempts += 1;
    }

    /// Record an established session.
    pub fn record_connection_established(&mut self) {
        self.connections_established += 1;
    }

    /// Record a probe being started.
    pub fn record_probe_sent(&mut self) {
        self.probes_sent += 1;
    }

    /// Record a successful probe and its round-trip time.
    pub fn record_probe_success(&mut self, rtt: Duration) {
        self.probes_succeeded += 1;
        self.last_probe_rtt = Some(rtt);
    }

    /// Record a failed probe.
    pub fn record_probe_failure(&mut self) {
        self.probes_failed += 1;
    }

    /// Record a rotation to the next candidate.
    pub fn record_failover(&mut self) {
        self.failovers += 1;
    }
}

/// Snapshot published to subscribers on every transition.
#[derive(Debug, Clone)]
pub struct LinkStatus {
    /// Current state of the loop
    pub state: LinkState,
    /// Counters so far
    pub metrics: LinkMetrics,
}

impl LinkStatus {
    pub(crate) fn new(state: LinkState) -> Self {
        Self {
            state,
            metrics: LinkMetrics::default(),
        }
    }
}
