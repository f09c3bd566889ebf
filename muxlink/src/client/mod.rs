//! Client side: candidate rotation and the probe/failover loop.
//!
//! [`FailoverClient`] owns one session at a time. It probes it once per
//! interval and, on the first failed probe, closes it, rotates the
//! [`CandidateRing`](crate::CandidateRing) and connects to the new head.

/// Client configuration.
pub mod config;

/// The failover state machine.
pub mod failover;

/// Observable state and metrics.
pub mod state;

pub use config::ClientConfig;
pub use failover::FailoverClient;
pub use state::{LinkMetrics, LinkState, LinkStatus};
