//! The failover loop.
//!
//! ```text
//!             connect ok
//! CONNECTING ───────────► CONNECTED ◄──────────┐
//!     ▲                       │ tick           │ pong
//!     │                       ▼                │
//!     │ rotate             PROBING ────────────┘
//!     │                       │ any failure
//!     └──────── FAILED ◄──────┘
//! ```
//!
//! Connection attempts are never retried: a failed first connect, or a
//! failed connect right after a rotation, ends the loop with an error.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::config::ClientConfig;
use super::state::{LinkState, LinkStatus};
use crate::endpoint::{CandidateRing, Endpoint};
use crate::error::{LinkError, LinkResult};
use crate::probe::{ProbeError, send_probe};
use crate::session::{Connector, Session};

/// The single session the loop currently owns.
struct ActiveLink<S> {
    endpoint: Endpoint,
    session: S,
}

/// Keeps one probed session open to one of several candidate endpoints.
///
/// The client exclusively owns its [`CandidateRing`] and at most one live
/// session; nothing else ever mutates either.
pub struct FailoverClient<C: Connector> {
    connector: C,
    candidates: CandidateRing,
    config: ClientConfig,
    status: watch::Sender<LinkStatus>,
}

impl<C: Connector> FailoverClient<C> {
    /// Create a client that will start with the head of `candidates`.
    pub fn new(connector: C, candidates: CandidateRing, config: ClientConfig) -> Self {
        let initial = LinkStatus::new(LinkState::Connecting(candidates.head().clone()));
        let (status, _) = watch::channel(initial);
        Self {
            connector,
            candidates,
            config,
            status,
        }
    }

    /// Subscribe to state transitions and metrics.
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.subscribe()
    }

    /// Latest published status.
    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    /// The candidate ring in its current rotation.
    pub fn candidates(&self) -> &CandidateRing {
        &self.candidates
    }

    /// Run the loop until `cancel` fires or a connection attempt fails.
    ///
    /// Cancellation is observed between probes; a probe already in flight
    /// completes or fails first. The session is closed on every exit path.
    pub async fn run(&mut self, cancel: CancellationToken) -> LinkResult<()> {
        let mut link = self.connect().await?;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.probe_interval) => {}
            }

            self.transition(LinkState::Probing(link.endpoint.clone()));
            match self.probe(&mut link.session).await {
                Ok(rtt) => {
                    tracing::debug!("probe to {} ok in {:?}", link.endpoint, rtt);
                    self.status
                        .send_modify(|s| s.metrics.record_probe_success(rtt));
                    self.transition(LinkState::Connected(link.endpoint.clone()));
                }
                Err(e) => {
                    tracing::warn!(
                        "send error: {}, reconnecting to next server (was {})",
                        e,
                        link.endpoint
                    );
                    self.status.send_modify(|s| s.metrics.record_probe_failure());
                    self.transition(LinkState::Failed(link.endpoint.clone()));

                    link.session.close().await;
                    let next = self.candidates.rotate().clone();
                    self.status.send_modify(|s| s.metrics.record_failover());
                    tracing::info!("rotated candidates, next endpoint {}", next);

                    link = self.connect().await?;
                }
            }
        }

        link.session.close().await;
        self.transition(LinkState::Closed);
        tracing::info!("client stopped, session to {} closed", link.endpoint);
        Ok(())
    }

    /// Open a session to the current head of the ring.
    async fn connect(&mut self) -> LinkResult<ActiveLink<C::Session>> {
        let endpoint = self.candidates.head().clone();
        self.transition(LinkState::Connecting(endpoint.clone()));
        self.status
            .send_modify(|s| s.metrics.record_connection_attempt());

        match self.connector.connect(&endpoint).await {
            Ok(session) => {
                tracing::info!("connected to {}", endpoint);
                self.status
                    .send_modify(|s| s.metrics.record_connection_established());
                self.transition(LinkState::Connected(endpoint.clone()));
                Ok(ActiveLink { endpoint, session })
            }
            Err(source) => Err(LinkError::Connect { endpoint, source }),
        }
    }

    /// One probe, bounded by the configured timeout if any.
    async fn probe(&mut self, session: &mut C::Session) -> Result<Duration, ProbeError> {
        self.status.send_modify(|s| s.metrics.record_probe_sent());
        let started = Instant::now();

        match self.config.probe_timeout {
            Some(limit) => tokio::time::timeout(limit, send_probe(session))
                .await
                .map_err(|_| ProbeError::Timeout(limit))??,
            None => send_probe(session).await?,
        }

        Ok(started.elapsed())
    }

    fn transition(&self, state: LinkState) {
        tracing::debug!("link state -> {}", state);
        self.status.send_modify(|s| s.state = state);
    }
}

impl<C: Connector> std::fmt::Debug for FailoverClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverClient")
            .field("candidates", &self.candidates)
            .field("config", &self.config)
            .field("state", &self.status.borrow().state)
            .finish()
    }
}
