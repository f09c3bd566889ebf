//! # muxlink
//!
//! Liveness-checked multiplexed connections with client-side failover.
//!
//! A client holds exactly one multiplexed session to one of several
//! candidate servers. Every tick it opens a fresh stream and runs a
//! 4-byte probe exchange (`ping` / `pong`). When a probe fails the session
//! is closed, the candidate ring rotates, and a new session is opened to
//! the next endpoint.
//!
//! The server accepts raw connections, wraps each one in a server-role
//! session, and answers every probe stream concurrently.
//!
//! ```text
//!  client                                   server
//! ┌────────────────┐   yamux session   ┌──────────────────┐
//! │ FailoverClient ├──────────────────►│ accept loop      │
//! │  CandidateRing │  stream: ping     │  └ session task  │
//! │  (rotate on    │◄──────────────────┤     └ stream task│
//! │   failure)     │  stream: pong     │                  │
//! └────────────────┘                   └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`endpoint`]: endpoint addresses and the rotating candidate ring
//! - [`network`]: raw connection providers (real Tokio or scripted)
//! - [`session`]: the multiplexed session abstraction and its yamux backing
//! - [`probe`]: the probe wire exchange
//! - [`client`]: the failover state machine
//! - [`server`]: the accept loop and per-session / per-stream handlers

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Client failover loop.
pub mod client;

/// Endpoint addresses and the candidate ring.
pub mod endpoint;

/// Crate-level error types.
pub mod error;

/// Raw network provider abstraction.
pub mod network;

/// Probe exchange over a single stream.
pub mod probe;

/// Server accept loop and handlers.
pub mod server;

/// Multiplexed session abstraction.
pub mod session;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::{ClientConfig, FailoverClient, LinkMetrics, LinkState, LinkStatus};
pub use endpoint::{CandidateRing, Endpoint};
pub use error::{LinkError, LinkResult};
pub use network::{NetworkProvider, TcpListenerTrait, TokioNetworkProvider, TokioTcpListener};
pub use probe::{PING, PONG, PROBE_LEN, ProbeError, answer_probe, probe_stream, send_probe};
pub use server::{Server, ServerConfig, serve_session};
pub use session::{Connector, Session, SessionConfig, YamuxConnector, YamuxSession};

pub use tokio_util::sync::CancellationToken;
