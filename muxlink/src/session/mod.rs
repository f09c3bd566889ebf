//! Multiplexed session abstraction.
//!
//! A [`Session`] carries many independent byte streams over one raw
//! connection. The failover client only needs to open streams, the server
//! only needs to accept them; both close the session when they are done.
//!
//! Production sessions are backed by yamux ([`YamuxSession`]). Tests
//! implement the traits directly to script failures and count closes.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::endpoint::Endpoint;

/// Session configuration.
pub mod config;

/// yamux-backed sessions and connector.
pub mod yamux;

pub use config::SessionConfig;
pub use yamux::{YamuxConnector, YamuxSession};

/// One multiplexed connection to a single peer.
#[async_trait]
pub trait Session: Send + 'static {
    /// Stream type produced by this session.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a new outbound stream.
    async fn open_stream(&mut self) -> io::Result<Self::Stream>;

    /// Wait for the next inbound stream.
    ///
    /// `Some(Err(_))` reports a failed accept that the caller may log and
    /// retry. `None` means the session is gone and no stream will ever
    /// arrive again.
    async fn accept_stream(&mut self) -> Option<io::Result<Self::Stream>>;

    /// Close the session and release the underlying connection.
    async fn close(&mut self);
}

/// Opens client-role sessions to endpoints.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Session type produced by this connector.
    type Session: Session;

    /// Connect to `endpoint` and establish a client-role session over it.
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<Self::Session>;
}
