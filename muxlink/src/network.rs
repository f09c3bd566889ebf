//! Raw byte-stream transport underneath the yamux sessions.
//!
//! [`Server`](crate::Server) listens through [`NetworkProvider::bind`] and
//! [`YamuxConnector`](crate::YamuxConnector) dials through
//! [`NetworkProvider::connect`]. Tests plug in in-memory duplex pipes with
//! scripted accept failures; production uses [`TokioNetworkProvider`].

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

/// Dials and listens for the raw connections sessions run over.
///
/// Clones share nothing mutable; the server and every connector may each
/// hold their own.
#[async_trait]
pub trait NetworkProvider: Clone + Send + Sync + 'static {
    /// Connection type handed to a yamux session.
    type TcpStream: AsyncRead + AsyncWrite + Unpin + Send + 'static;
    /// Listener returned by [`bind`](NetworkProvider::bind).
    type TcpListener: TcpListenerTrait<TcpStream = Self::TcpStream> + 'static;

    /// Start listening on `addr` (`host:port`, port 0 picks a free one).
    async fn bind(&self, addr: &str) -> io::Result<Self::TcpListener>;

    /// Open a connection to a candidate endpoint.
    async fn connect(&self, addr: &str) -> io::Result<Self::TcpStream>;
}

/// Source of inbound connections for the accept loop.
#[async_trait]
pub trait TcpListenerTrait: Send + Sync {
    /// Connection type yielded by `accept`.
    type TcpStream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next connection and return it with the peer address.
    ///
    /// Errors are classified by the accept loop; see
    /// [`is_transient_accept_error`](crate::server::is_transient_accept_error).
    async fn accept(&self) -> io::Result<(Self::TcpStream, String)>;

    /// Address actually bound, which differs from the request for port 0.
    fn local_addr(&self) -> io::Result<String>;
}

/// Loopback and LAN TCP through Tokio.
#[derive(Debug, Clone, Default)]
pub struct TokioNetworkProvider;

impl TokioNetworkProvider {
    /// Shorthand for the unit value.
    pub fn new() -> Self {
        Self
    }
}

/// Probes are single 4-byte writes; Nagle would hold each one back until
/// the previous pong is acknowledged.
fn disable_nagle(stream: &TcpStream, peer: &dyn std::fmt::Display) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("set_nodelay failed for {}: {}", peer, e);
    }
}

#[async_trait]
impl NetworkProvider for TokioNetworkProvider {
    type TcpStream = TcpStream;
    type TcpListener = TokioTcpListener;

    async fn bind(&self, addr: &str) -> io::Result<TokioTcpListener> {
        Ok(TokioTcpListener(TcpListener::bind(addr).await?))
    }

    async fn connect(&self, addr: &str) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(addr).await?;
        disable_nagle(&stream, &addr);
        Ok(stream)
    }
}

/// Bound Tokio TCP listener used by [`Server`](crate::Server).
#[derive(Debug)]
pub struct TokioTcpListener(TcpListener);

#[async_trait]
impl TcpListenerTrait for TokioTcpListener {
    type TcpStream = TcpStream;

    async fn accept(&self) -> io::Result<(TcpStream, String)> {
        let (stream, peer) = self.0.accept().await?;
        disable_nagle(&stream, &peer);
        Ok((stream, peer.to_string()))
    }

    fn local_addr(&self) -> io::Result<String> {
        self.0.local_addr().map(|addr| addr.to_string())
    }
}
