//! yamux-backed sessions.
//!
//! A yamux session only makes progress while it is polled, so each
//! [`YamuxSession`] owns a driver task that polls the yamux session and
//! forwards inbound streams over a channel. Outbound streams are opened
//! through the yamux control handle.
//!
//! The inbound channel holds at most `accept_backlog` streams. The driver
//! never waits on it: a stream that finds the channel full is dropped,
//! which closes it, and the driver keeps serving the streams already
//! in flight.

use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_yamux::{Control, StreamHandle};

use super::{Connector, Session, SessionConfig};
use crate::endpoint::Endpoint;
use crate::network::NetworkProvider;

type InboundTx = mpsc::Sender<io::Result<StreamHandle>>;
type InboundRx = mpsc::Receiver<io::Result<StreamHandle>>;

/// A multiplexed session over one raw connection.
pub struct YamuxSession {
    control: Control,
    inbound: InboundRx,
    driver: Option<JoinHandle<()>>,
    close_timeout: Duration,
    peer: String,
}

impl YamuxSession {
    /// Establish a client-role session over `conn`.
    ///
    /// Inbound streams opened by the server are refused.
    pub fn client<T>(conn: T, peer: impl Into<String>, config: &SessionConfig) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let session = tokio_yamux::Session::new_client(conn, config.to_yamux());
        Self::start(session, peer.into(), config, false)
    }

    /// Establish a server-role session over an accepted `conn`.
    pub fn server<T>(conn: T, peer: impl Into<String>, config: &SessionConfig) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let session = tokio_yamux::Session::new_server(conn, config.to_yamux());
        Self::start(session, peer.into(), config, true)
    }

    fn start<T>(
        session: tokio_yamux::Session<T>,
        peer: String,
        config: &SessionConfig,
        accept_inbound: bool,
    ) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let control = session.control();
        let (inbound_tx, inbound_rx) = mpsc::channel(config.accept_backlog.max(1));
        let inbound_tx = accept_inbound.then_some(inbound_tx);
        let driver = tokio::spawn(drive_session(session, inbound_tx, peer.clone()));

        Self {
            control,
            inbound: inbound_rx,
            driver: Some(driver),
            close_timeout: config.close_timeout,
            peer,
        }
    }

    /// Address of the remote side of the underlying connection.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl fmt::Debug for YamuxSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YamuxSession")
            .field("peer", &self.peer)
            .field("running", &self.driver.is_some())
            .finish()
    }
}

#[async_trait]
impl Session for YamuxSession {
    type Stream = StreamHandle;

    async fn open_stream(&mut self) -> io::Result<StreamHandle> {
        self.control
            .open_stream()
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, format!("{e:?}")))
    }

    async fn accept_stream(&mut self) -> Option<io::Result<StreamHandle>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        let _ = self.control.close().await;
        if let Some(mut driver) = self.driver.take() {
            if tokio::time::timeout(self.close_timeout, &mut driver)
                .await
                .is_err()
            {
                tracing::debug!("session {}: driver did not stop in time, aborting", self.peer);
                driver.abort();
            }
        }
        tracing::debug!("session {} closed", self.peer);
    }
}

impl Drop for YamuxSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// Poll the yamux session until it ends, forwarding inbound streams.
async fn drive_session<T>(
    session: tokio_yamux::Session<T>,
    inbound: Option<InboundTx>,
    peer: String,
) where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut session = Box::pin(session);

    while let Some(next) = session.next().await {
        match next {
            Ok(stream) => match &inbound {
                Some(tx) => match tx.try_send(Ok(stream)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!("session {}: accept backlog full, refusing stream", peer);
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!("session {}: inbound stream dropped, no acceptor", peer);
                    }
                },
                None => {
                    tracing::debug!("session {}: refusing inbound stream on client session", peer);
                }
            },
            Err(e) => {
                tracing::debug!("session {}: terminated with error: {}", peer, e);
                if let Some(tx) = &inbound {
                    let _ = tx.try_send(Err(e));
                }
                break;
            }
        }
    }

    tracing::debug!("session {}: driver exited", peer);
}

/// Connector that dials endpoints through a [`NetworkProvider`] and runs a
/// client-role yamux session over each connection.
#[derive(Debug, Clone)]
pub struct YamuxConnector<N: NetworkProvider> {
    network: N,
    config: SessionConfig,
}

impl<N: NetworkProvider> YamuxConnector<N> {
    /// Create a connector.
    pub fn new(network: N, config: SessionConfig) -> Self {
        Self { network, config }
    }
}

#[async_trait]
impl<N: NetworkProvider> Connector for YamuxConnector<N> {
    type Session = YamuxSession;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<YamuxSession> {
        let conn = self.network.connect(endpoint.as_str()).await?;
        Ok(YamuxSession::client(conn, endpoint.to_string(), &self.config))
    }
}
