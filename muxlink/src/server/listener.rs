//! Accept loop.

use std::io;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::config::ServerConfig;
use super::session::serve_session;
use crate::error::{LinkError, LinkResult};
use crate::network::{NetworkProvider, TcpListenerTrait};
use crate::session::YamuxSession;

/// "Too many open files" for the process (POSIX `EMFILE`).
const EMFILE: i32 = 24;
/// "Too many open files" for the system (POSIX `ENFILE`).
const ENFILE: i32 = 23;

/// Unique identifier for each accepted connection
pub type ConnectionId = u64;

/// A bound probe server.
///
/// Every accepted connection runs a server-role session in its own task;
/// every stream on that session is answered in its own task.
pub struct Server<N: NetworkProvider> {
    listener: N::TcpListener,
    local_addr: String,
    config: ServerConfig,
}

impl<N: NetworkProvider> Server<N> {
    /// Bind the listener. Failure is fatal and not retried.
    pub async fn bind(network: &N, config: ServerConfig) -> LinkResult<Self> {
        let listener = network
            .bind(&config.listen_addr)
            .await
            .map_err(|source| LinkError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| LinkError::LocalAddr {
                addr: config.listen_addr.clone(),
                source,
            })?;

        tracing::info!("listening for incoming connections on {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    /// Accept connections until `cancel` fires or accept fails fatally.
    ///
    /// A pending accept is abandoned as soon as `cancel` fires and the
    /// listener is dropped on return. Session handlers receive a child
    /// token, so they stop accepting streams and close their sessions too.
    pub async fn run(self, cancel: CancellationToken) -> LinkResult<()> {
        let connection_slots = Arc::new(Semaphore::new(self.config.max_connections.max(1)));
        let mut next_connection_id: ConnectionId = 0;

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = connection_slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((conn, peer)) => {
                    let connection_id = next_connection_id;
                    next_connection_id += 1;
                    tracing::info!("accepted connection {} from {}", connection_id, peer);

                    let session = YamuxSession::server(conn, peer.clone(), &self.config.session);
                    let max_streams = self.config.max_streams_per_session;
                    let session_cancel = cancel.child_token();
                    let span = tracing::info_span!("connection", id = connection_id, peer = %peer);

                    tokio::spawn(
                        async move {
                            serve_session(session, max_streams, session_cancel).await;
                            drop(permit);
                            tracing::info!("connection closed");
                        }
                        .instrument(span),
                    );
                }
                Err(e) if is_transient_accept_error(&e) => {
                    drop(permit);
                    tracing::warn!(
                        "transient accept error: {}, retrying in {:?}",
                        e,
                        self.config.accept_retry_delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.accept_retry_delay) => {}
                    }
                }
                Err(e) => {
                    tracing::error!("accept error: {}", e);
                    return Err(LinkError::Accept(e));
                }
            }
        }

        tracing::info!("stopped accepting on {}", self.local_addr);
        Ok(())
    }
}

impl<N: NetworkProvider> std::fmt::Debug for Server<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("config", &self.config)
            .finish()
    }
}

/// Whether an accept error is worth retrying.
///
/// Errors tied to one failed handshake, signal interruption, or descriptor
/// exhaustion clear up on their own. Anything else (a closed or invalid
/// listener) will fail again on every call.
pub fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) || matches!(e.raw_os_error(), Some(EMFILE) | Some(ENFILE))
}
