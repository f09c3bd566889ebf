//! Probe exchange.
//!
//! Every probe uses a fresh stream. The initiator writes exactly
//! [`PING`], the responder reads 4 bytes and writes exactly [`PONG`], the
//! initiator reads 4 bytes. There is no framing beyond the stream itself.

use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::session::Session;

/// Size of both probe payloads.
pub const PROBE_LEN: usize = 4;

/// Probe request payload.
pub const PING: [u8; PROBE_LEN] = *b"ping";

/// Probe response payload.
pub const PONG: [u8; PROBE_LEN] = *b"pong";

/// Ways a single probe exchange can fail.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The session refused to open a stream.
    #[error("failed to open stream: {0}")]
    Open(#[source] io::Error),

    /// Writing the payload failed.
    #[error("failed to write: {0}")]
    Write(#[source] io::Error),

    /// The transport accepted fewer bytes than the payload size.
    #[error("short write {0} bytes")]
    ShortWrite(usize),

    /// Reading the payload failed, including a peer that closed early.
    #[error("read error: {0}")]
    Read(#[source] io::Error),

    /// The peer answered with something other than [`PONG`].
    #[error("unexpected response {0:?}")]
    UnexpectedResponse([u8; PROBE_LEN]),

    /// No answer within the configured probe timeout.
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Run one probe over a fresh stream opened on `session`.
///
/// The stream is shut down whether the exchange succeeds or not.
pub async fn send_probe<S: Session>(session: &mut S) -> Result<(), ProbeError> {
    let mut stream = session.open_stream().await.map_err(ProbeError::Open)?;
    let result = probe_stream(&mut stream).await;
    if let Err(e) = stream.shutdown().await {
        tracing::debug!("probe stream shutdown failed: {}", e);
    }
    result
}

/// Initiator side of the exchange on an already-open stream.
pub async fn probe_stream<S>(stream: &mut S) -> Result<(), ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let wrote = stream.write(&PING).await.map_err(ProbeError::Write)?;
    if wrote < PROBE_LEN {
        return Err(ProbeError::ShortWrite(wrote));
    }
    stream.flush().await.map_err(ProbeError::Write)?;
    tracing::debug!("wrote ping...");

    let mut response = [0u8; PROBE_LEN];
    stream
        .read_exact(&mut response)
        .await
        .map_err(ProbeError::Read)?;
    if response != PONG {
        return Err(ProbeError::UnexpectedResponse(response));
    }

    tracing::debug!("got pong!");
    Ok(())
}

/// Responder side: read any 4-byte request and answer with [`PONG`].
pub async fn answer_probe<S>(stream: &mut S) -> Result<(), ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = [0u8; PROBE_LEN];
    stream
        .read_exact(&mut request)
        .await
        .map_err(ProbeError::Read)?;

    stream.write_all(&PONG).await.map_err(ProbeError::Write)?;
    stream.flush().await.map_err(ProbeError::Write)?;
    Ok(())
}
