//! Per-session and per-stream handlers.

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::probe::answer_probe;
use crate::session::Session;

/// Accept probe streams on `session` until it ends or `cancel` fires.
///
/// Each accepted stream gets its own task. At most `max_streams` handlers
/// run at once; beyond that the loop waits before accepting the next
/// stream. A failed stream accept is logged and the loop goes on. The
/// session is closed before returning.
pub async fn serve_session<S: Session>(
    mut session: S,
    max_streams: usize,
    cancel: CancellationToken,
) {
    let stream_slots = Arc::new(Semaphore::new(max_streams.max(1)));

    loop {
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = stream_slots.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = session.accept_stream() => next,
        };

        match next {
            Some(Ok(stream)) => {
                tokio::spawn(
                    async move {
                        handle_stream(stream).await;
                        drop(permit);
                    }
                    .in_current_span(),
                );
            }
            Some(Err(e)) => {
                tracing::warn!("accept error: {}", e);
            }
            None => {
                tracing::debug!("session ended by peer");
                break;
            }
        }
    }

    session.close().await;
    tracing::debug!("session handler exited");
}

/// Answer one probe and close the stream.
///
/// Read and write failures are only logged: the stream is abandoned and
/// the session keeps going.
pub async fn handle_stream<T>(mut stream: T)
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match answer_probe(&mut stream).await {
        Ok(()) => tracing::debug!("pong"),
        Err(e) => tracing::warn!("{}", e),
    }

    if let Err(e) = stream.shutdown().await {
        tracing::debug!("stream shutdown failed: {}", e);
    }
}
