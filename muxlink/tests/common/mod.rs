//! Scripted sessions, connectors and networks for driving the client and
//! server loops without real sockets.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use muxlink::{Connector, Endpoint, Session, answer_probe};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

/// Parse an endpoint, panicking on bad test input.
pub fn endpoint(addr: &str) -> Endpoint {
    Endpoint::parse(addr).expect("valid test endpoint")
}

// =============================================================================
// Client side: scripted servers behind a connector
// =============================================================================

/// How a scripted server answers probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Answer every probe with a pong.
    Healthy,
    /// The transport only accepts 2 bytes of every write.
    ShortWrite,
    /// Read the probe but never answer.
    Silent,
}

/// Open/close counters for one scripted server.
#[derive(Debug, Default)]
pub struct Counters {
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub streams_opened: AtomicUsize,
    pub streams_closed: AtomicUsize,
}

impl Counters {
    pub fn sessions(&self) -> (usize, usize) {
        (
            self.sessions_opened.load(Ordering::SeqCst),
            self.sessions_closed.load(Ordering::SeqCst),
        )
    }

    pub fn streams(&self) -> (usize, usize) {
        (
            self.streams_opened.load(Ordering::SeqCst),
            self.streams_closed.load(Ordering::SeqCst),
        )
    }

    /// Every session and stream that was opened has been closed.
    pub fn assert_balanced(&self) {
        let (opened, closed) = self.sessions();
        assert_eq!(opened, closed, "sessions opened vs closed");
        let (opened, closed) = self.streams();
        assert_eq!(opened, closed, "streams opened vs closed");
    }
}

/// One scripted server that the mock connector can reach.
#[derive(Debug)]
pub struct MockServer {
    alive: AtomicBool,
    mode: Mutex<Mode>,
    pub counters: Counters,
}

impl MockServer {
    pub fn new(alive: bool, mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(alive),
            mode: Mutex::new(mode),
            counters: Counters::default(),
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::new(true, Mode::Healthy)
    }

    pub fn dead() -> Arc<Self> {
        Self::new(false, Mode::Healthy)
    }

    /// Refuse new sessions and break every open one.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock().expect("mode lock")
    }
}

/// Connector resolving endpoints to scripted servers.
#[derive(Clone, Default)]
pub struct MockConnector {
    servers: Arc<HashMap<String, Arc<MockServer>>>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new(servers: &[(&str, Arc<MockServer>)]) -> Self {
        let servers = servers
            .iter()
            .map(|(addr, server)| (addr.to_string(), server.clone()))
            .collect();
        Self {
            servers: Arc::new(servers),
            attempts: Arc::default(),
        }
    }

    /// Every endpoint `connect` was called with, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().expect("attempts lock").clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<MockSession> {
        self.attempts
            .lock()
            .expect("attempts lock")
            .push(endpoint.to_string());

        let server = self
            .servers
            .get(endpoint.as_str())
            .filter(|server| server.is_alive())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))?;

        server.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            server,
            closed: false,
        })
    }
}

/// Client-role session to a scripted server.
pub struct MockSession {
    server: Arc<MockServer>,
    closed: bool,
}

#[async_trait]
impl Session for MockSession {
    type Stream = MockStream;

    async fn open_stream(&mut self) -> io::Result<MockStream> {
        if self.closed || !self.server.is_alive() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "session is dead"));
        }

        let (near, mut far) = tokio::io::duplex(64);
        let mode = self.server.mode();
        match mode {
            Mode::Healthy => {
                tokio::spawn(async move {
                    let _ = answer_probe(&mut far).await;
                });
            }
            Mode::Silent => {
                tokio::spawn(async move {
                    let mut sink = Vec::new();
                    let _ = far.read_to_end(&mut sink).await;
                });
            }
            Mode::ShortWrite => drop(far),
        }

        self.server
            .counters
            .streams_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(MockStream {
            inner: near,
            short_write: mode == Mode::ShortWrite,
            server: self.server.clone(),
        })
    }

    async fn accept_stream(&mut self) -> Option<io::Result<MockStream>> {
        None
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.server
                .counters
                .sessions_closed
                .fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Probe stream that counts itself closed when dropped.
pub struct MockStream {
    inner: DuplexStream,
    short_write: bool,
    server: Arc<MockServer>,
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.server
            .counters
            .streams_closed
            .fetch_add(1, Ordering::SeqCst);
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.short_write {
            return Poll::Ready(Ok(buf.len().min(2)));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

// =============================================================================
// Server side: a session fed by the test
// =============================================================================

/// Server-role session whose inbound streams are pushed by the test.
pub struct ScriptedSession {
    inbound: mpsc::UnboundedReceiver<io::Result<DuplexStream>>,
    closed: Arc<AtomicBool>,
}

/// Test-side handle of a [`ScriptedSession`].
pub struct SessionFeed {
    inbound: mpsc::UnboundedSender<io::Result<DuplexStream>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSession {
    pub fn new() -> (Self, SessionFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        (
            Self {
                inbound: rx,
                closed: closed.clone(),
            },
            SessionFeed {
                inbound: tx,
                closed,
            },
        )
    }
}

impl SessionFeed {
    /// Deliver a new inbound stream and return the peer's end of it.
    pub fn open(&self) -> DuplexStream {
        let (client, server) = tokio::io::duplex(64);
        self.inbound.send(Ok(server)).expect("session handler alive");
        client
    }

    /// Make the next `accept_stream` fail.
    pub fn fail_accept(&self) {
        self.inbound
            .send(Err(io::Error::new(io::ErrorKind::Other, "stream accept failed")))
            .expect("session handler alive");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// End the session as if the peer went away.
    pub fn hang_up(self) -> Arc<AtomicBool> {
        self.closed
    }
}

#[async_trait]
impl Session for ScriptedSession {
    type Stream = DuplexStream;

    async fn open_stream(&mut self) -> io::Result<DuplexStream> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "server sessions do not open streams",
        ))
    }

    async fn accept_stream(&mut self) -> Option<io::Result<DuplexStream>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
