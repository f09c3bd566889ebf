//! muxlink command line.
//!
//! # Usage
//!
//! Server (answers probes):
//! ```bash
//! cargo run --bin muxlink -- server 127.0.0.1:7078
//! ```
//!
//! Client (probes the first reachable candidate, fails over in order):
//! ```bash
//! cargo run --bin muxlink -- client 127.0.0.1:7078 127.0.0.1:7079
//! ```
//!
//! SIGINT or SIGHUP cancels the running role, waits up to one second for
//! it to wind down, and exits 0.

use std::future;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use muxlink::server::DEFAULT_LISTEN_ADDR;
use muxlink::{
    CancellationToken, CandidateRing, ClientConfig, Endpoint, FailoverClient, LinkResult, Server,
    ServerConfig, SessionConfig, TokioNetworkProvider, YamuxConnector,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for the role to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "muxlink")]
#[command(about = "Liveness-checked multiplexed connection with failover", long_about = None)]
struct Args {
    #[command(subcommand)]
    role: Role,

    /// Session keep-alive interval in seconds
    #[arg(long, global = true, default_value_t = 30)]
    keepalive_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Accept sessions and answer every probe stream
    Server {
        /// Address to listen on
        #[arg(default_value = DEFAULT_LISTEN_ADDR)]
        address: String,

        /// Maximum number of connections served at once
        #[arg(long, default_value_t = 1024)]
        max_connections: usize,

        /// Maximum number of concurrent probe streams per session
        #[arg(long, default_value_t = 256)]
        max_streams: usize,
    },

    /// Probe one server at a time, failing over to the next candidate
    Client {
        /// Candidate server addresses, tried in order
        #[arg(required = true)]
        addresses: Vec<Endpoint>,

        /// Milliseconds between probes
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Fail a probe that takes longer than this many milliseconds
        #[arg(long)]
        probe_timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let session = SessionConfig::default()
        .with_keepalive_interval(Duration::from_secs(args.keepalive_secs));
    let cancel = CancellationToken::new();

    let role = run_role(args.role, session, cancel.clone());
    tokio::pin!(role);

    tokio::select! {
        result = &mut role => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{}", e);
                ExitCode::FAILURE
            }
        },
        _ = shutdown_signal() => {
            cancel.cancel();
            tracing::info!("shutting down in 1sec...");
            if let Ok(Err(e)) = tokio::time::timeout(SHUTDOWN_GRACE, &mut role).await {
                tracing::warn!("error during shutdown: {}", e);
            }
            tracing::info!("bye!");
            ExitCode::SUCCESS
        }
    }
}

async fn run_role(role: Role, session: SessionConfig, cancel: CancellationToken) -> LinkResult<()> {
    let network = TokioNetworkProvider::new();

    match role {
        Role::Server {
            address,
            max_connections,
            max_streams,
        } => {
            let config = ServerConfig::new(address)
                .with_max_connections(max_connections)
                .with_max_streams_per_session(max_streams)
                .with_session(session);
            Server::bind(&network, config).await?.run(cancel).await
        }
        Role::Client {
            addresses,
            interval_ms,
            probe_timeout_ms,
        } => {
            let candidates = CandidateRing::new(addresses)?;
            let mut config =
                ClientConfig::default().with_probe_interval(Duration::from_millis(interval_ms));
            if let Some(ms) = probe_timeout_ms {
                config = config.with_probe_timeout(Duration::from_millis(ms));
            }

            let connector = YamuxConnector::new(network, session);
            let mut client = FailoverClient::new(connector, candidates, config);
            client.run(cancel).await
        }
    }
}

/// Resolve on SIGINT, or SIGHUP where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for ctrl-c: {}", e);
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let hangup = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::hangup()) {
            Ok(mut hangup) => {
                hangup.recv().await;
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGHUP: {}", e);
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let hangup = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = hangup => {}
    }
}
