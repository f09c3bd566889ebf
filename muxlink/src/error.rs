//! Error types for muxlink.
//!
//! Every variant of [`LinkError`] is fatal for the loop that returns it.
//! Recoverable probe failures are modelled separately by
//! [`ProbeError`](crate::probe::ProbeError) and never escape the client loop.

use std::io;
use thiserror::Error;

use crate::endpoint::Endpoint;

/// Fatal errors surfaced by the client and server loops.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The client was started without any candidate endpoint.
    #[error("no candidate endpoints configured")]
    NoCandidates,

    /// An endpoint string could not be parsed.
    #[error("invalid endpoint {input:?}: {reason}")]
    InvalidEndpoint {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Opening a session to an endpoint failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// The endpoint that could not be reached.
        endpoint: Endpoint,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Binding the server listener failed.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        /// The requested listen address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The bound listener could not report its local address.
    #[error("cannot read local address of listener on {addr}: {source}")]
    LocalAddr {
        /// The requested listen address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Accepting a raw connection failed with a non-transient error.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
}

/// Result type for fatal muxlink operations.
pub type LinkResult<T> = Result<T, LinkError>;
