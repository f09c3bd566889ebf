//! Endpoint addresses and the rotating candidate ring.

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use crate::error::{LinkError, LinkResult};

/// A candidate server address in `host:port` form.
///
/// The address is kept as the caller wrote it; name resolution happens
/// when a connection is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    /// Parse a `host:port` address.
    ///
    /// IPv6 hosts must use the bracketed form (`[::1]:7078`).
    pub fn parse(input: &str) -> LinkResult<Self> {
        let invalid = |reason| LinkError::InvalidEndpoint {
            input: input.to_string(),
            reason,
        };

        let (host, port) = input.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        match host.strip_prefix('[').map(|h| h.strip_suffix(']')) {
            Some(Some(inner)) => {
                inner
                    .parse::<Ipv6Addr>()
                    .map_err(|_| invalid("bracketed host is not an IPv6 address"))?;
            }
            Some(None) => return Err(invalid("unbalanced brackets around IPv6 host")),
            None if host.ends_with(']') => {
                return Err(invalid("unbalanced brackets around IPv6 host"))
            }
            None if host.contains(':') => return Err(invalid("IPv6 host must be bracketed")),
            None => {}
        }
        port.parse::<u16>().map_err(|_| invalid("invalid port"))?;

        Ok(Self(input.to_string()))
    }

    /// The address as a string, suitable for `connect`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Endpoint {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Ordered set of endpoints the client cycles through on failure.
///
/// Endpoints live in a fixed slice and the ring only moves a head index,
/// so a failed endpoint is never dropped: after `len()` rotations every
/// endpoint has been the head exactly once and the original order is back.
#[derive(Debug, Clone)]
pub struct CandidateRing {
    endpoints: Box<[Endpoint]>,
    head: usize,
}

impl CandidateRing {
    /// Build a ring from an ordered list of endpoints.
    ///
    /// Returns [`LinkError::NoCandidates`] when the list is empty.
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint>) -> LinkResult<Self> {
        let endpoints: Box<[Endpoint]> = endpoints.into_iter().collect();
        if endpoints.is_empty() {
            return Err(LinkError::NoCandidates);
        }
        Ok(Self { endpoints, head: 0 })
    }

    /// The current connection target.
    pub fn head(&self) -> &Endpoint {
        &self.endpoints[self.head]
    }

    /// Move the current head to the tail and return the new head.
    pub fn rotate(&mut self) -> &Endpoint {
        self.head = (self.head + 1) % self.endpoints.len();
        self.head()
    }

    /// Number of endpoints in the ring.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always false: a ring cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoints in current order, starting at the head.
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> + '_ {
        let (tail, front) = self.endpoints.split_at(self.head);
        front.iter().chain(tail.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(addrs: &[&str]) -> CandidateRing {
        CandidateRing::new(addrs.iter().map(|a| Endpoint::parse(a).expect("valid endpoint")))
            .expect("non-empty ring")
    }

    fn order(ring: &CandidateRing) -> Vec<String> {
        ring.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn parses_host_port_forms() {
        assert!(Endpoint::parse("127.0.0.1:7078").is_ok());
        assert!(Endpoint::parse("localhost:80").is_ok());
        assert!(Endpoint::parse("[::1]:7078").is_ok());
    }

    #[test]
    fn rejects_malformed_endpoints() {
        for bad in ["", "7078", ":7078", "host:", "host:70000", "::1:7078", "[::1:7078"] {
            assert!(
                matches!(Endpoint::parse(bad), Err(LinkError::InvalidEndpoint { .. })),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn bracketed_host_must_be_ipv6() {
        assert!(Endpoint::parse("[fe80::1]:443").is_ok());
        for bad in ["[]:80", "[abc]:80", "[127.0.0.1]:80", "::1]:80"] {
            assert!(
                matches!(Endpoint::parse(bad), Err(LinkError::InvalidEndpoint { .. })),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn empty_ring_is_rejected() {
        assert!(matches!(
            CandidateRing::new(Vec::new()),
            Err(LinkError::NoCandidates)
        ));
    }

    #[test]
    fn rotate_moves_head_to_tail() {
        let mut ring = ring(&["a:1", "b:2", "c:3"]);
        assert_eq!(ring.head().as_str(), "a:1");

        assert_eq!(ring.rotate().as_str(), "b:2");
        assert_eq!(order(&ring), ["b:2", "c:3", "a:1"]);

        assert_eq!(ring.rotate().as_str(), "c:3");
        assert_eq!(order(&ring), ["c:3", "a:1", "b:2"]);
    }

    #[test]
    fn full_cycle_visits_every_endpoint_once_and_restores_order() {
        for size in 1..=6 {
            let addrs: Vec<String> = (0..size).map(|i| format!("host{i}:{}", 7000 + i)).collect();
            let refs: Vec<&str> = addrs.iter().map(String::as_str).collect();
            let mut ring = ring(&refs);
            let original = order(&ring);

            let mut heads = Vec::new();
            for _ in 0..size {
                heads.push(ring.head().to_string());
                ring.rotate();
            }

            assert_eq!(heads, original, "each endpoint is head exactly once");
            assert_eq!(order(&ring), original, "order restored after N rotations");
        }
    }

    #[test]
    fn single_endpoint_rotates_onto_itself() {
        let mut ring = ring(&["only:1"]);
        assert_eq!(ring.rotate().as_str(), "only:1");
        assert_eq!(ring.len(), 1);
        assert!(!ring.is_empty());
    }
}
