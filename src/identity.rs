//! Connection identity: endpoints and the (local, remote) pair used as the
//! primary key into every family's [`crate::index::ConnectionIndex`].

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// One side of a TCP connection: an address-family-tagged address plus port.
///
/// Two endpoints are equal iff family, address bytes, and port all match.
/// Ordering is lexicographic on (address bytes, port) within a family;
/// families themselves are disjoint — `derive(Ord)` on the enum already
/// gives us that, since the variant discriminant is compared before the
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    V4 { addr: [u8; 4], port: u16 },
    V6 { addr: [u8; 16], port: u16 },
}

impl Endpoint {
    pub fn v4(addr: [u8; 4], port: u16) -> Self {
        Endpoint::V4 { addr, port }
    }

    pub fn v6(addr: [u8; 16], port: u16) -> Self {
        Endpoint::V6 { addr, port }
    }

    pub fn port(&self) -> u16 {
        match self {
            Endpoint::V4 { port, .. } => *port,
            Endpoint::V6 { port, .. } => *port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::V4 { addr, port } => {
                write!(f, "{}:{}", Ipv4Addr::from(*addr), port)
            }
            Endpoint::V6 { addr, port } => {
                write!(f, "[{}]:{}", Ipv6Addr::from(*addr), port)
            }
        }
    }
}

/// The primary key for a connection across all seven ESTATS families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
    pub local: Endpoint,
    pub remote: Endpoint,
}

impl Identity {
    pub fn new(local: Endpoint, remote: Endpoint) -> Self {
        Self { local, remote }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.local, self.remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_and_v6_with_equal_low_bytes_are_not_equal() {
        // The IPv4 loopback 127.0.0.1 numerically appears inside the IPv6
        // address ::127.0.0.1 — family must still distinguish them.
        let v4 = Endpoint::v4([127, 0, 0, 1], 80);
        let v6 = Endpoint::v6(
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 127, 0, 0, 1],
            80,
        );
        assert_ne!(v4, v6);
    }

    #[test]
    fn ordering_is_lexicographic_within_a_family() {
        let a = Endpoint::v4([10, 0, 0, 1], 100);
        let b = Endpoint::v4([10, 0, 0, 1], 200);
        let c = Endpoint::v4([10, 0, 0, 2], 1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn display_matches_canonical_form() {
        let ep = Endpoint::v4([192, 168, 1, 1], 443);
        assert_eq!(ep.to_string(), "192.168.1.1:443");
    }
}
