//! Direction-independent flow identifiers.

use std::{fmt, net::IpAddr};

use serde::Serialize;

use crate::segment::TcpSegment;

/// IANA protocol number for TCP.
pub const IPPROTO_TCP: u8 = 6;

/// One end of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Endpoint {
    /// IPv4 or IPv6 address.
    pub addr: IpAddr,
    /// Transport port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint.
    #[must_use]
    pub const fn new(addr: IpAddr, port: u16) -> Self { Self { addr, port } }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr {
            IpAddr::V4(addr) => write!(f, "{addr}:{}", self.port),
            IpAddr::V6(addr) => write!(f, "[{addr}]:{}", self.port),
        }
    }
}

/// Identifier shared by both directions of a connection.
///
/// The two endpoints are stored in canonical order, so swapping source and
/// destination yields an equal key.
///
/// # Examples
///
/// ```
/// use tcpstitch::{Endpoint, FlowKey};
/// let client = Endpoint::new([10, 0, 0, 1].into(), 51000);
/// let server = Endpoint::new([10, 0, 0, 2].into(), 80);
/// assert_eq!(
///     FlowKey::from_endpoints(client, server),
///     FlowKey::from_endpoints(server, client),
/// );
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FlowKey {
    protocol: u8,
    lower: Endpoint,
    upper: Endpoint,
}

impl FlowKey {
    /// Key for a TCP exchange between `a` and `b`, in either order.
    #[must_use]
    pub fn from_endpoints(a: Endpoint, b: Endpoint) -> Self {
        Self::with_protocol(IPPROTO_TCP, a, b)
    }

    /// Key for an exchange carried over an arbitrary IP protocol.
    #[must_use]
    pub fn with_protocol(protocol: u8, a: Endpoint, b: Endpoint) -> Self {
        let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
        Self {
            protocol,
            lower,
            upper,
        }
    }

    /// Key of the connection `segment` belongs to.
    #[must_use]
    pub fn of(segment: &TcpSegment<'_>) -> Self { Self::from_endpoints(segment.src(), segment.dst()) }

    /// IP protocol number.
    #[must_use]
    pub const fn protocol(&self) -> u8 { self.protocol }

    /// The two endpoints in canonical order.
    #[must_use]
    pub const fn endpoints(&self) -> (Endpoint, Endpoint) { (self.lower, self.upper) }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.lower, self.upper)
    }
}

/// One direction of a connection.
///
/// [`Side::Zero`] is whichever endpoint sent the first segment seen for the
/// connection; it stays fixed for the connection's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    /// Direction of the first-seen segment.
    Zero,
    /// The opposite direction.
    One,
}

impl Side {
    /// Both sides, in index order.
    pub const BOTH: [Self; 2] = [Self::Zero, Self::One];

    /// Numeric index (0 or 1).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }

    /// The other direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.index()) }
}
