//! Read-only connection description shared with observers.

use std::{fmt, net::IpAddr, time::SystemTime};

use serde::Serialize;

use super::{Endpoint, FlowKey, Side};
use crate::segment::TcpSegment;

/// Why a connection ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionEndReason {
    /// Both sides sent FIN, or either side sent RST.
    ClosedByFlags,
    /// The caller closed the connection, or the engine was dropped.
    ClosedManually,
    /// The idle-eviction sweep reclaimed the connection.
    TimedOut,
}

impl ConnectionEndReason {
    /// Short label used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClosedByFlags => "closed_by_flags",
            Self::ClosedManually => "closed_manually",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for ConnectionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Addresses, ports and timestamps of one tracked connection.
///
/// The source endpoint is side 0: the sender of the first segment seen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionMetadata {
    flow_key: FlowKey,
    src: Endpoint,
    dst: Endpoint,
    start_time: SystemTime,
    end_time: Option<SystemTime>,
}

impl ConnectionMetadata {
    pub(crate) fn from_first_segment(flow_key: FlowKey, segment: &TcpSegment<'_>) -> Self {
        Self {
            flow_key,
            src: segment.src(),
            dst: segment.dst(),
            start_time: segment.timestamp,
            end_time: None,
        }
    }

    pub(crate) fn set_end_time(&mut self, at: SystemTime) { self.end_time = Some(at); }

    /// Direction-independent key of the connection.
    #[must_use]
    pub const fn flow_key(&self) -> FlowKey { self.flow_key }

    /// Side 0 endpoint.
    #[must_use]
    pub const fn src(&self) -> Endpoint { self.src }

    /// Side 1 endpoint.
    #[must_use]
    pub const fn dst(&self) -> Endpoint { self.dst }

    /// Side 0 address.
    #[must_use]
    pub const fn src_addr(&self) -> IpAddr { self.src.addr }

    /// Side 1 address.
    #[must_use]
    pub const fn dst_addr(&self) -> IpAddr { self.dst.addr }

    /// Side 0 port.
    #[must_use]
    pub const fn src_port(&self) -> u16 { self.src.port }

    /// Side 1 port.
    #[must_use]
    pub const fn dst_port(&self) -> u16 { self.dst.port }

    /// Capture time of the first segment seen.
    #[must_use]
    pub const fn start_time(&self) -> SystemTime { self.start_time }

    /// Capture time at which the connection was determined closed.
    #[must_use]
    pub const fn end_time(&self) -> Option<SystemTime> { self.end_time }

    /// Which side `sender` transmits on.
    #[must_use]
    pub fn side_of(&self, sender: Endpoint) -> Side {
        if sender == self.src { Side::Zero } else { Side::One }
    }
}
