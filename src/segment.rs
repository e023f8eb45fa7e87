//! Parsed TCP segment view consumed by the engine.
//!
//! Capture and header parsing live outside this crate. Callers hand the
//! engine a [`TcpSegment`] describing the addresses, ports, sequence number,
//! control flags and payload of one packet.

use std::{net::IpAddr, time::SystemTime};

use log::debug;

use crate::{flow::Endpoint, sequence::SeqNum};

/// TCP control bits the engine reacts to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TcpFlags {
    /// Synchronise sequence numbers.
    pub syn: bool,
    /// Acknowledgement field is significant.
    pub ack: bool,
    /// Sender has finished sending.
    pub fin: bool,
    /// Reset the connection.
    pub rst: bool,
}

impl TcpFlags {
    /// No control bits set.
    pub const NONE: Self = Self {
        syn: false,
        ack: false,
        fin: false,
        rst: false,
    };

    /// Only `ACK` set.
    pub const ACK: Self = Self {
        ack: true,
        ..Self::NONE
    };

    /// Only `SYN` set.
    pub const SYN: Self = Self {
        syn: true,
        ..Self::NONE
    };

    /// `SYN` and `ACK` set.
    pub const SYN_ACK: Self = Self {
        syn: true,
        ack: true,
        ..Self::NONE
    };

    /// `FIN` and `ACK` set.
    pub const FIN_ACK: Self = Self {
        fin: true,
        ack: true,
        ..Self::NONE
    };

    /// `RST` set.
    pub const RST: Self = Self {
        rst: true,
        ..Self::NONE
    };

    /// Decode the low byte of the TCP flags field.
    ///
    /// ```
    /// use tcpstitch::TcpFlags;
    /// let flags = TcpFlags::from_bits(0x11);
    /// assert!(flags.fin && flags.ack);
    /// ```
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            fin: bits & 0x01 != 0,
            syn: bits & 0x02 != 0,
            rst: bits & 0x04 != 0,
            ack: bits & 0x10 != 0,
        }
    }

    /// Whether the segment terminates its side of the stream.
    #[must_use]
    pub const fn closes(self) -> bool { self.fin || self.rst }
}

/// One parsed TCP segment.
#[derive(Clone, Copy, Debug)]
pub struct TcpSegment<'a> {
    /// Source address.
    pub src_addr: IpAddr,
    /// Destination address.
    pub dst_addr: IpAddr,
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
    /// Sequence number of the first payload byte.
    pub seq: SeqNum,
    /// Control flags.
    pub flags: TcpFlags,
    /// Payload bytes.
    pub payload: &'a [u8],
    /// Capture timestamp.
    pub timestamp: SystemTime,
}

impl<'a> TcpSegment<'a> {
    /// Build a segment from already parsed fields.
    #[must_use]
    pub fn new(
        src: Endpoint,
        dst: Endpoint,
        seq: SeqNum,
        flags: TcpFlags,
        payload: &'a [u8],
        timestamp: SystemTime,
    ) -> Self {
        Self {
            src_addr: src.addr,
            dst_addr: dst.addr,
            src_port: src.port,
            dst_port: dst.port,
            seq,
            flags,
            payload,
            timestamp,
        }
    }

    /// Build a segment whose payload length comes from a header field.
    ///
    /// Header length fields are attacker controlled: when `claimed_len`
    /// exceeds the bytes actually captured the payload is clamped to the
    /// captured buffer.
    ///
    /// ```
    /// use std::time::SystemTime;
    ///
    /// use tcpstitch::{Endpoint, SeqNum, TcpFlags, TcpSegment};
    ///
    /// let src = Endpoint::new([10, 0, 0, 1].into(), 4000);
    /// let dst = Endpoint::new([10, 0, 0, 2].into(), 80);
    /// let captured = [1_u8, 2, 3];
    /// let segment = TcpSegment::with_claimed_len(
    ///     src,
    ///     dst,
    ///     SeqNum::new(1),
    ///     TcpFlags::ACK,
    ///     &captured,
    ///     43,
    ///     SystemTime::UNIX_EPOCH,
    /// );
    /// assert_eq!(segment.payload.len(), 3);
    /// ```
    #[must_use]
    pub fn with_claimed_len(
        src: Endpoint,
        dst: Endpoint,
        seq: SeqNum,
        flags: TcpFlags,
        captured: &'a [u8],
        claimed_len: usize,
        timestamp: SystemTime,
    ) -> Self {
        if claimed_len > captured.len() {
            debug!(
                "clamping claimed payload length: claimed={claimed_len}, captured={}",
                captured.len()
            );
        }
        let len = claimed_len.min(captured.len());
        Self::new(src, dst, seq, flags, &captured[..len], timestamp)
    }

    /// Sending endpoint.
    #[must_use]
    pub const fn src(&self) -> Endpoint { Endpoint::new(self.src_addr, self.src_port) }

    /// Receiving endpoint.
    #[must_use]
    pub const fn dst(&self) -> Endpoint { Endpoint::new(self.dst_addr, self.dst_port) }

    /// Whether the segment carries payload bytes.
    #[must_use]
    pub const fn has_payload(&self) -> bool { !self.payload.is_empty() }
}
