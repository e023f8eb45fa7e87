//! Owned packets and ordered captures.

use std::time::SystemTime;

use tcpstitch::{
    Endpoint,
    FlowKey,
    ReassemblyEngine,
    ReassemblyStatus,
    SeqNum,
    StreamObserver,
    TcpFlags,
    TcpSegment,
};

/// Which application message a data packet carries, and which part of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataTag {
    /// Zero-based message index within the capture.
    pub message: usize,
    /// Zero-based segment index within the message.
    pub part: usize,
}

/// An owned TCP segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub src: Endpoint,
    pub dst: Endpoint,
    pub seq: u32,
    pub flags: TcpFlags,
    pub payload: Vec<u8>,
    /// Payload length claimed by the (synthetic) header, when it differs
    /// from the captured bytes.
    pub claimed_len: Option<usize>,
    pub timestamp: SystemTime,
    pub tag: Option<DataTag>,
}

impl Packet {
    /// Borrowed view handed to the engine.
    #[must_use]
    pub fn segment(&self) -> TcpSegment<'_> {
        let seq = SeqNum::new(self.seq);
        match self.claimed_len {
            Some(claimed) => TcpSegment::with_claimed_len(
                self.src,
                self.dst,
                seq,
                self.flags,
                &self.payload,
                claimed,
                self.timestamp,
            ),
            None => TcpSegment::new(self.src, self.dst, seq, self.flags, &self.payload, self.timestamp),
        }
    }

    /// Sequence number one past the last payload byte.
    #[must_use]
    pub fn end_seq(&self) -> u32 { SeqNum::new(self.seq).wrapping_add(self.payload.len()).get() }

    /// Whether the packet carries message data.
    #[must_use]
    pub fn is_data(&self) -> bool { self.tag.is_some() }
}

/// Fluent constructor for [`Packet`].
///
/// ```rust
/// use std::time::SystemTime;
///
/// use tcpstitch::{Endpoint, TcpFlags};
/// use tcpstitch_testing::PacketBuilder;
///
/// let client = Endpoint::new([10, 0, 0, 1].into(), 50000);
/// let server = Endpoint::new([10, 0, 0, 2].into(), 80);
/// let packet = PacketBuilder::new(client, server, SystemTime::UNIX_EPOCH)
///     .seq(7)
///     .flags(TcpFlags::FIN_ACK)
///     .payload(b"bye")
///     .build();
/// assert_eq!(packet.end_seq(), 10);
/// ```
#[derive(Clone, Debug)]
pub struct PacketBuilder {
    packet: Packet,
}

impl PacketBuilder {
    /// Start an empty ACK from `src` to `dst`.
    #[must_use]
    pub fn new(src: Endpoint, dst: Endpoint, timestamp: SystemTime) -> Self {
        Self {
            packet: Packet {
                src,
                dst,
                seq: 0,
                flags: TcpFlags::ACK,
                payload: Vec::new(),
                claimed_len: None,
                timestamp,
                tag: None,
            },
        }
    }

    #[must_use]
    pub fn seq(mut self, seq: u32) -> Self {
        self.packet.seq = seq;
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: TcpFlags) -> Self {
        self.packet.flags = flags;
        self
    }

    #[must_use]
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.packet.payload = payload.to_vec();
        self
    }

    #[must_use]
    pub fn tag(mut self, message: usize, part: usize) -> Self {
        self.packet.tag = Some(DataTag { message, part });
        self
    }

    #[must_use]
    pub fn build(self) -> Packet { self.packet }
}

/// An ordered list of packets exchanged between one client and one server.
#[derive(Clone, Debug)]
pub struct Capture {
    pub client: Endpoint,
    pub server: Endpoint,
    pub packets: Vec<Packet>,
}

impl Capture {
    /// Key of the captured connection.
    #[must_use]
    pub fn flow_key(&self) -> FlowKey { FlowKey::from_endpoints(self.client, self.server) }

    /// Feed every packet to `engine`, returning each status in order.
    pub fn replay<O: StreamObserver>(&self, engine: &mut ReassemblyEngine<O>) -> Vec<ReassemblyStatus> {
        self.packets
            .iter()
            .map(|packet| engine.reassemble(&packet.segment()))
            .collect()
    }

    /// Index of the data packet carrying `part` of `message`.
    #[must_use]
    pub fn position(&self, message: usize, part: usize) -> Option<usize> {
        let wanted = Some(DataTag { message, part });
        self.packets.iter().position(|packet| packet.tag == wanted)
    }

    /// Indices of every data packet of `message`, in capture order.
    #[must_use]
    pub fn positions(&self, message: usize) -> Vec<usize> {
        self.packets
            .iter()
            .enumerate()
            .filter(|(_, packet)| packet.tag.is_some_and(|tag| tag.message == message))
            .map(|(index, _)| index)
            .collect()
    }

    /// Number of packets carrying payload.
    #[must_use]
    pub fn data_packets(&self) -> usize { self.packets.iter().filter(|p| !p.payload.is_empty()).count() }

    /// Last packet sent by `sender`.
    #[must_use]
    pub fn last_from(&self, sender: Endpoint) -> Option<&Packet> {
        self.packets.iter().rev().find(|packet| packet.src == sender)
    }

    /// Move the connection onto new endpoints, keeping packet directions.
    #[must_use]
    pub fn with_endpoints(mut self, client: Endpoint, server: Endpoint) -> Self {
        for packet in &mut self.packets {
            let from_client = packet.src == self.client;
            (packet.src, packet.dst) = if from_client { (client, server) } else { (server, client) };
        }
        self.client = client;
        self.server = server;
        self
    }

    /// Add `client_delta` to every client sequence number and `server_delta`
    /// to every server one, modulo 2^32.
    #[must_use]
    pub fn shift_sequences(mut self, client_delta: u32, server_delta: u32) -> Self {
        for packet in &mut self.packets {
            let delta = if packet.src == self.client { client_delta } else { server_delta };
            packet.seq = packet.seq.wrapping_add(delta);
        }
        self
    }
}
