//! Synthetic HTTP-like captures and the damaged variants built from them.
//!
//! The baseline is one keep-alive exchange between [`CLIENT`] and
//! [`SERVER`]: a three-way handshake followed by four application messages,
//!
//! | message | sender | segments |
//! |---------|--------|----------|
//! | 0       | client | 1        |
//! | 1       | server | 4        |
//! | 2       | client | 1        |
//! | 3       | server | 13       |
//!
//! with the receiver acknowledging every data segment with a pure ACK. No
//! FIN or RST is sent, so the connection stays open until closed by hand.

use std::{
    net::{IpAddr, Ipv4Addr},
    time::{Duration, SystemTime},
};

use tcpstitch::{Endpoint, Side, TcpFlags};

use crate::packet::{Capture, Packet, PacketBuilder};

/// Client endpoint of the baseline capture.
pub const CLIENT: Endpoint = Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 56532);
/// Server endpoint of the baseline capture.
pub const SERVER: Endpoint = Endpoint::new(IpAddr::V4(Ipv4Addr::new(81, 218, 72, 15)), 80);

/// Initial sequence number of the client's SYN.
pub const CLIENT_ISN: u32 = 0x3A1F_0C00;
/// Initial sequence number of the server's SYN-ACK.
pub const SERVER_ISN: u32 = 0x9C40_1000;

/// Largest payload carried by one data segment.
pub const SEGMENT_SIZE: usize = 256;

/// Sender and byte length of each baseline message.
pub const MESSAGES: [(Side, usize); 4] = [
    (Side::Zero, 120),
    (Side::One, 3 * SEGMENT_SIZE + 100),
    (Side::Zero, 140),
    (Side::One, 12 * SEGMENT_SIZE + 77),
];

/// Index of the server's long second response.
pub const LONG_RESPONSE: usize = 3;

/// Data segments in the baseline capture.
pub const DATA_SEGMENTS: usize = 19;

const STEP: Duration = Duration::from_millis(10);

/// Capture time of the first packet.
#[must_use]
pub fn epoch() -> SystemTime { SystemTime::UNIX_EPOCH + Duration::from_secs(1_491_516_383) }

/// Bytes of message `index`.
///
/// Requests start with a request line, responses with a status line, and
/// every message is padded with numbered lines so that misplaced bytes are
/// easy to spot in a failing assertion.
#[must_use]
pub fn message(index: usize) -> Vec<u8> {
    let (sender, len) = MESSAGES[index];
    let mut text = match sender {
        Side::Zero => format!("GET /page/{index} HTTP/1.1\r\nHost: 81.218.72.15\r\n\r\n"),
        Side::One => format!("HTTP/1.1 200 OK\r\nX-Message: {index}\r\n\r\n"),
    };
    let mut line = 0;
    while text.len() < len {
        text.push_str(&format!("m{index} line {line:04}\n"));
        line += 1;
    }
    text.truncate(len);
    text.into_bytes()
}

/// Every byte the baseline sends on `side`, in order.
#[must_use]
pub fn expected_stream(side: Side) -> Vec<u8> {
    MESSAGES
        .iter()
        .enumerate()
        .filter(|(_, (sender, _))| *sender == side)
        .flat_map(|(index, _)| message(index))
        .collect()
}

struct Timeline {
    next: [u32; 2],
    clock: SystemTime,
    packets: Vec<Packet>,
}

impl Timeline {
    fn endpoints(side: Side) -> (Endpoint, Endpoint) {
        match side {
            Side::Zero => (CLIENT, SERVER),
            Side::One => (SERVER, CLIENT),
        }
    }

    fn push(&mut self, side: Side, builder: impl FnOnce(PacketBuilder) -> PacketBuilder) {
        let (src, dst) = Self::endpoints(side);
        let packet = builder(PacketBuilder::new(src, dst, self.clock).seq(self.next[side.index()])).build();
        self.next[side.index()] = packet.end_seq();
        self.clock += STEP;
        self.packets.push(packet);
    }

    fn control(&mut self, side: Side, flags: TcpFlags) {
        self.push(side, |p| p.flags(flags));
        if flags.syn || flags.fin {
            self.next[side.index()] = self.next[side.index()].wrapping_add(1);
        }
    }
}

/// The undamaged capture.
#[must_use]
pub fn baseline() -> Capture {
    let mut timeline = Timeline {
        next: [CLIENT_ISN, SERVER_ISN],
        clock: epoch(),
        packets: Vec::new(),
    };
    timeline.control(Side::Zero, TcpFlags::SYN);
    timeline.control(Side::One, TcpFlags::SYN_ACK);
    timeline.control(Side::Zero, TcpFlags::ACK);

    for (index, (sender, _)) in MESSAGES.iter().enumerate() {
        let bytes = message(index);
        for (part, chunk) in bytes.chunks(SEGMENT_SIZE).enumerate() {
            timeline.push(*sender, |p| p.payload(chunk).tag(index, part));
            timeline.control(sender.opposite(), TcpFlags::ACK);
        }
    }

    Capture {
        client: CLIENT,
        server: SERVER,
        packets: timeline.packets,
    }
}

/// The baseline without its three-way handshake.
#[must_use]
pub fn without_handshake() -> Capture {
    let mut capture = baseline();
    capture.packets.drain(..3);
    capture
}

fn data(capture: &Capture, message: usize, part: usize) -> (usize, Packet) {
    let position = capture
        .position(message, part)
        .unwrap_or_else(|| panic!("baseline has no part {part} of message {message}"));
    (position, capture.packets[position].clone())
}

fn retransmit(original: &Packet, skip: usize, take: usize, extra: &[u8]) -> Packet {
    let mut payload = original.payload[skip..skip + take].to_vec();
    payload.extend_from_slice(extra);
    Packet {
        seq: original.seq.wrapping_add(u32::try_from(skip).unwrap_or(u32::MAX)),
        payload,
        tag: None,
        ..original.clone()
    }
}

/// The baseline with six retransmissions injected, each right after the
/// segment it repeats:
///
/// 1. an exact duplicate,
/// 2. a prefix of the original,
/// 3. a suffix of the original,
/// 4. the original plus the first bytes of the next segment,
/// 5. the tail of the original shifted into the next segment, and
/// 6. a range trimmed at both ends.
///
/// Only 4 and 5 carry bytes the engine has not seen.
#[must_use]
pub fn with_retransmissions() -> Capture {
    let capture = baseline();
    let (_, m4p6) = data(&capture, LONG_RESPONSE, 6);
    let (_, m4p8) = data(&capture, LONG_RESPONSE, 8);

    let mut injections = Vec::new();
    let (at, p) = data(&capture, 1, 1);
    injections.push((at, retransmit(&p, 0, p.payload.len(), b"")));
    let (at, p) = data(&capture, LONG_RESPONSE, 2);
    injections.push((at, retransmit(&p, 0, 100, b"")));
    let (at, p) = data(&capture, LONG_RESPONSE, 3);
    injections.push((at, retransmit(&p, 50, SEGMENT_SIZE - 50, b"")));
    let (at, p) = data(&capture, LONG_RESPONSE, 5);
    injections.push((at, retransmit(&p, 0, SEGMENT_SIZE, &m4p6.payload[..40])));
    let (at, p) = data(&capture, LONG_RESPONSE, 7);
    injections.push((at, retransmit(&p, 100, SEGMENT_SIZE - 100, &m4p8.payload[..60])));
    let (at, p) = data(&capture, LONG_RESPONSE, 9);
    injections.push((at, retransmit(&p, 30, 170, b"")));

    let mut capture = capture;
    for (at, packet) in injections.into_iter().rev() {
        capture.packets.insert(at + 1, packet);
    }
    capture
}

/// The baseline with two segments lost and two shortened:
///
/// - the request is missing its first 20 bytes,
/// - part 1 of the first response is missing its last 30 bytes, and
/// - parts 4 and 8 of the long response never arrive.
#[must_use]
pub fn with_losses() -> Capture {
    let mut capture = baseline();

    let (at, request) = data(&capture, 0, 0);
    capture.packets[at] = retransmit(&request, 20, request.payload.len() - 20, b"");
    capture.packets[at].tag = request.tag;

    let (at, part) = data(&capture, 1, 1);
    capture.packets[at].payload.truncate(part.payload.len() - 30);

    for part in [8, 4] {
        let (at, _) = data(&capture, LONG_RESPONSE, part);
        capture.packets.remove(at);
    }
    capture
}

/// Bytes `side` delivers for [`with_losses`], gaps omitted.
#[must_use]
pub fn expected_stream_with_losses(side: Side) -> Vec<u8> {
    match side {
        Side::Zero => {
            let mut stream = message(0)[20..].to_vec();
            stream.extend(message(2));
            stream
        }
        Side::One => {
            let mut stream = message(1);
            stream.drain(2 * SEGMENT_SIZE - 30..2 * SEGMENT_SIZE);
            let long = message(LONG_RESPONSE);
            for (part, chunk) in long.chunks(SEGMENT_SIZE).enumerate() {
                if part != 4 && part != 8 {
                    stream.extend_from_slice(chunk);
                }
            }
            stream
        }
    }
}

/// The baseline with the last twelve segments of the long response
/// delivered in reverse order.
#[must_use]
pub fn with_reordered_tail() -> Capture {
    let mut capture = baseline();
    let positions: Vec<usize> = capture.positions(LONG_RESPONSE).into_iter().skip(1).collect();
    let reversed: Vec<Packet> = positions.iter().rev().map(|&at| capture.packets[at].clone()).collect();
    for (at, packet) in positions.into_iter().zip(reversed) {
        capture.packets[at] = packet;
    }
    capture
}

/// Part of the long response lost in [`with_reordered_tail_and_loss`].
pub const LOST_TAIL_PART: usize = 6;

/// [`with_reordered_tail`] with one segment of the reversed tail lost.
#[must_use]
pub fn with_reordered_tail_and_loss() -> Capture {
    let mut capture = with_reordered_tail();
    let (at, _) = data(&capture, LONG_RESPONSE, LOST_TAIL_PART);
    capture.packets.remove(at);
    capture
}

/// Bytes `side` delivers when one data segment never arrives.
#[must_use]
pub fn expected_stream_missing(side: Side, message_index: usize, part: usize) -> Vec<u8> {
    MESSAGES
        .iter()
        .enumerate()
        .filter(|(_, (sender, _))| *sender == side)
        .flat_map(|(index, _)| {
            let bytes = message(index);
            bytes
                .chunks(SEGMENT_SIZE)
                .enumerate()
                .filter(|&(chunk, _)| index != message_index || chunk != part)
                .flat_map(|(_, chunk)| chunk.to_vec())
                .collect::<Vec<u8>>()
        })
        .collect()
}

fn append(capture: &mut Capture, side: Side, seq: u32, flags: TcpFlags) {
    let (src, dst) = match side {
        Side::Zero => (capture.client, capture.server),
        Side::One => (capture.server, capture.client),
    };
    let clock = capture
        .packets
        .last()
        .map_or_else(epoch, |packet| packet.timestamp + STEP);
    capture
        .packets
        .push(PacketBuilder::new(src, dst, clock).seq(seq).flags(flags).build());
}

fn next_seq(capture: &Capture, sender: Endpoint) -> u32 {
    capture
        .packets
        .iter()
        .filter(|packet| packet.src == sender)
        .map(Packet::end_seq)
        .max()
        .unwrap_or(0)
}

/// The baseline followed by a FIN from each side and a final ACK.
#[must_use]
pub fn with_fin_close() -> Capture {
    let mut capture = baseline();
    let server_next = next_seq(&capture, capture.server);
    let client_next = next_seq(&capture, capture.client);
    append(&mut capture, Side::One, server_next, TcpFlags::FIN_ACK);
    append(&mut capture, Side::Zero, client_next, TcpFlags::FIN_ACK);
    append(&mut capture, Side::One, server_next.wrapping_add(1), TcpFlags::ACK);
    capture
}

/// The baseline with FIN set on the last data segment, answered by a FIN
/// from the client.
#[must_use]
pub fn with_fin_on_last_data() -> Capture {
    let mut capture = baseline();
    let (at, _) = data(&capture, LONG_RESPONSE, 12);
    capture.packets[at].flags = TcpFlags::FIN_ACK;
    capture.packets.truncate(at + 1);
    let client_next = next_seq(&capture, capture.client);
    append(&mut capture, Side::Zero, client_next, TcpFlags::FIN_ACK);
    capture
}

/// The baseline followed by a single RST from the client.
#[must_use]
pub fn with_reset() -> Capture {
    let mut capture = baseline();
    let client_next = next_seq(&capture, capture.client);
    append(&mut capture, Side::Zero, client_next, TcpFlags::RST);
    capture
}

/// The baseline with every data segment claiming 1000 more payload bytes
/// than were captured.
#[must_use]
pub fn with_inflated_lengths() -> Capture {
    let mut capture = baseline();
    for packet in capture.packets.iter_mut().filter(|p| p.is_data()) {
        packet.claimed_len = Some(packet.payload.len() + 1000);
    }
    capture
}

/// The baseline shifted so both directions cross `u32::MAX` mid-stream:
/// the client inside the first request, the server inside the long
/// response.
#[must_use]
pub fn across_wraparound() -> Capture {
    let first_response = u32::try_from(MESSAGES[1].1).unwrap_or(u32::MAX);
    let client_isn = u32::MAX - 60;
    let server_isn = 0_u32.wrapping_sub(1 + first_response + 1500);
    baseline().shift_sequences(
        client_isn.wrapping_sub(CLIENT_ISN),
        server_isn.wrapping_sub(SERVER_ISN),
    )
}
