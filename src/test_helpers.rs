#![cfg(test)]
//! Test-only helpers shared by unit tests.

use std::{
    net::{IpAddr, Ipv4Addr},
    time::{Duration, SystemTime},
};

use crate::{
    flow::{ConnectionEndReason, ConnectionMetadata, Endpoint, FlowKey, Side},
    hooks::{StreamObserver, TcpStreamData},
    segment::{TcpFlags, TcpSegment},
    sequence::SeqNum,
};

/// Client endpoint used throughout the unit tests.
pub const CLIENT: Endpoint = Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 51000);
/// Server endpoint used throughout the unit tests.
pub const SERVER: Endpoint = Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80);

/// Capture time `secs` seconds after a fixed epoch.
pub fn at(secs: u64) -> SystemTime { SystemTime::UNIX_EPOCH + Duration::from_secs(1_491_516_000 + secs) }

/// ACK segment carrying `payload`.
pub fn segment<'a>(
    src: Endpoint,
    dst: Endpoint,
    seq: u32,
    payload: &'a [u8],
    at: SystemTime,
) -> TcpSegment<'a> {
    flagged(src, dst, seq, TcpFlags::ACK, payload, at)
}

/// Segment with explicit flags.
pub fn flagged<'a>(
    src: Endpoint,
    dst: Endpoint,
    seq: u32,
    flags: TcpFlags,
    payload: &'a [u8],
    at: SystemTime,
) -> TcpSegment<'a> {
    TcpSegment::new(src, dst, SeqNum::new(seq), flags, payload, at)
}

/// Observer that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct Recorder {
    pub chunks: Vec<(FlowKey, Side, Vec<u8>)>,
    pub started: Vec<ConnectionMetadata>,
    pub ended: Vec<(ConnectionMetadata, ConnectionEndReason)>,
}

impl Recorder {
    /// Concatenated bytes delivered on `side` of `key`.
    pub fn stream(&self, key: FlowKey, side: Side) -> Vec<u8> {
        self.chunks
            .iter()
            .filter(|(k, s, _)| *k == key && *s == side)
            .flat_map(|(_, _, data)| data.iter().copied())
            .collect()
    }
}

impl StreamObserver for Recorder {
    fn on_message_ready(&mut self, chunk: &TcpStreamData<'_>) {
        self.chunks
            .push((chunk.metadata().flow_key(), chunk.side(), chunk.data().to_vec()));
    }

    fn on_connection_start(&mut self, metadata: &ConnectionMetadata) {
        self.started.push(metadata.clone());
    }

    fn on_connection_end(&mut self, metadata: &ConnectionMetadata, reason: ConnectionEndReason) {
        self.ended.push((metadata.clone(), reason));
    }
}
