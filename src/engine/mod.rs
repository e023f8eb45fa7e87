//! The reassembly coordinator.
//!
//! [`ReassemblyEngine`] accepts parsed segments one at a time, routes each to
//! its connection and side, runs the side assembler, and reports delivered
//! chunks and lifecycle changes to a [`StreamObserver`]. Every call completes
//! synchronously, events included, before it returns. Idle eviction is
//! cooperative: it runs at the start of each `reassemble` call and never in
//! the background.

mod status;

use std::time::{Instant, SystemTime};

use bytes::Bytes;
use log::{debug, info, warn};

pub use status::{CloseOutcome, ReassemblyStatus};

use crate::{
    assembler::{Delivery, SideStats},
    config::ReassemblyConfig,
    connection::{ConnectionRecord, ConnectionState, ConnectionTable, Routed},
    flow::{ConnectionEndReason, ConnectionMetadata, FlowKey, Side},
    hooks::{StreamObserver, TcpStreamData},
    metrics,
    segment::TcpSegment,
};

/// Stateful TCP stream reassembler for many concurrent connections.
///
/// Dropping the engine force-closes every connection that is still open, so
/// observers always see a matching end event for each start event.
///
/// # Examples
///
/// ```
/// use std::time::SystemTime;
///
/// use tcpstitch::{
///     Endpoint,
///     ReassemblyEngine,
///     ReassemblyStatus,
///     SeqNum,
///     StreamHooks,
///     TcpFlags,
///     TcpSegment,
/// };
///
/// let client = Endpoint::new([10, 0, 0, 1].into(), 51000);
/// let server = Endpoint::new([10, 0, 0, 2].into(), 80);
/// let now = SystemTime::now();
///
/// let mut stream = Vec::new();
/// {
///     let hooks = StreamHooks::new().on_message_ready(|chunk| stream.extend_from_slice(chunk.data()));
///     let mut engine = ReassemblyEngine::new(hooks);
///     let later = TcpSegment::new(client, server, SeqNum::new(6), TcpFlags::ACK, b"world", now);
///     let first = TcpSegment::new(client, server, SeqNum::new(1), TcpFlags::ACK, b"hello", now);
///     assert_eq!(engine.reassemble(&later), ReassemblyStatus::MessageHandled);
///     assert_eq!(engine.reassemble(&first), ReassemblyStatus::MessageHandled);
/// }
/// assert_eq!(stream, b"helloworld");
/// ```
#[derive(Debug)]
pub struct ReassemblyEngine<O: StreamObserver> {
    config: ReassemblyConfig,
    table: ConnectionTable,
    observer: O,
}

impl<O: StreamObserver> ReassemblyEngine<O> {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new(observer: O) -> Self { Self::with_config(observer, ReassemblyConfig::default()) }

    /// Create an engine with an explicit configuration.
    #[must_use]
    pub fn with_config(observer: O, config: ReassemblyConfig) -> Self {
        Self {
            config,
            table: ConnectionTable::new(config.max_pending_bytes_per_side),
            observer,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ReassemblyConfig { &self.config }

    /// The observer receiving events.
    #[must_use]
    pub const fn observer(&self) -> &O { &self.observer }

    /// Mutable access to the observer.
    pub fn observer_mut(&mut self) -> &mut O { &mut self.observer }

    /// Process one segment.
    pub fn reassemble(&mut self, segment: &TcpSegment<'_>) -> ReassemblyStatus {
        self.reassemble_at(segment, Instant::now())
    }

    /// Process one segment using an explicit clock reading.
    ///
    /// The idle sweep runs first when enabled, so a flow that has itself
    /// expired is ended as timed out and `segment` then opens a fresh record.
    pub fn reassemble_at(&mut self, segment: &TcpSegment<'_>, now: Instant) -> ReassemblyStatus {
        if self.config.idle_eviction.enabled {
            self.evict_idle_at(now);
        }

        let key = FlowKey::of(segment);
        let status = if self.table.state(&key) == ConnectionState::Closed {
            tracing::trace!(flow = %key, seq = %segment.seq, "ignoring segment for ended connection");
            ReassemblyStatus::IgnoredClosedFlow
        } else {
            let routed = self.table.route(segment, now);
            self.process(routed, segment)
        };
        metrics::inc_segments(status);
        status
    }

    /// Close one connection on the caller's behalf.
    ///
    /// Pending data is flushed or abandoned per
    /// [`ReassemblyConfig::flush_on_close`] and the end event fires with
    /// [`ConnectionEndReason::ClosedManually`]. The record stays in the table,
    /// rejecting further segments, until purged or swept.
    pub fn close_connection(&mut self, key: &FlowKey) -> CloseOutcome {
        let flush = self.config.flush_on_close;
        match self.table.get_mut(key) {
            None => CloseOutcome::UnknownFlow,
            Some(record) if !record.is_open() => CloseOutcome::AlreadyClosed,
            Some(record) => {
                let at = record.last_capture();
                finish(&mut self.observer, record, ConnectionEndReason::ClosedManually, at, flush);
                CloseOutcome::Closed
            }
        }
    }

    /// Close every open connection. Returns how many were closed.
    pub fn close_all_connections(&mut self) -> usize {
        self.table
            .open_keys()
            .iter()
            .filter(|key| self.close_connection(key) == CloseOutcome::Closed)
            .count()
    }

    /// Remove ended connections, oldest activity first.
    ///
    /// `None` removes every ended connection; `Some(n)` at most `n`. Returns
    /// the number removed. Open connections are never touched.
    pub fn purge_closed_connections(&mut self, max: Option<usize>) -> usize {
        let purged = self.table.purge_closed(max);
        if purged > 0 {
            debug!("purged closed connections: count={purged}, remaining={}", self.table.len());
        }
        purged
    }

    /// Run the idle sweep now, regardless of whether it is enabled.
    pub fn evict_idle(&mut self) -> usize { self.evict_idle_at(Instant::now()) }

    /// Run the idle sweep using an explicit clock reading.
    ///
    /// Reclaims at most `max_evictions_per_call` records whose last activity
    /// is at least `idle_timeout` old, oldest first. Open records end as
    /// [`ConnectionEndReason::TimedOut`]; already-ended records are dropped
    /// without a second end event. Returns the number of records removed.
    pub fn evict_idle_at(&mut self, now: Instant) -> usize {
        let policy = self.config.idle_eviction;
        let flush = self.config.flush_on_close;
        let reclaimed =
            self.table
                .take_idle(now, policy.idle_timeout, policy.max_evictions_per_call);
        let count = reclaimed.len();
        for mut record in reclaimed {
            if record.is_open() {
                let at = record.last_capture();
                debug!("connection idle: flow={}", record.metadata().flow_key());
                finish(&mut self.observer, &mut record, ConnectionEndReason::TimedOut, at, flush);
            } else {
                tracing::trace!(flow = %record.metadata().flow_key(), "reclaimed ended connection");
            }
        }
        count
    }

    /// Metadata of every tracked connection, ordered by start time.
    #[must_use]
    pub fn connection_information(&self) -> Vec<ConnectionMetadata> { self.table.snapshot() }

    /// Whether `key` names an open, ended or unknown connection.
    #[must_use]
    pub fn is_connection_open(&self, key: &FlowKey) -> ConnectionState { self.table.state(key) }

    /// Read-only view of one tracked connection.
    #[must_use]
    pub fn connection(&self, key: &FlowKey) -> Option<&ConnectionRecord> { self.table.get(key) }

    /// Counters for one side of a tracked connection.
    #[must_use]
    pub fn side_stats(&self, key: &FlowKey, side: Side) -> Option<SideStats> {
        self.table.get(key).map(|record| record.side(side).stats())
    }

    /// Number of records held, open and ended.
    #[must_use]
    pub fn connection_count(&self) -> usize { self.table.len() }

    fn process(&mut self, routed: Routed, segment: &TcpSegment<'_>) -> ReassemblyStatus {
        let Routed { key, side, created } = routed;
        let Some(record) = self.table.get_mut(&key) else {
            return ReassemblyStatus::IgnoredNoData;
        };
        let observer = &mut self.observer;
        let at = segment.timestamp;

        if created {
            info!("connection started: flow={key}, src={}", record.metadata().src());
            observer.on_connection_start(record.metadata());
        }

        let mut accepted = false;
        if segment.has_payload() {
            let previous = record.note_data_from(side);
            if let Some(previous) = previous.filter(|_| self.config.flush_on_direction_change) {
                flush_side(observer, record, previous, at);
            }
            let delivery = record.side_mut(side).accept(segment.seq, segment.payload);
            if delivery == Delivery::OverBudget {
                warn!(
                    "pending budget exceeded, dropping segment: flow={key}, side={side}, seq={}, \
                     len={}",
                    segment.seq,
                    segment.payload.len()
                );
            }
            accepted = delivery.accepted_new_bytes();
            emit(observer, record, side, delivery.chunks(), at);
        }

        let flags = segment.flags;
        if flags.closes() {
            record.side_mut(side).close();
            if flags.fin && self.config.flush_on_close {
                flush_side(observer, record, side, at);
            }
            if flags.rst || record.both_sides_closed() {
                finish(
                    observer,
                    record,
                    ConnectionEndReason::ClosedByFlags,
                    at,
                    self.config.flush_on_close,
                );
            }
        }

        match (accepted, flags.closes()) {
            (true, _) => ReassemblyStatus::MessageHandled,
            (false, true) => ReassemblyStatus::FinOrRstNoData,
            (false, false) => ReassemblyStatus::IgnoredNoData,
        }
    }
}

impl<O: StreamObserver> Drop for ReassemblyEngine<O> {
    fn drop(&mut self) {
        let closed = self.close_all_connections();
        if closed > 0 {
            debug!("engine dropped, closed open connections: count={closed}");
        }
    }
}

fn emit<O: StreamObserver>(
    observer: &mut O,
    record: &ConnectionRecord,
    side: Side,
    chunks: &[Bytes],
    at: SystemTime,
) {
    for chunk in chunks {
        metrics::add_bytes_delivered(chunk.len());
        observer.on_message_ready(&TcpStreamData::new(record.metadata(), side, chunk, at));
    }
}

fn flush_side<O: StreamObserver>(
    observer: &mut O,
    record: &mut ConnectionRecord,
    side: Side,
    at: SystemTime,
) {
    let chunks = record.side_mut(side).flush();
    emit(observer, record, side, &chunks, at);
}

/// End an open record: flush or abandon both sides, then fire the end event.
fn finish<O: StreamObserver>(
    observer: &mut O,
    record: &mut ConnectionRecord,
    reason: ConnectionEndReason,
    at: SystemTime,
    flush: bool,
) {
    if !record.is_open() {
        return;
    }
    for side in Side::BOTH {
        if flush {
            flush_side(observer, record, side, at);
        } else {
            let dropped = record.side_mut(side).abandon();
            if dropped > 0 {
                debug!(
                    "abandoned pending data: flow={}, side={side}, bytes={dropped}",
                    record.metadata().flow_key()
                );
            }
        }
    }
    if record.end(reason, at) {
        info!("connection ended: flow={}, reason={reason}", record.metadata().flow_key());
        metrics::inc_connections_ended(reason);
        observer.on_connection_end(record.metadata(), reason);
    }
}
