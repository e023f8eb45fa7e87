//! Sequence tracking, overlap trimming and out-of-order buffering for one
//! direction of a connection.

use std::{collections::BTreeMap, num::NonZeroUsize};

use bytes::Bytes;
use log::debug;

use super::{Delivery, SideStats};
use crate::sequence::SeqNum;

/// Reassembly state for one direction of one connection.
///
/// The side starts unanchored and takes its origin from the first segment
/// that carries payload, so a capture missing the handshake still
/// reassembles.
///
/// # Examples
///
/// ```
/// use tcpstitch::{Delivery, SeqNum, SideAssembler};
///
/// let mut side = SideAssembler::new();
/// assert_eq!(side.accept(SeqNum::new(100), b"hello"), Delivery::Delivered(vec!["hello".into()]));
/// // Ahead of a gap: held back.
/// assert_eq!(side.accept(SeqNum::new(110), b"world"), Delivery::Buffered);
/// // Filling the gap releases both chunks in order.
/// let filled = side.accept(SeqNum::new(105), b", wor");
/// assert_eq!(filled.chunks(), [", wor", "world"]);
/// // A pure retransmission is suppressed.
/// assert_eq!(side.accept(SeqNum::new(100), b"hello"), Delivery::Duplicate);
/// ```
#[derive(Debug, Default)]
pub struct SideAssembler {
    origin: Option<SeqNum>,
    next_offset: i64,
    highest_offset: i64,
    pending: BTreeMap<i64, Bytes>,
    pending_bytes: usize,
    pending_budget: Option<NonZeroUsize>,
    closed: bool,
    stats: SideStats,
}

impl SideAssembler {
    /// Create an empty side with no pending budget.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Create an empty side that holds at most `budget` out-of-order bytes.
    #[must_use]
    pub fn with_pending_budget(budget: Option<NonZeroUsize>) -> Self {
        Self {
            pending_budget: budget,
            ..Self::default()
        }
    }

    /// Feed one segment payload starting at `seq`.
    ///
    /// Bytes at or before the delivery cursor are trimmed; a segment with no
    /// new bytes is reported as [`Delivery::Duplicate`]. A segment that starts
    /// at the cursor is delivered together with any buffered segments it makes
    /// contiguous. A segment beyond a gap is buffered.
    pub fn accept(&mut self, seq: SeqNum, payload: &[u8]) -> Delivery {
        if payload.is_empty() {
            return Delivery::NoData;
        }
        self.origin.get_or_insert(seq);

        let start = self.offset_of(seq);
        let end = start.saturating_add(offset_len(payload.len()));
        if end <= self.next_offset {
            self.stats.duplicate_segments += 1;
            tracing::trace!(%seq, len = payload.len(), "suppressing retransmission");
            return Delivery::Duplicate;
        }

        let (start, payload) = self.trim_delivered(start, payload);
        if start > self.next_offset {
            return self.buffer(start, end, payload);
        }

        let mut chunks = Vec::with_capacity(1 + self.pending.len());
        self.emit(Bytes::copy_from_slice(payload), &mut chunks);
        self.drain_contiguous(&mut chunks);
        Delivery::Delivered(chunks)
    }

    /// Deliver every buffered segment in sequence order, skipping holes.
    ///
    /// Bytes that never arrived are counted in [`SideStats::skipped_bytes`]
    /// and the cursor moves past them. Data is never delivered out of order.
    pub fn flush(&mut self) -> Vec<Bytes> {
        let mut chunks = Vec::with_capacity(self.pending.len());
        while let Some((&start, _)) = self.pending.first_key_value() {
            if start > self.next_offset {
                let hole = start - self.next_offset;
                debug!(
                    "skipping gap: missing_bytes={hole}, at_seq={}",
                    self.next_expected().map_or(0, SeqNum::get)
                );
                self.stats.skipped_bytes += u64::try_from(hole).unwrap_or(u64::MAX);
                self.next_offset = start;
            }
            self.drain_contiguous(&mut chunks);
        }
        chunks
    }

    /// Discard buffered segments without delivering them.
    ///
    /// Returns the number of bytes dropped.
    pub fn abandon(&mut self) -> usize {
        let dropped = self.pending_bytes;
        self.stats.abandoned_bytes += count(dropped);
        self.pending.clear();
        self.pending_bytes = 0;
        dropped
    }

    /// Record that this side sent FIN or RST.
    pub fn close(&mut self) { self.closed = true; }

    /// Whether this side sent FIN or RST.
    #[must_use]
    pub const fn is_closed(&self) -> bool { self.closed }

    /// Sequence number of the next byte to deliver, once anchored.
    #[must_use]
    pub fn next_expected(&self) -> Option<SeqNum> {
        self.origin.map(|origin| seq_at(origin, self.next_offset))
    }

    /// One past the last byte delivered or buffered, once anchored.
    #[must_use]
    pub fn highest_seen(&self) -> Option<SeqNum> {
        self.origin.map(|origin| seq_at(origin, self.highest_offset))
    }

    /// Number of buffered out-of-order segments.
    #[must_use]
    pub fn pending_segments(&self) -> usize { self.pending.len() }

    /// Bytes currently buffered behind gaps.
    #[must_use]
    pub const fn pending_bytes(&self) -> usize { self.pending_bytes }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> SideStats { self.stats }

    fn offset_of(&self, seq: SeqNum) -> i64 {
        self.next_expected().map_or(0, |cursor| {
            self.next_offset + i64::from(cursor.distance_to(seq))
        })
    }

    fn trim_delivered<'p>(&mut self, start: i64, payload: &'p [u8]) -> (i64, &'p [u8]) {
        if start >= self.next_offset {
            return (start, payload);
        }
        let overlap = usize::try_from(self.next_offset - start)
            .unwrap_or(usize::MAX)
            .min(payload.len());
        self.stats.trimmed_bytes += count(overlap);
        (self.next_offset, payload.get(overlap..).unwrap_or_default())
    }

    /// Buffer the part of `[start, end)` no pending range already holds.
    ///
    /// Pending ranges never overlap: the new range is trimmed against its
    /// neighbours and replaces any pending range it fully contains.
    fn buffer(&mut self, start: i64, end: i64, payload: &[u8]) -> Delivery {
        let Some((from, to)) = self.uncovered_span(start, end) else {
            self.stats.duplicate_segments += 1;
            return Delivery::Duplicate;
        };

        let contained: Vec<(i64, usize)> = self
            .pending
            .range(from..to)
            .map(|(&held, data)| (held, data.len()))
            .collect();
        let replaced: usize = contained.iter().map(|&(_, len)| len).sum();
        let kept = payload
            .get(span_index(from - start)..span_index(to - start))
            .unwrap_or_default();
        let needed = self.pending_bytes - replaced + kept.len();
        if self.pending_budget.is_some_and(|budget| needed > budget.get()) {
            self.stats.over_budget_segments += 1;
            return Delivery::OverBudget;
        }

        tracing::trace!(
            offset = from,
            len = kept.len(),
            gap = from - self.next_offset,
            replaced = contained.len(),
            "buffering out-of-order segment"
        );
        for (held, _) in contained {
            self.pending.remove(&held);
        }
        self.pending.insert(from, Bytes::copy_from_slice(kept));
        self.pending_bytes = needed;
        self.highest_offset = self.highest_offset.max(end);
        self.stats.trimmed_bytes += count(payload.len() - kept.len());
        self.stats.out_of_order_segments += 1;
        Delivery::Buffered
    }

    /// The sub-range of `[start, end)` left after trimming against the
    /// pending range before it and the first pending range that runs past
    /// `end`. `None` when pending data already covers all of it.
    fn uncovered_span(&self, start: i64, end: i64) -> Option<(i64, i64)> {
        let from = self
            .pending
            .range(..start)
            .next_back()
            .map_or(start, |(&held, data)| start.max(held + offset_len(data.len())));
        if from >= end {
            return None;
        }
        let to = self
            .pending
            .range(from..end)
            .find(|&(&held, data)| held + offset_len(data.len()) > end)
            .map_or(end, |(&held, _)| held);
        (from < to).then_some((from, to))
    }

    fn drain_contiguous(&mut self, chunks: &mut Vec<Bytes>) {
        while let Some(entry) = self.pending.first_entry() {
            let start = *entry.key();
            if start > self.next_offset {
                break;
            }
            let data = entry.remove();
            self.pending_bytes = self.pending_bytes.saturating_sub(data.len());

            let overlap = usize::try_from(self.next_offset - start).unwrap_or(usize::MAX);
            if overlap >= data.len() {
                self.stats.trimmed_bytes += count(data.len());
                continue;
            }
            self.stats.trimmed_bytes += count(overlap);
            self.emit(data.slice(overlap..), chunks);
        }
    }

    fn emit(&mut self, chunk: Bytes, chunks: &mut Vec<Bytes>) {
        self.next_offset += offset_len(chunk.len());
        self.highest_offset = self.highest_offset.max(self.next_offset);
        self.stats.delivered_chunks += 1;
        self.stats.delivered_bytes += count(chunk.len());
        chunks.push(chunk);
    }
}

fn seq_at(origin: SeqNum, offset: i64) -> SeqNum {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "stream offsets map onto sequence numbers modulo 2^32"
    )]
    let low = offset as u32;
    SeqNum::new(origin.get().wrapping_add(low))
}

fn offset_len(len: usize) -> i64 { i64::try_from(len).unwrap_or(i64::MAX) }

fn span_index(offset: i64) -> usize { usize::try_from(offset).unwrap_or(0) }

fn count(len: usize) -> u64 { u64::try_from(len).unwrap_or(u64::MAX) }
