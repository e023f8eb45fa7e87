//! Flow-keyed storage with an oldest-first activity index.

use std::{
    collections::{BTreeSet, HashMap, hash_map::Entry},
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use log::debug;

use super::{ConnectionRecord, ConnectionState};
use crate::{
    flow::{ConnectionMetadata, FlowKey, Side},
    metrics,
    segment::TcpSegment,
};

/// Where [`ConnectionTable::route`] placed a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Routed {
    pub(crate) key: FlowKey,
    pub(crate) side: Side,
    pub(crate) created: bool,
}

/// Every connection the engine knows about.
///
/// Dropping the table releases its records from the tracked connections
/// gauge.
#[derive(Debug)]
pub(crate) struct ConnectionTable {
    records: HashMap<FlowKey, ConnectionRecord>,
    activity: BTreeSet<(Instant, FlowKey)>,
    pending_budget: Option<NonZeroUsize>,
}

impl ConnectionTable {
    pub(crate) fn new(pending_budget: Option<NonZeroUsize>) -> Self {
        Self {
            records: HashMap::new(),
            activity: BTreeSet::new(),
            pending_budget,
        }
    }

    pub(crate) fn len(&self) -> usize { self.records.len() }

    pub(crate) fn get(&self, key: &FlowKey) -> Option<&ConnectionRecord> { self.records.get(key) }

    pub(crate) fn get_mut(&mut self, key: &FlowKey) -> Option<&mut ConnectionRecord> {
        self.records.get_mut(key)
    }

    pub(crate) fn state(&self, key: &FlowKey) -> ConnectionState {
        match self.records.get(key) {
            Some(record) if record.is_open() => ConnectionState::Open,
            Some(_) => ConnectionState::Closed,
            None => ConnectionState::Unknown,
        }
    }

    /// Find or create the record for `segment` and stamp its activity.
    ///
    /// A new record takes the segment's source as side 0.
    pub(crate) fn route(&mut self, segment: &TcpSegment<'_>, now: Instant) -> Routed {
        let key = FlowKey::of(segment);
        let (side, created, previous) = match self.records.entry(key) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                let previous = record.last_activity();
                record.set_last_activity(now, segment.timestamp);
                (record.metadata().side_of(segment.src()), false, Some(previous))
            }
            Entry::Vacant(entry) => {
                let metadata = ConnectionMetadata::from_first_segment(key, segment);
                debug!("tracking new connection: flow={key}, side0={}", segment.src());
                entry.insert(ConnectionRecord::new(metadata, self.pending_budget, now));
                metrics::inc_connections_tracked();
                (Side::Zero, true, None)
            }
        };
        if let Some(previous) = previous {
            self.activity.remove(&(previous, key));
        }
        self.activity.insert((now, key));
        Routed { key, side, created }
    }

    /// Remove up to `max` records whose last activity is `timeout` or more
    /// before `now`, oldest first.
    pub(crate) fn take_idle(
        &mut self,
        now: Instant,
        timeout: Duration,
        max: NonZeroUsize,
    ) -> Vec<ConnectionRecord> {
        let expired: Vec<FlowKey> = self
            .activity
            .iter()
            .take_while(|(at, _)| now.saturating_duration_since(*at) >= timeout)
            .take(max.get())
            .map(|&(_, key)| key)
            .collect();
        expired.iter().filter_map(|key| self.remove(key)).collect()
    }

    /// Remove up to `max` ended records, oldest activity first.
    ///
    /// Returns the number removed. `None` removes every ended record.
    pub(crate) fn purge_closed(&mut self, max: Option<usize>) -> usize {
        let closed: Vec<FlowKey> = self
            .activity
            .iter()
            .map(|&(_, key)| key)
            .filter(|key| self.records.get(key).is_some_and(|r| !r.is_open()))
            .take(max.unwrap_or(usize::MAX))
            .collect();
        closed.iter().filter_map(|key| self.remove(key)).count()
    }

    pub(crate) fn open_keys(&self) -> Vec<FlowKey> {
        self.activity
            .iter()
            .map(|&(_, key)| key)
            .filter(|key| self.records.get(key).is_some_and(ConnectionRecord::is_open))
            .collect()
    }

    /// Metadata of every tracked record, ordered by start time.
    pub(crate) fn snapshot(&self) -> Vec<ConnectionMetadata> {
        let mut all: Vec<ConnectionMetadata> = self
            .records
            .values()
            .map(|record| record.metadata().clone())
            .collect();
        all.sort_by(|a, b| {
            a.start_time()
                .cmp(&b.start_time())
                .then_with(|| a.flow_key().cmp(&b.flow_key()))
        });
        all
    }

    fn remove(&mut self, key: &FlowKey) -> Option<ConnectionRecord> {
        let record = self.records.remove(key)?;
        self.activity.remove(&(record.last_activity(), *key));
        metrics::dec_connections_tracked();
        Some(record)
    }
}

impl Drop for ConnectionTable {
    fn drop(&mut self) { metrics::release_connections_tracked(self.records.len()); }
}
