//! Lifecycle status and per-connection state.

use std::{
    num::NonZeroUsize,
    time::{Instant, SystemTime},
};

use serde::Serialize;

use crate::{
    assembler::SideAssembler,
    flow::{ConnectionEndReason, ConnectionMetadata, Side},
};

/// Lifecycle status of a tracked connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionStatus {
    /// Segments are still processed.
    Active,
    /// Both sides sent FIN, or either side sent RST.
    ClosedByFlags,
    /// Closed by the caller or on engine teardown.
    ClosedManually,
    /// Reclaimed by the idle-eviction sweep.
    TimedOut,
}

impl ConnectionStatus {
    /// Whether segments for the connection are still processed.
    #[must_use]
    pub const fn is_open(self) -> bool { matches!(self, Self::Active) }

    /// Reason reported to observers, `None` while active.
    #[must_use]
    pub const fn end_reason(self) -> Option<ConnectionEndReason> {
        match self {
            Self::Active => None,
            Self::ClosedByFlags => Some(ConnectionEndReason::ClosedByFlags),
            Self::ClosedManually => Some(ConnectionEndReason::ClosedManually),
            Self::TimedOut => Some(ConnectionEndReason::TimedOut),
        }
    }
}

impl From<ConnectionEndReason> for ConnectionStatus {
    fn from(reason: ConnectionEndReason) -> Self {
        match reason {
            ConnectionEndReason::ClosedByFlags => Self::ClosedByFlags,
            ConnectionEndReason::ClosedManually => Self::ClosedManually,
            ConnectionEndReason::TimedOut => Self::TimedOut,
        }
    }
}

/// Answer to "is this connection open?".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    /// The connection is tracked and active.
    Open,
    /// The connection is tracked but has ended.
    Closed,
    /// No record exists for the flow.
    Unknown,
}

/// State of one tracked connection.
#[derive(Debug)]
pub struct ConnectionRecord {
    metadata: ConnectionMetadata,
    sides: [SideAssembler; 2],
    status: ConnectionStatus,
    last_activity: Instant,
    last_capture: SystemTime,
    last_data_side: Option<Side>,
}

impl ConnectionRecord {
    pub(crate) fn new(
        metadata: ConnectionMetadata,
        pending_budget: Option<NonZeroUsize>,
        now: Instant,
    ) -> Self {
        let last_capture = metadata.start_time();
        Self {
            metadata,
            sides: [
                SideAssembler::with_pending_budget(pending_budget),
                SideAssembler::with_pending_budget(pending_budget),
            ],
            status: ConnectionStatus::Active,
            last_activity: now,
            last_capture,
            last_data_side: None,
        }
    }

    /// Addresses, ports and timestamps.
    #[must_use]
    pub const fn metadata(&self) -> &ConnectionMetadata { &self.metadata }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ConnectionStatus { self.status }

    /// Whether segments are still processed.
    #[must_use]
    pub const fn is_open(&self) -> bool { self.status.is_open() }

    /// Assembler for one direction.
    #[must_use]
    pub const fn side(&self, side: Side) -> &SideAssembler { &self.sides[side.index()] }

    /// Monotonic time of the last segment routed to the connection.
    #[must_use]
    pub const fn last_activity(&self) -> Instant { self.last_activity }

    /// Capture time of the last segment routed to the connection.
    #[must_use]
    pub const fn last_capture(&self) -> SystemTime { self.last_capture }

    /// Side that sent the most recent payload-bearing segment.
    #[must_use]
    pub const fn last_data_side(&self) -> Option<Side> { self.last_data_side }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut SideAssembler {
        &mut self.sides[side.index()]
    }

    pub(crate) fn set_last_activity(&mut self, now: Instant, capture: SystemTime) {
        self.last_activity = now;
        self.last_capture = self.last_capture.max(capture);
    }

    /// Record that `side` sent payload and return the side that sent the
    /// previous payload, if it differs.
    pub(crate) fn note_data_from(&mut self, side: Side) -> Option<Side> {
        self.last_data_side
            .replace(side)
            .filter(|&previous| previous != side)
    }

    pub(crate) fn both_sides_closed(&self) -> bool { self.sides.iter().all(SideAssembler::is_closed) }

    /// Move to a terminal status, stamping the end time.
    ///
    /// Returns `false` when the record had already ended.
    pub(crate) fn end(&mut self, reason: ConnectionEndReason, at: SystemTime) -> bool {
        if !self.is_open() {
            return false;
        }
        self.status = reason.into();
        self.metadata.set_end_time(at);
        true
    }
}
