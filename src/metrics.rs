//! Metric helpers for `tcpstitch`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. Without the
//! `metrics` feature the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::{engine::ReassemblyStatus, flow::ConnectionEndReason};

/// Name of the counter tracking processed segments, labelled by status.
pub const SEGMENTS_TOTAL: &str = "tcpstitch_segments_total";
/// Name of the counter tracking payload bytes handed to observers.
pub const BYTES_DELIVERED: &str = "tcpstitch_bytes_delivered_total";
/// Name of the gauge tracking connection records held in memory.
pub const CONNECTIONS_TRACKED: &str = "tcpstitch_connections_tracked";
/// Name of the counter tracking ended connections, labelled by reason.
pub const CONNECTIONS_ENDED: &str = "tcpstitch_connections_ended_total";

/// Record a processed segment.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "metrics disabled"))]
pub fn inc_segments(status: ReassemblyStatus) {
    #[cfg(feature = "metrics")]
    counter!(SEGMENTS_TOTAL, "status" => status.as_str()).increment(1);
}

/// Record bytes delivered to an observer.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "metrics disabled"))]
pub fn add_bytes_delivered(bytes: usize) {
    #[cfg(feature = "metrics")]
    counter!(BYTES_DELIVERED).increment(u64::try_from(bytes).unwrap_or(u64::MAX));
}

/// Increment the tracked connections gauge.
pub fn inc_connections_tracked() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_TRACKED).increment(1.0);
}

/// Decrement the tracked connections gauge.
pub fn dec_connections_tracked() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_TRACKED).decrement(1.0);
}

/// Decrement the tracked connections gauge by `count` records released at
/// once.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "metrics disabled"))]
pub fn release_connections_tracked(count: usize) {
    #[cfg(feature = "metrics")]
    if count > 0 {
        let released = u32::try_from(count).map_or(f64::from(u32::MAX), f64::from);
        gauge!(CONNECTIONS_TRACKED).decrement(released);
    }
}

/// Record a connection end event.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "metrics disabled"))]
pub fn inc_connections_ended(reason: ConnectionEndReason) {
    #[cfg(feature = "metrics")]
    counter!(CONNECTIONS_ENDED, "reason" => reason.as_str()).increment(1);
}
