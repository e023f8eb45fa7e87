//! Outcome and counters reported by the side assembler.

use bytes::Bytes;

/// Result of feeding one segment payload into a [`SideAssembler`].
///
/// [`SideAssembler`]: crate::assembler::SideAssembler
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The segment carried no payload.
    NoData,
    /// Every byte of the segment was already delivered or buffered.
    Duplicate,
    /// The segment lies beyond a gap and was buffered.
    Buffered,
    /// A buffered segment would exceed the side's pending budget and was
    /// dropped.
    OverBudget,
    /// One or more contiguous chunks became deliverable, in sequence order.
    Delivered(Vec<Bytes>),
}

impl Delivery {
    /// Chunks ready for the caller, empty unless [`Delivery::Delivered`].
    #[must_use]
    pub fn chunks(&self) -> &[Bytes] {
        match self {
            Self::Delivered(chunks) => chunks,
            _ => &[],
        }
    }

    /// Whether the segment contributed bytes the side had not seen before.
    #[must_use]
    pub const fn accepted_new_bytes(&self) -> bool {
        matches!(self, Self::Buffered | Self::Delivered(_))
    }
}

/// Running counters for one side of a connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SideStats {
    /// Chunks handed to the caller.
    pub delivered_chunks: u64,
    /// Bytes handed to the caller.
    pub delivered_bytes: u64,
    /// Segments suppressed because every byte was already seen.
    pub duplicate_segments: u64,
    /// Overlapping bytes trimmed from partially new segments.
    pub trimmed_bytes: u64,
    /// Segments buffered behind a gap.
    pub out_of_order_segments: u64,
    /// Bytes never received and skipped over by a flush.
    pub skipped_bytes: u64,
    /// Buffered bytes discarded without delivery.
    pub abandoned_bytes: u64,
    /// Segments dropped by the pending budget.
    pub over_budget_segments: u64,
}
