//! Unit tests for per-side sequencing, overlap trimming and buffering.

use std::num::NonZeroUsize;

use bytes::Bytes;
use rstest::{fixture, rstest};

use super::{Delivery, SideAssembler};
use crate::sequence::SeqNum;

fn seq(value: u32) -> SeqNum { SeqNum::new(value) }

fn joined(chunks: &[Bytes]) -> Vec<u8> { chunks.iter().flat_map(|c| c.iter().copied()).collect() }

/// Side anchored at 1000 with `"abcdefghij"` (1000..1010) already delivered.
#[fixture]
fn delivered_ten() -> SideAssembler {
    let mut side = SideAssembler::new();
    assert_eq!(side.accept(seq(1000), b"abcdefghij").chunks().len(), 1);
    side
}

#[test]
fn empty_payload_reports_no_data_and_does_not_anchor() {
    let mut side = SideAssembler::new();
    assert_eq!(side.accept(seq(5), b""), Delivery::NoData);
    assert_eq!(side.next_expected(), None);
}

#[test]
fn first_payload_anchors_the_side() {
    let mut side = SideAssembler::new();
    let delivery = side.accept(seq(77), b"xyz");
    assert_eq!(delivery.chunks(), ["xyz"]);
    assert_eq!(side.next_expected(), Some(seq(80)));
    assert_eq!(side.highest_seen(), Some(seq(80)));
}

#[rstest]
#[case::exact(1000, &b"abcdefghij"[..])]
#[case::front_subset(1004, &b"efghij"[..])]
#[case::back_subset(1000, &b"abcd"[..])]
#[case::inner_subset(1002, &b"cde"[..])]
fn already_seen_ranges_are_suppressed(
    mut delivered_ten: SideAssembler,
    #[case] start: u32,
    #[case] payload: &[u8],
) {
    assert_eq!(delivered_ten.accept(seq(start), payload), Delivery::Duplicate);
    assert_eq!(delivered_ten.stats().duplicate_segments, 1);
    assert_eq!(delivered_ten.next_expected(), Some(seq(1010)));
}

#[test]
fn suppression_ignores_byte_content() {
    let mut side = delivered_ten();
    assert_eq!(side.accept(seq(1000), b"ZZZZZZZZZZ"), Delivery::Duplicate);
}

#[rstest]
#[case::superset(1000, &b"abcdefghijKLM"[..], &b"KLM"[..])]
#[case::shifted(1005, &b"fghijKLMNO"[..], &b"KLMNO"[..])]
fn partially_new_segments_deliver_only_the_suffix(
    mut delivered_ten: SideAssembler,
    #[case] start: u32,
    #[case] payload: &[u8],
    #[case] expected: &[u8],
) {
    let delivery = delivered_ten.accept(seq(start), payload);
    assert_eq!(joined(delivery.chunks()), expected);
    assert_eq!(delivered_ten.stats().trimmed_bytes, (payload.len() - expected.len()) as u64);
    assert_eq!(delivered_ten.next_expected(), Some(seq(1010).wrapping_add(expected.len())));
}

#[test]
fn new_tail_is_delivered_once() {
    let mut side = delivered_ten();
    assert_eq!(joined(side.accept(seq(1008), b"ijKL").chunks()), b"KL");
    assert_eq!(side.accept(seq(1008), b"ijKL"), Delivery::Duplicate);
}

#[test]
fn gap_is_buffered_until_filled() {
    let mut side = delivered_ten();
    assert_eq!(side.accept(seq(1020), b"uvwxy"), Delivery::Buffered);
    assert_eq!(side.accept(seq(1015), b"pqrst"), Delivery::Buffered);
    assert_eq!(side.pending_segments(), 2);
    assert_eq!(side.pending_bytes(), 10);
    assert_eq!(side.highest_seen(), Some(seq(1025)));

    let delivery = side.accept(seq(1010), b"klmno");
    assert_eq!(delivery.chunks(), ["klmno", "pqrst", "uvwxy"]);
    assert_eq!(side.pending_segments(), 0);
    assert_eq!(side.next_expected(), Some(seq(1025)));
    assert_eq!(side.stats().delivered_chunks, 4);
}

#[test]
fn gap_filler_below_highest_seen_is_still_new() {
    let mut side = delivered_ten();
    assert_eq!(side.accept(seq(1015), b"pqrst"), Delivery::Buffered);
    // Ends below highest-seen yet covers bytes nobody delivered.
    assert_eq!(side.accept(seq(1010), b"klm").chunks(), ["klm"]);
    assert_eq!(side.accept(seq(1013), b"no").chunks(), ["no", "pqrst"]);
}

#[test]
fn overlapping_buffered_segments_are_trimmed_on_drain() {
    let mut side = delivered_ten();
    assert_eq!(side.accept(seq(1012), b"mnopq"), Delivery::Buffered);
    assert_eq!(side.accept(seq(1015), b"pqrstu"), Delivery::Buffered);
    let delivery = side.accept(seq(1010), b"kl");
    assert_eq!(joined(delivery.chunks()), b"klmnopqrstu");
    assert_eq!(delivery.chunks().len(), 3);
}

#[test]
fn buffered_range_suppresses_contained_retransmission() {
    let mut side = delivered_ten();
    assert_eq!(side.accept(seq(1020), b"0123456789"), Delivery::Buffered);
    assert_eq!(side.accept(seq(1022), b"2345"), Delivery::Duplicate);
    assert_eq!(side.pending_segments(), 1);
}

#[test]
fn segment_inside_a_later_larger_buffered_range_is_duplicate() {
    let mut side = SideAssembler::new();
    side.accept(seq(0), b"aaaa");
    assert_eq!(side.accept(seq(12), b"bbb"), Delivery::Buffered);
    assert_eq!(side.accept(seq(10), &[b'x'; 20]), Delivery::Buffered);
    assert_eq!(side.pending_segments(), 1);
    assert_eq!(side.pending_bytes(), 20);

    assert_eq!(side.accept(seq(16), b"yyyy"), Delivery::Duplicate);
    assert_eq!(side.pending_bytes(), 20);
    assert_eq!(side.stats().out_of_order_segments, 2);
    assert_eq!(side.stats().duplicate_segments, 1);
}

#[test]
fn segment_spanning_buffered_ranges_keeps_only_its_new_bytes() {
    let mut side = delivered_ten();
    assert_eq!(side.accept(seq(1014), b"op"), Delivery::Buffered);
    assert_eq!(side.accept(seq(1020), b"uvwxyz"), Delivery::Buffered);
    // Covers 1014..1016 entirely and runs into 1020..1026.
    assert_eq!(side.accept(seq(1012), b"mnopqrstuv"), Delivery::Buffered);
    assert_eq!(side.pending_segments(), 2);
    assert_eq!(side.pending_bytes(), 14);

    let delivery = side.accept(seq(1010), b"kl");
    assert_eq!(joined(delivery.chunks()), b"klmnopqrstuvwxyz");
    assert_eq!(side.pending_bytes(), 0);
}

#[test]
fn overlapping_retransmissions_do_not_exhaust_the_budget() {
    let mut side = SideAssembler::with_pending_budget(NonZeroUsize::new(8));
    side.accept(seq(0), b"a");
    assert_eq!(side.accept(seq(10), b"0123"), Delivery::Buffered);
    assert_eq!(side.accept(seq(10), b"012345"), Delivery::Buffered);
    assert_eq!(side.accept(seq(12), b"2345"), Delivery::Duplicate);
    assert_eq!(side.pending_bytes(), 6);
    assert_eq!(side.accept(seq(16), b"67"), Delivery::Buffered);
    assert_eq!(side.stats().over_budget_segments, 0);
}

#[test]
fn longer_segment_replaces_shorter_at_same_offset() {
    let mut side = delivered_ten();
    assert_eq!(side.accept(seq(1020), b"01"), Delivery::Buffered);
    assert_eq!(side.accept(seq(1020), b"0123"), Delivery::Buffered);
    assert_eq!(side.pending_segments(), 1);
    assert_eq!(side.pending_bytes(), 4);
}

#[test]
fn flush_skips_holes_in_order() {
    let mut side = delivered_ten();
    side.accept(seq(1030), b"CC");
    side.accept(seq(1020), b"BB");
    let chunks = side.flush();
    assert_eq!(chunks, ["BB", "CC"]);
    assert_eq!(side.stats().skipped_bytes, 18);
    assert_eq!(side.next_expected(), Some(seq(1032)));
    // Late arrival for the hole is now history.
    assert_eq!(side.accept(seq(1010), b"klmno"), Delivery::Duplicate);
}

#[test]
fn abandon_drops_pending_bytes() {
    let mut side = delivered_ten();
    side.accept(seq(1020), b"0123");
    assert_eq!(side.abandon(), 4);
    assert_eq!(side.pending_segments(), 0);
    assert_eq!(side.stats().abandoned_bytes, 4);
    assert!(side.flush().is_empty());
}

#[test]
fn pending_budget_drops_overflow() {
    let mut side = SideAssembler::with_pending_budget(NonZeroUsize::new(4));
    side.accept(seq(0), b"a");
    assert_eq!(side.accept(seq(10), b"abc"), Delivery::Buffered);
    assert_eq!(side.accept(seq(20), b"ab"), Delivery::OverBudget);
    assert_eq!(side.highest_seen(), Some(seq(13)));
    assert_eq!(side.stats().over_budget_segments, 1);
    // The dropped range is not treated as seen.
    assert_eq!(side.accept(seq(20), b"a"), Delivery::Buffered);
}

#[test]
fn sequence_space_wraps() {
    let mut side = SideAssembler::new();
    let start = u32::MAX - 3;
    assert_eq!(side.accept(seq(start), b"wrap").chunks(), ["wrap"]);
    assert_eq!(side.next_expected(), Some(seq(0)));
    assert_eq!(side.accept(seq(6), b"gh"), Delivery::Buffered);
    assert_eq!(side.accept(seq(0), b"abcdef").chunks(), ["abcdef", "gh"]);
    assert_eq!(side.accept(seq(u32::MAX - 1), b"apab"), Delivery::Duplicate);
    assert_eq!(side.next_expected(), Some(seq(8)));
}

#[test]
fn data_before_the_anchor_is_trimmed() {
    let mut side = SideAssembler::new();
    side.accept(seq(500), b"later");
    let delivery = side.accept(seq(495), b"earlylaterMORE");
    assert_eq!(joined(delivery.chunks()), b"MORE");
}

#[test]
fn close_marks_side() {
    let mut side = SideAssembler::new();
    assert!(!side.is_closed());
    side.close();
    assert!(side.is_closed());
}
