//! Tests for flow keys, sides and metadata.

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    time::{Duration, SystemTime},
};

use rstest::rstest;

use super::*;
use crate::test_helpers::segment;

fn v4(last: u8, port: u16) -> Endpoint {
    Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)), port)
}

#[rstest]
#[case(v4(1, 51000), v4(2, 80))]
#[case(v4(2, 80), v4(1, 51000))]
#[case(v4(1, 80), v4(1, 81))]
fn flow_key_ignores_direction(#[case] a: Endpoint, #[case] b: Endpoint) {
    assert_eq!(FlowKey::from_endpoints(a, b), FlowKey::from_endpoints(b, a));
}

#[test]
fn flow_key_distinguishes_ports() {
    let server = v4(2, 80);
    assert_ne!(
        FlowKey::from_endpoints(v4(1, 51000), server),
        FlowKey::from_endpoints(v4(1, 51001), server),
    );
}

#[test]
fn flow_key_distinguishes_protocol() {
    let (a, b) = (v4(1, 53), v4(2, 53));
    assert_ne!(FlowKey::from_endpoints(a, b), FlowKey::with_protocol(17, a, b));
}

#[test]
fn flow_key_display_brackets_ipv6() {
    let a = Endpoint::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 443);
    let b = Endpoint::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 80);
    assert_eq!(FlowKey::from_endpoints(a, b).to_string(), "[::]:80 <-> [::1]:443");
}

#[test]
fn side_opposite_round_trips() {
    for side in Side::BOTH {
        assert_eq!(side.opposite().opposite(), side);
        assert_ne!(side.opposite(), side);
    }
    assert_eq!(Side::One.index(), 1);
}

#[test]
fn metadata_takes_side_zero_from_first_segment() {
    let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_491_516_383);
    let first = segment(v4(1, 51000), v4(2, 80), 100, b"", at);
    let meta = ConnectionMetadata::from_first_segment(FlowKey::of(&first), &first);

    assert_eq!(meta.src(), v4(1, 51000));
    assert_eq!(meta.dst_port(), 80);
    assert_eq!(meta.start_time(), at);
    assert_eq!(meta.end_time(), None);
    assert_eq!(meta.side_of(v4(1, 51000)), Side::Zero);
    assert_eq!(meta.side_of(v4(2, 80)), Side::One);
}
