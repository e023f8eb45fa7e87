//! Wrapping 32-bit TCP sequence numbers.
//!
//! [`SeqNum`] never exposes a total order: two sequence numbers are compared
//! through their signed distance, so values on either side of the `u32`
//! boundary still order correctly as long as they lie within 2^31 of each
//! other.

use derive_more::{Display, From, Into};
use serde::Serialize;

/// A position in one direction's TCP sequence space.
///
/// # Examples
///
/// ```
/// use tcpstitch::SeqNum;
/// let late = SeqNum::new(0xFFFF_FFF0);
/// let early = SeqNum::new(0x0000_0010);
/// assert!(late.is_before(early));
/// assert_eq!(late.distance_to(early), 0x20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Into, Serialize)]
#[display("{_0}")]
pub struct SeqNum(u32);

impl SeqNum {
    /// Wrap a raw header value.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the raw header value.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Advance by `len` bytes modulo 2^32.
    ///
    /// Lengths beyond `u32::MAX` are truncated, which is the same wrap the
    /// wire format applies.
    #[must_use]
    pub const fn wrapping_add(self, len: usize) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "sequence arithmetic is defined modulo 2^32"
        )]
        let len = len as u32;
        Self(self.0.wrapping_add(len))
    }

    /// Signed number of bytes from `self` forward to `other`.
    ///
    /// Negative when `other` lies before `self`.
    #[must_use]
    pub const fn distance_to(self, other: Self) -> i32 {
        #[expect(
            clippy::cast_possible_wrap,
            reason = "reinterpreting the wrapped difference as signed is the comparison rule"
        )]
        let distance = other.0.wrapping_sub(self.0) as i32;
        distance
    }

    /// Whether `self` precedes `other` in sequence space.
    #[must_use]
    pub const fn is_before(self, other: Self) -> bool { self.distance_to(other) > 0 }

    /// Whether `self` follows `other` in sequence space.
    #[must_use]
    pub const fn is_after(self, other: Self) -> bool { self.distance_to(other) < 0 }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::SeqNum;

    #[rstest]
    #[case(0xFFFF_FFF0, 0x0000_0010, true)]
    #[case(0x0000_0010, 0xFFFF_FFF0, false)]
    #[case(100, 200, true)]
    #[case(200, 100, false)]
    #[case(7, 7, false)]
    fn orders_across_the_boundary(#[case] a: u32, #[case] b: u32, #[case] before: bool) {
        assert_eq!(SeqNum::new(a).is_before(SeqNum::new(b)), before);
        if a != b {
            assert_eq!(SeqNum::new(b).is_after(SeqNum::new(a)), before);
        }
    }

    #[test]
    fn wrapping_add_crosses_zero() {
        let seq = SeqNum::new(u32::MAX - 1).wrapping_add(5);
        assert_eq!(seq, SeqNum::new(3));
    }

    #[test]
    fn distance_is_signed() {
        let base = SeqNum::new(10);
        assert_eq!(base.distance_to(SeqNum::new(4)), -6);
        assert_eq!(base.distance_to(SeqNum::new(u32::MAX)), -11);
    }
}
