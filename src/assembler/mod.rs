//! Per-direction stream reassembly.
//!
//! A [`SideAssembler`] owns one direction of one connection. It tracks the
//! next byte it expects to deliver, buffers segments that arrive ahead of a
//! gap, trims retransmitted overlap, and hands back contiguous chunks in
//! sequence order. It never skips a gap on its own; [`SideAssembler::flush`]
//! is the explicit, caller-driven way past a permanent hole.
//!
//! Sequence numbers are translated into signed 64-bit stream offsets relative
//! to the side's first payload byte, so buffered segments can live in an
//! ordered map even when the 32-bit sequence space wraps.

mod delivery;
mod side;

pub use delivery::{Delivery, SideStats};
pub use side::SideAssembler;

#[cfg(test)]
mod tests;
