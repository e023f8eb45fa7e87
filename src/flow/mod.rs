//! Connection identity and per-connection metadata.
//!
//! A [`FlowKey`] names one bidirectional TCP exchange regardless of which
//! endpoint sent a given segment. [`Side`] names one of its two directions,
//! and [`ConnectionMetadata`] is the read-only description handed to
//! observers.

pub mod key;
pub mod metadata;

pub use key::{Endpoint, FlowKey, IPPROTO_TCP, Side};
pub use metadata::{ConnectionEndReason, ConnectionMetadata};

#[cfg(test)]
mod tests;
