#![doc(html_root_url = "https://docs.rs/tcpstitch/latest")]
//! Public API for the `tcpstitch` library.
//!
//! This crate reconstructs ordered application byte streams from captured
//! TCP segments that may arrive out of order, be retransmitted, overlap or
//! go missing. Callers parse packets themselves and feed each one to a
//! [`ReassemblyEngine`], which tracks every connection in both directions and
//! reports contiguous data and lifecycle changes to a [`StreamObserver`].

pub mod assembler;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod flow;
pub mod hooks;
pub mod metrics;
pub mod segment;
pub mod sequence;

#[cfg(test)]
mod test_helpers;

pub use assembler::{Delivery, SideAssembler, SideStats};
pub use config::{IdleEvictionPolicy, ReassemblyConfig};
pub use connection::{ConnectionRecord, ConnectionState, ConnectionStatus};
pub use engine::{CloseOutcome, ReassemblyEngine, ReassemblyStatus};
pub use error::ConfigError;
pub use flow::{ConnectionEndReason, ConnectionMetadata, Endpoint, FlowKey, Side};
pub use hooks::{StreamHooks, StreamObserver, TcpStreamData};
pub use segment::{TcpFlags, TcpSegment};
pub use sequence::SeqNum;
