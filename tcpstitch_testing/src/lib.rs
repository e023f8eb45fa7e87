//! Utilities for driving a [`ReassemblyEngine`](tcpstitch::ReassemblyEngine)
//! with synthetic captures during tests.
//!
//! [`Packet`] owns the bytes a [`TcpSegment`](tcpstitch::TcpSegment) borrows,
//! [`RecordingObserver`] keeps every event the engine emits, and the
//! [`scenario`] module builds a small HTTP-like capture plus the damaged
//! variants used by the integration tests.
//!
//! ```rust
//! use tcpstitch::ReassemblyEngine;
//! use tcpstitch_testing::{RecordingObserver, scenario};
//!
//! let capture = scenario::baseline();
//! let mut recorder = RecordingObserver::default();
//! let mut engine = ReassemblyEngine::new(&mut recorder);
//! capture.replay(&mut engine);
//! drop(engine);
//! assert_eq!(recorder.data_events(), 19);
//! ```

pub mod logging;
pub mod metrics;
pub mod observer;
pub mod packet;
pub mod scenario;

pub use logging::{LoggerHandle, logger};
pub use observer::{FlowRecording, RecordingObserver};
pub use packet::{Capture, DataTag, Packet, PacketBuilder};

/// Result type used by fallible integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
