//! Event callbacks invoked by the reassembly engine.
//!
//! [`StreamObserver`] is the interface applications implement to receive
//! reassembled data and connection lifecycle events, while [`StreamHooks`]
//! stores optional closures for callers who prefer not to define a type.
//! Every callback runs synchronously inside the engine call that caused it.

use std::{fmt, time::SystemTime};

use bytes::Bytes;

use crate::flow::{ConnectionEndReason, ConnectionMetadata, Side};

/// One contiguous chunk of reassembled payload.
#[derive(Clone, Copy, Debug)]
pub struct TcpStreamData<'a> {
    metadata: &'a ConnectionMetadata,
    side: Side,
    data: &'a Bytes,
    captured_at: SystemTime,
}

impl<'a> TcpStreamData<'a> {
    pub(crate) const fn new(
        metadata: &'a ConnectionMetadata,
        side: Side,
        data: &'a Bytes,
        captured_at: SystemTime,
    ) -> Self {
        Self {
            metadata,
            side,
            data,
            captured_at,
        }
    }

    /// Connection the chunk belongs to.
    #[must_use]
    pub const fn metadata(&self) -> &'a ConnectionMetadata { self.metadata }

    /// Direction the bytes travelled in.
    #[must_use]
    pub const fn side(&self) -> Side { self.side }

    /// The payload bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] { self.data }

    /// The payload as a cheaply clonable buffer.
    #[must_use]
    pub fn bytes(&self) -> Bytes { self.data.clone() }

    /// Capture time of the segment whose arrival released the chunk.
    #[must_use]
    pub const fn captured_at(&self) -> SystemTime { self.captured_at }
}

/// Receiver of reassembly events.
///
/// Only [`on_message_ready`](Self::on_message_ready) is required; the
/// lifecycle callbacks default to doing nothing.
///
/// # Examples
///
/// ```
/// use tcpstitch::{StreamObserver, TcpStreamData};
///
/// #[derive(Default)]
/// struct ByteCounter(usize);
///
/// impl StreamObserver for ByteCounter {
///     fn on_message_ready(&mut self, chunk: &TcpStreamData<'_>) { self.0 += chunk.data().len(); }
/// }
/// ```
pub trait StreamObserver {
    /// Called for every chunk delivered, in sequence order per side.
    fn on_message_ready(&mut self, chunk: &TcpStreamData<'_>);

    /// Called once when a previously unseen flow is first routed.
    fn on_connection_start(&mut self, _metadata: &ConnectionMetadata) {}

    /// Called once when a connection ends, after any final flush.
    fn on_connection_end(&mut self, _metadata: &ConnectionMetadata, _reason: ConnectionEndReason) {
    }
}

impl<O: StreamObserver + ?Sized> StreamObserver for &mut O {
    fn on_message_ready(&mut self, chunk: &TcpStreamData<'_>) { (**self).on_message_ready(chunk); }

    fn on_connection_start(&mut self, metadata: &ConnectionMetadata) {
        (**self).on_connection_start(metadata);
    }

    fn on_connection_end(&mut self, metadata: &ConnectionMetadata, reason: ConnectionEndReason) {
        (**self).on_connection_end(metadata, reason);
    }
}

/// Type alias for the `on_message_ready` callback.
type MessageReadyHook<'h> = Box<dyn FnMut(&TcpStreamData<'_>) + 'h>;

/// Type alias for the `on_connection_start` callback.
type ConnectionStartHook<'h> = Box<dyn FnMut(&ConnectionMetadata) + 'h>;

/// Type alias for the `on_connection_end` callback.
type ConnectionEndHook<'h> = Box<dyn FnMut(&ConnectionMetadata, ConnectionEndReason) + 'h>;

/// Closure-backed [`StreamObserver`].
///
/// ```
/// use tcpstitch::StreamHooks;
///
/// let mut total = 0;
/// let hooks = StreamHooks::new().on_message_ready(|chunk| total += chunk.data().len());
/// drop(hooks);
/// assert_eq!(total, 0);
/// ```
#[derive(Default)]
pub struct StreamHooks<'h> {
    message_ready: Option<MessageReadyHook<'h>>,
    connection_start: Option<ConnectionStartHook<'h>>,
    connection_end: Option<ConnectionEndHook<'h>>,
}

impl<'h> StreamHooks<'h> {
    /// Hooks with no callbacks registered.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register the data callback.
    #[must_use]
    pub fn on_message_ready(mut self, hook: impl FnMut(&TcpStreamData<'_>) + 'h) -> Self {
        self.message_ready = Some(Box::new(hook));
        self
    }

    /// Register the connection-start callback.
    #[must_use]
    pub fn on_connection_start(mut self, hook: impl FnMut(&ConnectionMetadata) + 'h) -> Self {
        self.connection_start = Some(Box::new(hook));
        self
    }

    /// Register the connection-end callback.
    #[must_use]
    pub fn on_connection_end(
        mut self,
        hook: impl FnMut(&ConnectionMetadata, ConnectionEndReason) + 'h,
    ) -> Self {
        self.connection_end = Some(Box::new(hook));
        self
    }
}

impl StreamObserver for StreamHooks<'_> {
    fn on_message_ready(&mut self, chunk: &TcpStreamData<'_>) {
        if let Some(hook) = &mut self.message_ready {
            hook(chunk);
        }
    }

    fn on_connection_start(&mut self, metadata: &ConnectionMetadata) {
        if let Some(hook) = &mut self.connection_start {
            hook(metadata);
        }
    }

    fn on_connection_end(&mut self, metadata: &ConnectionMetadata, reason: ConnectionEndReason) {
        if let Some(hook) = &mut self.connection_end {
            hook(metadata, reason);
        }
    }
}

impl fmt::Debug for StreamHooks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHooks")
            .field("message_ready", &self.message_ready.is_some())
            .field("connection_start", &self.connection_start.is_some())
            .field("connection_end", &self.connection_end.is_some())
            .finish()
    }
}
