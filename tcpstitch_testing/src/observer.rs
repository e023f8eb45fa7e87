//! An observer that records everything the engine reports.

use std::collections::HashMap;

use tcpstitch::{
    ConnectionEndReason,
    ConnectionMetadata,
    FlowKey,
    Side,
    StreamObserver,
    TcpStreamData,
};

/// Events seen for one flow.
#[derive(Clone, Debug)]
pub struct FlowRecording {
    /// Metadata as reported by the start event.
    pub start: ConnectionMetadata,
    /// Metadata as reported by each end event.
    pub ends: Vec<(ConnectionMetadata, ConnectionEndReason)>,
    /// Number of start events.
    pub starts: usize,
    /// Number of data events.
    pub data_events: usize,
    /// Bytes delivered per side.
    pub streams: [Vec<u8>; 2],
    /// Application messages per side, counted from side transitions.
    pub messages: [usize; 2],
    last_side: Option<Side>,
}

impl FlowRecording {
    fn new(start: ConnectionMetadata) -> Self {
        Self {
            start,
            ends: Vec::new(),
            starts: 0,
            data_events: 0,
            streams: [Vec::new(), Vec::new()],
            messages: [0, 0],
            last_side: None,
        }
    }

    /// Bytes delivered on `side`.
    #[must_use]
    pub fn stream(&self, side: Side) -> &[u8] { &self.streams[side.index()] }

    /// Messages counted on `side`.
    #[must_use]
    pub fn messages(&self, side: Side) -> usize { self.messages[side.index()] }

    /// The single end reason, if the flow ended exactly once.
    #[must_use]
    pub fn end_reason(&self) -> Option<ConnectionEndReason> {
        match self.ends.as_slice() {
            [(_, reason)] => Some(*reason),
            _ => None,
        }
    }
}

/// [`StreamObserver`] that keeps per-flow recordings for assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    flows: HashMap<FlowKey, FlowRecording>,
    order: Vec<FlowKey>,
}

impl RecordingObserver {
    /// Recording for `key`, if the flow ever started.
    #[must_use]
    pub fn flow(&self, key: &FlowKey) -> Option<&FlowRecording> { self.flows.get(key) }

    /// Keys in the order their start events fired.
    #[must_use]
    pub fn started(&self) -> &[FlowKey] { &self.order }

    /// Data events across every flow.
    #[must_use]
    pub fn data_events(&self) -> usize { self.flows.values().map(|flow| flow.data_events).sum() }

    /// End events across every flow.
    #[must_use]
    pub fn end_events(&self) -> usize { self.flows.values().map(|flow| flow.ends.len()).sum() }

    fn flow_mut(&mut self, metadata: &ConnectionMetadata) -> &mut FlowRecording {
        self.flows
            .entry(metadata.flow_key())
            .or_insert_with(|| FlowRecording::new(metadata.clone()))
    }
}

impl StreamObserver for RecordingObserver {
    fn on_message_ready(&mut self, chunk: &TcpStreamData<'_>) {
        let side = chunk.side();
        let flow = self.flow_mut(chunk.metadata());
        flow.data_events += 1;
        flow.streams[side.index()].extend_from_slice(chunk.data());
        if flow.last_side != Some(side) {
            flow.messages[side.index()] += 1;
            flow.last_side = Some(side);
        }
    }

    fn on_connection_start(&mut self, metadata: &ConnectionMetadata) {
        self.order.push(metadata.flow_key());
        let flow = self.flow_mut(metadata);
        flow.start = metadata.clone();
        flow.starts += 1;
    }

    fn on_connection_end(&mut self, metadata: &ConnectionMetadata, reason: ConnectionEndReason) {
        self.flow_mut(metadata).ends.push((metadata.clone(), reason));
    }
}
