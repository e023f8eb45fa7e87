//! Per-call outcomes returned by the engine.

use std::fmt;

/// Result of feeding one segment to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReassemblyStatus {
    /// The segment carried new payload that was delivered or buffered.
    MessageHandled,
    /// Nothing new: no payload, a retransmission, or data dropped by the
    /// pending budget.
    IgnoredNoData,
    /// The flow has already ended; no state was touched.
    IgnoredClosedFlow,
    /// FIN or RST was processed but no new payload was accepted.
    FinOrRstNoData,
}

impl ReassemblyStatus {
    /// Short label used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageHandled => "message_handled",
            Self::IgnoredNoData => "ignored_no_data",
            Self::IgnoredClosedFlow => "ignored_closed_flow",
            Self::FinOrRstNoData => "fin_or_rst_no_data",
        }
    }
}

impl fmt::Display for ReassemblyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Result of [`ReassemblyEngine::close_connection`].
///
/// [`ReassemblyEngine::close_connection`]: super::ReassemblyEngine::close_connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloseOutcome {
    /// The connection was open and is now closed.
    Closed,
    /// The connection had already ended; nothing changed.
    AlreadyClosed,
    /// No record exists for the flow.
    UnknownFlow,
}
