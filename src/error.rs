//! Error types for the crate.
//!
//! Packet processing never fails: malformed or adversarial segments degrade
//! into a [`ReassemblyStatus`](crate::engine::ReassemblyStatus). Only
//! building a configuration can be rejected.

use thiserror::Error;

/// Invalid [`ReassemblyConfig`](crate::config::ReassemblyConfig) values.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Idle eviction is enabled with a zero timeout.
    #[error("idle timeout must be greater than zero when idle eviction is enabled")]
    ZeroIdleTimeout,
    /// The per-call eviction bound is zero.
    #[error("max evictions per call must be greater than zero")]
    ZeroEvictionBound,
    /// A pending-bytes budget of zero was supplied.
    #[error("max pending bytes per side must be greater than zero when set")]
    ZeroPendingBudget,
}
