//! Engine configuration.
//!
//! [`ReassemblyConfig`] is supplied once, at construction. It can be built in
//! code through the `with_*` methods or deserialised from any serde format;
//! the deserialised form is validated and rejects zero bounds with a
//! [`ConfigError`].

use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;

/// Default idle timeout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default bound on records reclaimed by one idle sweep.
pub const DEFAULT_MAX_EVICTIONS_PER_CALL: NonZeroUsize = match NonZeroUsize::new(30) {
    Some(bound) => bound,
    None => NonZeroUsize::MIN,
};

/// When and how idle connections are reclaimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdleEvictionPolicy {
    /// Run the sweep at the start of every `reassemble` call.
    pub enabled: bool,
    /// Records untouched for at least this long are reclaimed.
    pub idle_timeout: Duration,
    /// Upper bound on records reclaimed by a single sweep.
    pub max_evictions_per_call: NonZeroUsize,
}

impl IdleEvictionPolicy {
    /// Policy that never reclaims idle records.
    pub const DISABLED: Self = Self {
        enabled: false,
        idle_timeout: DEFAULT_IDLE_TIMEOUT,
        max_evictions_per_call: DEFAULT_MAX_EVICTIONS_PER_CALL,
    };

    /// Enabled policy with the given timeout and bound.
    #[must_use]
    pub const fn new(idle_timeout: Duration, max_evictions_per_call: NonZeroUsize) -> Self {
        Self {
            enabled: true,
            idle_timeout,
            max_evictions_per_call,
        }
    }
}

impl Default for IdleEvictionPolicy {
    fn default() -> Self { Self::new(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_EVICTIONS_PER_CALL) }
}

/// Settings for a [`ReassemblyEngine`](crate::engine::ReassemblyEngine).
///
/// # Examples
///
/// ```
/// use std::{num::NonZeroUsize, time::Duration};
///
/// use tcpstitch::{IdleEvictionPolicy, ReassemblyConfig};
///
/// let config = ReassemblyConfig::default()
///     .with_idle_eviction(IdleEvictionPolicy::new(
///         Duration::from_secs(5),
///         NonZeroUsize::new(8).expect("non-zero"),
///     ))
///     .with_flush_on_direction_change(false);
/// assert!(config.idle_eviction.enabled);
/// assert!(!config.flush_on_direction_change);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawReassemblyConfig")]
pub struct ReassemblyConfig {
    /// Idle-eviction sweep settings.
    pub idle_eviction: IdleEvictionPolicy,
    /// Flush the opposite side's pending segments when payload changes
    /// direction.
    pub flush_on_direction_change: bool,
    /// Flush pending segments when a connection ends instead of abandoning
    /// them.
    pub flush_on_close: bool,
    /// Cap on out-of-order bytes buffered per side.
    pub max_pending_bytes_per_side: Option<NonZeroUsize>,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            idle_eviction: IdleEvictionPolicy::default(),
            flush_on_direction_change: true,
            flush_on_close: true,
            max_pending_bytes_per_side: None,
        }
    }
}

impl ReassemblyConfig {
    /// Replace the idle-eviction policy.
    #[must_use]
    pub const fn with_idle_eviction(mut self, policy: IdleEvictionPolicy) -> Self {
        self.idle_eviction = policy;
        self
    }

    /// Turn idle eviction off.
    #[must_use]
    pub const fn without_idle_eviction(mut self) -> Self {
        self.idle_eviction.enabled = false;
        self
    }

    /// Enable or disable the direction-change flush.
    #[must_use]
    pub const fn with_flush_on_direction_change(mut self, enabled: bool) -> Self {
        self.flush_on_direction_change = enabled;
        self
    }

    /// Choose between flushing and abandoning pending data on close.
    #[must_use]
    pub const fn with_flush_on_close(mut self, enabled: bool) -> Self {
        self.flush_on_close = enabled;
        self
    }

    /// Cap the out-of-order bytes each side may buffer.
    #[must_use]
    pub const fn with_max_pending_bytes_per_side(mut self, budget: Option<NonZeroUsize>) -> Self {
        self.max_pending_bytes_per_side = budget;
        self
    }
}

/// Serialised shape of [`ReassemblyConfig`], validated on conversion.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawReassemblyConfig {
    idle_eviction_enabled: bool,
    idle_timeout_secs: u64,
    max_evictions_per_call: usize,
    flush_on_direction_change: bool,
    flush_on_close: bool,
    max_pending_bytes_per_side: Option<usize>,
}

impl Default for RawReassemblyConfig {
    fn default() -> Self {
        let config = ReassemblyConfig::default();
        Self {
            idle_eviction_enabled: config.idle_eviction.enabled,
            idle_timeout_secs: config.idle_eviction.idle_timeout.as_secs(),
            max_evictions_per_call: config.idle_eviction.max_evictions_per_call.get(),
            flush_on_direction_change: config.flush_on_direction_change,
            flush_on_close: config.flush_on_close,
            max_pending_bytes_per_side: None,
        }
    }
}

impl TryFrom<RawReassemblyConfig> for ReassemblyConfig {
    type Error = ConfigError;

    fn try_from(raw: RawReassemblyConfig) -> Result<Self, Self::Error> {
        let idle_timeout = Duration::from_secs(raw.idle_timeout_secs);
        if raw.idle_eviction_enabled && idle_timeout.is_zero() {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        let max_evictions_per_call =
            NonZeroUsize::new(raw.max_evictions_per_call).ok_or(ConfigError::ZeroEvictionBound)?;
        let max_pending_bytes_per_side = raw
            .max_pending_bytes_per_side
            .map(|budget| NonZeroUsize::new(budget).ok_or(ConfigError::ZeroPendingBudget))
            .transpose()?;

        Ok(Self {
            idle_eviction: IdleEvictionPolicy {
                enabled: raw.idle_eviction_enabled,
                idle_timeout,
                max_evictions_per_call,
            },
            flush_on_direction_change: raw.flush_on_direction_change,
            flush_on_close: raw.flush_on_close,
            max_pending_bytes_per_side,
        })
    }
}
