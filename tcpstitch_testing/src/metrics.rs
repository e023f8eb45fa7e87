//! Helpers for asserting on metrics captured by a debugging recorder.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Creates a debugging recorder and snapshotter for metrics testing.
#[must_use]
pub fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

#[derive(Debug)]
struct Entry {
    name: String,
    labels: Vec<(String, String)>,
    value: DebugValue,
}

/// One snapshot of every metric recorded so far.
#[derive(Debug)]
pub struct CapturedMetrics {
    entries: Vec<Entry>,
}

impl CapturedMetrics {
    /// Take a snapshot from `snapshotter`.
    #[must_use]
    pub fn take(snapshotter: &Snapshotter) -> Self {
        let entries = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, value)| Entry {
                name: key.key().name().to_owned(),
                labels: key
                    .key()
                    .labels()
                    .map(|l| (l.key().to_owned(), l.value().to_owned()))
                    .collect(),
                value,
            })
            .collect();
        Self { entries }
    }

    /// Sum of every counter named `name` whose labels include `label`.
    #[must_use]
    pub fn counter_total(&self, name: &str, label: Option<(&str, &str)>) -> u64 {
        self.entries
            .iter()
            .filter(|entry| {
                entry.name == name
                    && label.is_none_or(|(k, v)| entry.labels.iter().any(|(lk, lv)| lk == k && lv == v))
            })
            .map(|entry| match entry.value {
                DebugValue::Counter(count) => count,
                _ => 0,
            })
            .sum()
    }

    /// Current value of the gauge named `name`, if recorded.
    #[must_use]
    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| match &entry.value {
                DebugValue::Gauge(gauge) => Some(gauge.into_inner()),
                _ => None,
            })
    }
}
