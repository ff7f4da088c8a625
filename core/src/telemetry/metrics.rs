use std::sync::Mutex;

use serde::Serialize;

/// Counters shared by everything that drives the engine.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub compiled: usize,
    pub failed: usize,
    pub skipped_files: usize,
    pub interpolated_columns: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_compiled(&self, skipped_files: usize, interpolated_columns: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.compiled += 1;
            metrics.skipped_files += skipped_files;
            metrics.interpolated_columns += interpolated_columns;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failed += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
