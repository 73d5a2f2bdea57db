//! Observability stubs (metrics, tracing)

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics handle for recording counters/gauges
#[derive(Debug, Default)]
pub struct Metrics {
    images_probed: AtomicU64,
    images_fixed: AtomicU64,
    images_missing: AtomicU64,
    pages_rewritten: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_probed(&self) {
        self.images_probed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "images_probed", "Metric incremented");
    }

    pub fn image_fixed(&self) {
        self.images_fixed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "images_fixed", "Metric incremented");
    }

    pub fn image_missing(&self) {
        self.images_missing.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "images_missing", "Metric incremented");
    }

    pub fn page_rewritten(&self) {
        self.pages_rewritten.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "pages_rewritten", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            images_probed: self.images_probed.load(Ordering::Relaxed),
            images_fixed: self.images_fixed.load(Ordering::Relaxed),
            images_missing: self.images_missing.load(Ordering::Relaxed),
            pages_rewritten: self.pages_rewritten.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub images_probed: u64,
    pub images_fixed: u64,
    pub images_missing: u64,
    pub pages_rewritten: u64,
}
