use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counters. Only logged; never consulted by the flush path.
#[derive(Debug, Default)]
pub struct WriterStats {
    submitted_requests: AtomicU64,
    submitted_points: AtomicU64,
    succeeded_requests: AtomicU64,
    failed_requests: AtomicU64,
    dropped_points: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriterStatsSnapshot {
    pub submitted_requests: u64,
    pub submitted_points: u64,
    pub succeeded_requests: u64,
    pub failed_requests: u64,
    pub dropped_points: u64,
}

impl WriterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self, points: usize) {
        self.submitted_requests.fetch_add(1, Ordering::Relaxed);
        self.submitted_points.fetch_add(points as u64, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.succeeded_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A failed request loses all of its points.
    pub fn record_failure(&self, points: usize) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        self.dropped_points.fetch_add(points as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriterStatsSnapshot {
        WriterStatsSnapshot {
            submitted_requests: self.submitted_requests.load(Ordering::Relaxed),
            submitted_points: self.submitted_points.load(Ordering::Relaxed),
            succeeded_requests: self.succeeded_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            dropped_points: self.dropped_points.load(Ordering::Relaxed),
        }
    }
}
