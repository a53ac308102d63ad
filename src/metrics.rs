use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Pipeline counters for monitoring.
#[derive(Clone)]
pub struct Metrics {
    pub requests_total: Arc<AtomicU64>,
    pub rate_limited_total: Arc<AtomicU64>,
    pub unauthenticated_total: Arc<AtomicU64>,
    pub forbidden_total: Arc<AtomicU64>,
    pub csrf_rejected_total: Arc<AtomicU64>,
    pub validation_failed_total: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            rate_limited_total: Arc::new(AtomicU64::new(0)),
            unauthenticated_total: Arc::new(AtomicU64::new(0)),
            forbidden_total: Arc::new(AtomicU64::new(0)),
            csrf_rejected_total: Arc::new(AtomicU64::new(0)),
            validation_failed_total: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rate_limited(&self) {
        self.rate_limited_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unauthenticated(&self) {
        self.unauthenticated_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_forbidden(&self) {
        self.forbidden_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_csrf_rejected(&self) {
        self.csrf_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_validation_failed(&self) {
        self.validation_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            rate_limited_total: self.rate_limited_total.load(Ordering::Relaxed),
            unauthenticated_total: self.unauthenticated_total.load(Ordering::Relaxed),
            forbidden_total: self.forbidden_total.load(Ordering::Relaxed),
            csrf_rejected_total: self.csrf_rejected_total.load(Ordering::Relaxed),
            validation_failed_total: self.validation_failed_total.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub rate_limited_total: u64,
    pub unauthenticated_total: u64,
    pub forbidden_total: u64,
    pub csrf_rejected_total: u64,
    pub validation_failed_total: u64,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_independently() {
        let m = Metrics::new();
        m.inc_requests();
        m.inc_requests();
        m.inc_rate_limited();
        let snap = m.get_snapshot();
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.rate_limited_total, 1);
        assert_eq!(snap.csrf_rejected_total, 0);
    }
}
