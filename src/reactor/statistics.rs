//! Per-reactor counters

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Live counters shared between a reactor and its worker
#[derive(Debug, Default)]
pub struct ReactorStatistics {
    received: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    replies_sent: AtomicU64,
    replies_suppressed: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    last_activity: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`ReactorStatistics`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
    pub replies_sent: u64,
    pub replies_suppressed: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ReactorStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&self) {
        if let Ok(mut last) = self.last_activity.write() {
            *last = Some(Utc::now());
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply_sent(&self) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply_suppressed(&self) {
        self.replies_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            replies_suppressed: self.replies_suppressed.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            last_activity: self.last_activity.read().ok().and_then(|t| *t),
        }
    }
}
