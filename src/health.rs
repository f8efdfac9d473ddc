//! Liveness message and lock-free usage counters.
//!
//! Provides:
//! - [`UsageMetrics`] for per-request counters
//! - [`start_periodic_usage_flush`] for periodic metric emission

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

/// Static body returned by the liveness route.
pub const LIVENESS_MESSAGE: &str = "Test case gateway running!";

const USAGE_FLUSH_INTERVAL_SECS: u64 = 60;

/// Lock-free gateway usage counters.
pub struct UsageMetrics {
    /// Total requests handled by the gateway routes.
    pub requests: AtomicU64,
    /// Generator invocations (cache misses that reached the collaborator).
    pub generations: AtomicU64,
    /// Whitespace tokens produced by the generator.
    pub generated_tokens: AtomicU64,
    /// Requests that ended in an error.
    pub errors: AtomicU64,
    started: Instant,
}

/// Point-in-time copy of [`UsageMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub requests: u64,
    pub generations: u64,
    pub generated_tokens: u64,
    pub errors: u64,
    pub uptime_secs: u64,
}

impl UsageMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            generations: AtomicU64::new(0),
            generated_tokens: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one generator call and the tokens it produced.
    pub fn record_generation(&self, tokens: u64) {
        self.generations.fetch_add(1, Ordering::Relaxed);
        self.generated_tokens.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            generations: self.generations.load(Ordering::Relaxed),
            generated_tokens: self.generated_tokens.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }

    /// Emit current counters as a structured log line.
    pub fn emit_usage(&self, reason: &str) {
        let s = self.snapshot();
        info!(
            event = "usage_summary",
            reason = reason,
            requests = s.requests,
            generations = s.generations,
            generated_tokens = s.generated_tokens,
            errors = s.errors,
            uptime_secs = s.uptime_secs,
            "Usage metrics"
        );
    }
}

impl Default for UsageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a usage summary every minute, and once more on shutdown.
pub fn start_periodic_usage_flush(
    metrics: Arc<UsageMetrics>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(USAGE_FLUSH_INTERVAL_SECS));
        interval.tick().await; // skip first immediate tick

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    metrics.emit_usage("periodic");
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        metrics.emit_usage("shutdown");
                        break;
                    }
                }
            }
        }
    })
}
