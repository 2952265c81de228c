//! Fixed-window rate limiting keyed by client identifier.
//!
//! Each identifier owns one window: a request counter and the instant the
//! window closes. The first request after that instant opens a new window.
//!
//! The table is a [`DashMap`]. A check holds the key's shard lock for the
//! whole read-compare-increment, so two concurrent requests can never both
//! take the last slot. The sweep uses `retain`, which takes the same locks; a
//! sweep that drops an expired window only makes the next request open a
//! fresh one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitPolicy;
use crate::observability::metrics;

/// Fallback for windows that would overflow `Instant`.
const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Shortest sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// The policy's cap, echoed for response headers.
    pub limit: u32,
    /// When the current window closes.
    pub reset_at: Instant,
}

impl RateLimitDecision {
    /// Time until the window closes, zero if it already has.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }

    /// [`Self::retry_after`] rounded up to whole seconds.
    pub fn retry_after_secs(&self, now: Instant) -> u64 {
        let wait = self.retry_after(now);
        if wait.subsec_nanos() > 0 {
            wait.as_secs() + 1
        } else {
            wait.as_secs()
        }
    }
}

/// Per-process fixed-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Current time according to the limiter's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Count one request from `identifier` against `policy`.
    pub fn check_rate_limit(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let now = self.clock.now();
        let fresh = RateLimitEntry {
            count: 1,
            reset_at: window_end(now, policy.window()),
        };
        let opened = RateLimitDecision {
            allowed: true,
            remaining: policy.max_requests.saturating_sub(1),
            limit: policy.max_requests,
            reset_at: fresh.reset_at,
        };

        match self.entries.entry(identifier.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                opened
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if now > entry.reset_at {
                    *entry = fresh;
                    return opened;
                }

                if entry.count >= policy.max_requests {
                    tracing::debug!(
                        client = %identifier,
                        count = entry.count,
                        max_requests = policy.max_requests,
                        "Rate limit window exhausted"
                    );
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        limit: policy.max_requests,
                        reset_at: entry.reset_at,
                    };
                }

                entry.count += 1;
                RateLimitDecision {
                    allowed: true,
                    remaining: policy.max_requests - entry.count,
                    limit: policy.max_requests,
                    reset_at: entry.reset_at,
                }
            }
        }
    }

    /// Drop every window that has closed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.reset_at);
        before.saturating_sub(self.entries.len())
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sweep on a fixed interval until `shutdown` fires.
    ///
    /// Intervals below 10ms, including zero, are raised to 10ms.
    pub async fn run_sweeper(
        self: Arc<Self>,
        policy_name: &'static str,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        tracing::info!(
            policy = policy_name,
            interval_ms = interval.as_millis() as u64,
            "Rate limit sweeper starting"
        );

        let mut ticker = time::interval(interval);
        // The first tick completes immediately; nothing can have expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    let remaining = self.len();
                    if removed > 0 {
                        tracing::debug!(policy = policy_name, removed, remaining, "Swept expired rate limit windows");
                    }
                    metrics::record_rate_limit_entries(policy_name, remaining);
                }
                _ = shutdown.recv() => {
                    tracing::info!(policy = policy_name, "Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn window_end(now: Instant, window: Duration) -> Instant {
    now.checked_add(window)
        .or_else(|| now.checked_add(MAX_WINDOW))
        .unwrap_or(now)
}
