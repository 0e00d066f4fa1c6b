use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;

pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Client count at which idle windows are swept from the map.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

#[derive(Debug)]
struct Buckets {
    hits: HashMap<String, VecDeque<Instant>>,
    sweep_at: usize,
}

/// Sliding-window limiter keyed by client. Clients idle for a full window are forgotten.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        let buckets = Buckets { hits: HashMap::new(), sweep_at: SWEEP_THRESHOLD };
        Self { limit: limit.max(1), window, buckets: Mutex::new(buckets) }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut buckets = self.lock();
        if buckets.hits.len() >= buckets.sweep_at {
            self.sweep(&mut buckets, now);
        }

        let window = buckets.hits.entry(client.to_string()).or_default();
        while window.front().is_some_and(|at| now.duration_since(*at) >= self.window) {
            window.pop_front();
        }

        if window.len() >= self.limit as usize {
            let oldest = window.front().copied().unwrap_or(now);
            let remaining = self.window.saturating_sub(now.duration_since(oldest));
            return RateDecision::Limited { retry_after_secs: remaining.as_secs().max(1) };
        }

        window.push_back(now);
        RateDecision::Allowed
    }

    /// Drops clients whose newest hit has left the window. The next sweep waits until the
    /// map doubles past what survived, so a busy map is not rescanned on every call.
    fn sweep(&self, buckets: &mut Buckets, now: Instant) {
        let before = buckets.hits.len();
        buckets
            .hits
            .retain(|_, seen| seen.back().is_some_and(|at| now.duration_since(*at) < self.window));
        buckets.sweep_at = (buckets.hits.len() * 2).max(SWEEP_THRESHOLD);
        tracing::debug!(
            event_name = "system.rate_limit.swept",
            correlation_id = "rate_limit",
            before,
            after = buckets.hits.len(),
            "idle rate-limit windows dropped"
        );
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.lock().hits.len()
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// First `X-Forwarded-For` hop, or a shared anonymous bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}
