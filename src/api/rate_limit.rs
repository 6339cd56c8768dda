//! Rate limiting for authentication endpoints.
//!
//! Login and password-reset requests are throttled per client with a fixed
//! window. State is in-process only; each service instance enforces its
//! own budget.

use axum::http::HeaderMap;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

pub struct AuthRateLimiter {
    entries: DashMap<String, WindowEntry>,
    max_attempts: u32,
    window: Duration,
}

impl AuthRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            max_attempts: config.auth_max_attempts.max(1),
            window: Duration::from_secs(config.auth_window_secs.max(1)),
        }
    }

    /// Record an attempt for this client key and report whether it stays
    /// within budget.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(WindowEntry {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        let allowed = entry.count <= self.max_attempts;
        drop(entry);

        // Opportunistic cleanup so the map does not grow unbounded
        if self.entries.len() > 10_000 {
            let window = self.window;
            self.entries
                .retain(|_, e| now.duration_since(e.window_start) < window);
        }

        allowed
    }
}

/// Best-effort client key for rate limiting: proxy-forwarded address when
/// present, otherwise a shared bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|ip| ip.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
