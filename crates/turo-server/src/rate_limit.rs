//! Per-identity fixed-window admission control.
//!
//! Deliberately a fixed window, not a sliding window or token bucket: the
//! counter resets wholesale at a deterministic wall-clock boundary, which
//! admits up to 2x the nominal limit in a burst straddling the boundary.
//! That tolerance is documented behavior, not a bug to fix here.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 30,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of an admission check. Rejection is a value, never an error;
/// callers turn it into a 429 with the remaining/reset metadata attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_epoch_secs: u64,
}

struct WindowEntry {
    count: u32,
    reset_at: u64,
}

/// In-process limiter shared across all requests. State is only touched
/// under the single mutex, so check-then-increment is atomic per identity.
/// No cross-process coordination; acceptable for a single-instance deploy.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, WindowEntry>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn admit(&self, identity: &str) -> Decision {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.admit_at(identity, now)
    }

    /// Admission check at an explicit time, so tests control the clock.
    pub fn admit_at(&self, identity: &str, now_epoch_secs: u64) -> Decision {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let window_secs = self.config.window.as_secs();

        let entry = entries
            .entry(identity.to_string())
            .or_insert(WindowEntry {
                count: 0,
                reset_at: now_epoch_secs + window_secs,
            });

        // Lazy reset: a fresh window starts on the first access past the boundary.
        if now_epoch_secs > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now_epoch_secs + window_secs;
        }

        if entry.count >= self.config.limit {
            return Decision {
                allowed: false,
                limit: self.config.limit,
                remaining: 0,
                reset_epoch_secs: entry.reset_at,
            };
        }

        entry.count += 1;
        Decision {
            allowed: true,
            limit: self.config.limit,
            remaining: self.config.limit - entry.count,
            reset_epoch_secs: entry.reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            limit,
            window: Duration::from_secs(window_secs),
        })
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let rl = limiter(30, 60);
        for i in 0..30 {
            let d = rl.admit_at("user-1", 1000);
            assert!(d.allowed, "request {i} should be admitted");
            assert_eq!(d.remaining, 29 - i);
        }
        let d = rl.admit_at("user-1", 1000);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_epoch_secs, 1060);
    }

    #[test]
    fn rejection_does_not_increment() {
        let rl = limiter(1, 60);
        assert!(rl.admit_at("u", 0).allowed);
        assert!(!rl.admit_at("u", 0).allowed);
        assert!(!rl.admit_at("u", 0).allowed);
        // Window expiry still works after any number of rejections.
        assert!(rl.admit_at("u", 61).allowed);
    }

    #[test]
    fn window_resets_after_expiry() {
        let rl = limiter(2, 60);
        assert!(rl.admit_at("u", 100).allowed);
        assert!(rl.admit_at("u", 100).allowed);
        assert!(!rl.admit_at("u", 159).allowed);

        let d = rl.admit_at("u", 161);
        assert!(d.allowed);
        assert_eq!(d.remaining, 1);
        assert_eq!(d.reset_epoch_secs, 221);
    }

    #[test]
    fn reset_boundary_is_exclusive() {
        let rl = limiter(1, 60);
        assert!(rl.admit_at("u", 100).allowed);
        // Exactly at reset_at the old window still applies.
        assert!(!rl.admit_at("u", 160).allowed);
        assert!(rl.admit_at("u", 161).allowed);
    }

    #[test]
    fn identities_are_independent() {
        let rl = limiter(1, 60);
        assert!(rl.admit_at("a", 0).allowed);
        assert!(rl.admit_at("b", 0).allowed);
        assert!(!rl.admit_at("a", 0).allowed);
    }

    #[test]
    fn boundary_burst_allows_double_limit() {
        // Documented fixed-window tolerance: L just before the boundary and
        // L just after are all admitted.
        let rl = limiter(3, 60);
        assert!(rl.admit_at("u", 100).allowed);
        assert!(rl.admit_at("u", 158).allowed);
        assert!(rl.admit_at("u", 159).allowed);
        for _ in 0..3 {
            assert!(rl.admit_at("u", 161).allowed);
        }
        assert!(!rl.admit_at("u", 162).allowed);
    }

    #[test]
    fn wall_clock_admit_works() {
        let rl = limiter(5, 60);
        let d = rl.admit("user-1");
        assert!(d.allowed);
        assert_eq!(d.remaining, 4);
        assert!(d.reset_epoch_secs > 0);
    }
}
