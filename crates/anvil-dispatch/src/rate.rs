//! Sliding-window rate limiter.
//!
//! Bounds how often a user may trigger a command within a fixed window. One
//! [`RateWindow`] exists per `(user, bucket)` key; acquisition resets the
//! window on expiry, increments under the limit, and denies at it — a denial
//! never mutates the window, so the count can't inflate past the limit.
//!
//! # Synchronization
//!
//! Each key has its own `parking_lot::Mutex`; the shared map is only locked
//! long enough to fetch or insert a key's slot. Two acquisitions against the
//! same key serialize on the slot mutex, acquisitions against unrelated keys
//! never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

// ============================================================================
// Clock seam
// ============================================================================

/// Time source for window arithmetic.
///
/// Production uses [`SystemClock`]; tests advance time manually.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ============================================================================
// Bucket scoping
// ============================================================================

/// How rate-limit buckets are keyed.
///
/// With `Command` (the default), component presses share their parent
/// command's bucket. `Component` gives each component its own window instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateScope {
    /// One bucket per command; components share it.
    #[default]
    Command,
    /// Component presses get a bucket separate from their parent command.
    Component,
}

impl RateScope {
    /// Derives the bucket name for `command`, optionally refined by the
    /// pressed component's ID.
    pub fn bucket(self, command: &str, component_id: Option<&str>) -> String {
        match (self, component_id) {
            (Self::Component, Some(component)) => format!("{command}#{component}"),
            _ => command.to_string(),
        }
    }
}

// ============================================================================
// Rate limiter
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RateKey {
    user_id: u64,
    bucket: String,
}

/// Per-user, per-bucket sliding-window limiter.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    windows: RwLock<HashMap<RateKey, Arc<Mutex<RateWindow>>>>,
}

impl RateLimiter {
    /// Creates a limiter on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a limiter reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Attempts one acquisition of `limit` uses per `window` for the
    /// `(user_id, bucket)` key. Returns `false` when the budget is spent.
    pub fn try_acquire(&self, user_id: u64, bucket: &str, limit: u32, window: Duration) -> bool {
        if limit == 0 {
            return false;
        }

        let slot = self.slot(user_id, bucket);
        let mut state = slot.lock();
        let now = self.clock.now();

        if now.duration_since(state.started) >= window {
            state.started = now;
            state.count = 1;
            return true;
        }

        if state.count < limit {
            state.count += 1;
            true
        } else {
            false
        }
    }

    /// Returns the number of tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.windows.read().len()
    }

    fn slot(&self, user_id: u64, bucket: &str) -> Arc<Mutex<RateWindow>> {
        let key = RateKey {
            user_id,
            bucket: bucket.to_string(),
        };

        if let Some(slot) = self.windows.read().get(&key) {
            return Arc::clone(slot);
        }

        let now = self.clock.now();
        Arc::clone(self.windows.write().entry(key).or_insert_with(|| {
            Arc::new(Mutex::new(RateWindow {
                started: now,
                count: 0,
            }))
        }))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A manually advanced clock.
    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }

    const WINDOW: Duration = Duration::from_secs(20);

    #[test]
    fn limit_plus_one_acquisitions_deny_the_excess() {
        let limiter = RateLimiter::new();

        let allowed = (0..4)
            .filter(|_| limiter.try_acquire(7, "ocr", 3, WINDOW))
            .count();
        assert_eq!(allowed, 3);

        // Denials must not inflate the count: still denied.
        assert!(!limiter.try_acquire(7, "ocr", 3, WINDOW));
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(clock.clone());

        assert!(limiter.try_acquire(7, "ocr", 2, WINDOW));
        assert!(limiter.try_acquire(7, "ocr", 2, WINDOW));
        assert!(!limiter.try_acquire(7, "ocr", 2, WINDOW));

        clock.advance(WINDOW);

        assert!(limiter.try_acquire(7, "ocr", 2, WINDOW));
        assert!(limiter.try_acquire(7, "ocr", 2, WINDOW));
        assert!(!limiter.try_acquire(7, "ocr", 2, WINDOW));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();

        assert!(limiter.try_acquire(7, "ocr", 1, WINDOW));
        assert!(!limiter.try_acquire(7, "ocr", 1, WINDOW));

        // Different user, different command: unaffected.
        assert!(limiter.try_acquire(8, "ocr", 1, WINDOW));
        assert!(limiter.try_acquire(7, "stats", 1, WINDOW));
        assert_eq!(limiter.tracked_keys(), 3);
    }

    #[test]
    fn concurrent_acquisitions_have_a_single_winner() {
        let limiter = Arc::new(RateLimiter::new());

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let limiter = Arc::clone(&limiter);
                    scope.spawn(move || limiter.try_acquire(7, "ocr", 1, WINDOW))
                })
                .collect();

            let allowed = handles
                .into_iter()
                .map(|h| h.join().unwrap_or(false))
                .filter(|&acquired| acquired)
                .count();
            assert_eq!(allowed, 1);
        });
    }

    #[test]
    fn zero_limit_always_denies() {
        let limiter = RateLimiter::new();
        assert!(!limiter.try_acquire(7, "ocr", 0, WINDOW));
    }

    #[test]
    fn scope_controls_component_buckets() {
        assert_eq!(RateScope::Command.bucket("ocr", Some("retry")), "ocr");
        assert_eq!(RateScope::Command.bucket("ocr", None), "ocr");
        assert_eq!(
            RateScope::Component.bucket("ocr", Some("retry")),
            "ocr#retry"
        );
        assert_eq!(RateScope::Component.bucket("ocr", None), "ocr");
    }
}
