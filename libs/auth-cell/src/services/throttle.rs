use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{instrument, warn};

#[derive(Debug, Clone)]
pub struct FailedLoginTracker {
    pub attempts: u32,
    pub first_attempt: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

/// In-memory failed-login counter keyed by normalised email. State is lost on
/// restart and not shared between instances.
#[derive(Clone)]
pub struct LoginThrottle {
    max_attempts: u32,
    lockout: Duration,
    trackers: Arc<RwLock<HashMap<String, FailedLoginTracker>>>,
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout,
            trackers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn normalize_key(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub async fn lockout_remaining(&self, key: &str, now: DateTime<Utc>) -> Option<Duration> {
        let trackers = self.trackers.read().await;
        trackers
            .get(key)
            .and_then(|t| t.blocked_until)
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Returns true when this failure locks the key.
    #[instrument(skip(self))]
    pub async fn record_failure(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut trackers = self.trackers.write().await;

        let tracker = trackers
            .entry(key.to_string())
            .or_insert_with(|| FailedLoginTracker {
                attempts: 0,
                first_attempt: now,
                last_attempt: now,
                blocked_until: None,
            });

        if tracker.blocked_until.is_some_and(|until| until <= now) {
            tracker.attempts = 0;
            tracker.first_attempt = now;
            tracker.blocked_until = None;
        }

        tracker.attempts += 1;
        tracker.last_attempt = now;

        if tracker.attempts >= self.max_attempts {
            tracker.blocked_until = Some(now + self.lockout);
            warn!(
                "Login locked for {} after {} failed attempts",
                key, tracker.attempts
            );
            return true;
        }

        false
    }

    pub async fn clear(&self, key: &str) {
        let mut trackers = self.trackers.write().await;
        trackers.remove(key);
    }
}

/// Whole minutes, rounded up, for user-facing messages.
pub fn minutes_ceil(remaining: Duration) -> i64 {
    let secs = remaining.num_seconds().max(0);
    ((secs + 59) / 60).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle() -> LoginThrottle {
        LoginThrottle::new(3, Duration::minutes(15))
    }

    #[tokio::test]
    async fn locks_after_max_attempts() {
        let throttle = throttle();
        let now = Utc::now();

        assert!(!throttle.record_failure("a@cabinet.ma", now).await);
        assert!(!throttle.record_failure("a@cabinet.ma", now).await);
        assert!(throttle.lockout_remaining("a@cabinet.ma", now).await.is_none());

        assert!(throttle.record_failure("a@cabinet.ma", now).await);
        let remaining = throttle
            .lockout_remaining("a@cabinet.ma", now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(remaining, Duration::minutes(10));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let throttle = throttle();
        let now = Utc::now();

        for _ in 0..3 {
            throttle.record_failure("a@cabinet.ma", now).await;
        }

        assert!(throttle.lockout_remaining("b@cabinet.ma", now).await.is_none());
    }

    #[tokio::test]
    async fn counter_restarts_after_lockout_expires() {
        let throttle = throttle();
        let now = Utc::now();

        for _ in 0..3 {
            throttle.record_failure("a@cabinet.ma", now).await;
        }

        let later = now + Duration::minutes(16);
        assert!(throttle.lockout_remaining("a@cabinet.ma", later).await.is_none());
        assert!(!throttle.record_failure("a@cabinet.ma", later).await);
    }

    #[tokio::test]
    async fn clear_forgets_failures() {
        let throttle = throttle();
        let now = Utc::now();

        throttle.record_failure("a@cabinet.ma", now).await;
        throttle.record_failure("a@cabinet.ma", now).await;
        throttle.clear("a@cabinet.ma").await;

        assert!(!throttle.record_failure("a@cabinet.ma", now).await);
    }

    #[test]
    fn minutes_round_up() {
        assert_eq!(minutes_ceil(Duration::seconds(61)), 2);
        assert_eq!(minutes_ceil(Duration::minutes(15)), 15);
        assert_eq!(minutes_ceil(Duration::seconds(1)), 1);
    }

    #[test]
    fn keys_are_normalised() {
        assert_eq!(LoginThrottle::normalize_key("  Dr.Alami@Cabinet.MA "), "dr.alami@cabinet.ma");
    }
}
