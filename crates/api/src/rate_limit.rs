use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    /// Records a hit for `key`, or returns how long until the oldest hit
    /// leaves the window.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut guard = self.inner.lock();
        // Expire old hits everywhere and forget clients that went quiet.
        guard.retain(|_, hits| {
            while hits
                .front()
                .is_some_and(|front| now.duration_since(*front) >= self.window)
            {
                hits.pop_front();
            }
            !hits.is_empty()
        });

        if let Some(hits) = guard.get(key).filter(|hits| hits.len() >= self.max_requests) {
            let retry_after = hits
                .front()
                .map(|front| self.window.saturating_sub(now.duration_since(*front)))
                .unwrap_or(self.window);
            return Err(retry_after);
        }
        if self.max_requests == 0 {
            return Err(self.window);
        }

        guard.entry(key.to_string()).or_default().push_back(now);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_max_requests_within_window() {
        let limiter = IpRateLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        assert!(limiter.check_at("10.0.0.1", start).is_ok());
        assert!(limiter.check_at("10.0.0.1", start).is_ok());
        let retry = limiter
            .check_at("10.0.0.1", start + Duration::from_secs(15))
            .unwrap_err();
        assert_eq!(retry, Duration::from_secs(45));

        assert!(limiter.check_at("10.0.0.2", start).is_ok());
    }

    #[test]
    fn window_slides() {
        let limiter = IpRateLimiter::new(Duration::from_secs(10), 1);
        let start = Instant::now();

        assert!(limiter.check_at("local", start).is_ok());
        assert!(limiter.check_at("local", start + Duration::from_secs(5)).is_err());
        assert!(limiter.check_at("local", start + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn quiet_clients_are_forgotten() {
        let limiter = IpRateLimiter::new(Duration::from_secs(10), 5);
        let start = Instant::now();

        for n in 0..50 {
            assert!(limiter.check_at(&format!("10.0.1.{n}"), start).is_ok());
        }
        assert_eq!(limiter.tracked_keys(), 50);

        assert!(limiter
            .check_at("10.0.2.1", start + Duration::from_secs(10))
            .is_ok());
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn zero_budget_rejects_without_tracking() {
        let limiter = IpRateLimiter::new(Duration::from_secs(10), 0);
        assert_eq!(
            limiter.check_at("local", Instant::now()),
            Err(Duration::from_secs(10))
        );
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
