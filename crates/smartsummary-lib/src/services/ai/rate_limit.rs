// Per-operation fixed-window rate limiter

use std::collections::HashMap;

use super::AIError;
use crate::models::OperationKind;

pub const DEFAULT_RATE_LIMIT: u32 = 30;
pub const DEFAULT_WINDOW_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub count: u32,
    /// Epoch milliseconds at which the window resets
    pub reset_time: i64,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window_ms: i64,
    windows: HashMap<OperationKind, RateLimitWindow>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_ms: i64) -> Self {
        Self {
            max_requests,
            window_ms,
            windows: HashMap::new(),
        }
    }

    /// Check if request is allowed and increment counter
    pub fn check_and_increment(&mut self, kind: OperationKind, now: i64) -> Result<(), AIError> {
        let window_ms = self.window_ms;
        let window = self.windows.entry(kind).or_insert(RateLimitWindow {
            count: 0,
            reset_time: now + window_ms,
        });

        // Reset window if expired
        if now >= window.reset_time {
            *window = RateLimitWindow {
                count: 1,
                reset_time: now + window_ms,
            };
            return Ok(());
        }

        if window.count >= self.max_requests {
            let wait_ms = (window.reset_time - now).max(0);
            let retry_after_secs = ((wait_ms + 999) / 1000).max(1) as u64;
            return Err(AIError::RateLimited { retry_after_secs });
        }

        window.count += 1;
        Ok(())
    }

    pub fn window(&self, kind: OperationKind) -> Option<RateLimitWindow> {
        self.windows.get(&kind).copied()
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT, DEFAULT_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter() {
        let mut limiter = RateLimiter::new(2, 60_000);
        assert!(limiter.check_and_increment(OperationKind::Summary, 0).is_ok());
        assert!(limiter.check_and_increment(OperationKind::Summary, 1).is_ok());
        let err = limiter.check_and_increment(OperationKind::Summary, 30_500).unwrap_err();
        assert!(matches!(err, AIError::RateLimited { retry_after_secs: 30 }));
    }

    #[test]
    fn test_windows_are_per_operation() {
        let mut limiter = RateLimiter::new(1, 60_000);
        assert!(limiter.check_and_increment(OperationKind::Summary, 0).is_ok());
        assert!(limiter.check_and_increment(OperationKind::Chat, 0).is_ok());
        assert!(limiter.check_and_increment(OperationKind::Chat, 0).is_err());
    }

    #[test]
    fn test_window_resets() {
        let mut limiter = RateLimiter::new(1, 1_000);
        assert!(limiter.check_and_increment(OperationKind::Summary, 0).is_ok());
        assert!(limiter.check_and_increment(OperationKind::Summary, 999).is_err());
        assert!(limiter.check_and_increment(OperationKind::Summary, 1_000).is_ok());
        assert_eq!(limiter.window(OperationKind::Summary).unwrap().count, 1);
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        let mut limiter = RateLimiter::new(1, 1_000);
        limiter.check_and_increment(OperationKind::Chat, 0).unwrap();
        let err = limiter.check_and_increment(OperationKind::Chat, 999).unwrap_err();
        assert!(matches!(err, AIError::RateLimited { retry_after_secs: 1 }));
    }
}
