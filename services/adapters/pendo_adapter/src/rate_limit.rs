//! Rate limiting for Pendo API requests

use governor::{DefaultDirectRateLimiter, Quota};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Shared request budget for one integration key
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
    requests_per_minute: u32,
}

impl RateLimiter {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_minute).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid rate limit {}, falling back to 1 request per minute",
                requests_per_minute
            );
            nonzero!(1u32)
        });

        Self {
            limiter: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_minute(rate))),
            requests_per_minute: rate.get(),
        }
    }

    /// Wait until the next request is allowed
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_blocked() {
        let limiter = RateLimiter::per_minute(2);
        assert!(limiter.limiter.check().is_ok());
        assert!(limiter.limiter.check().is_ok());
        assert!(
            limiter.limiter.check().is_err(),
            "third request in the same minute must wait"
        );
    }

    #[test]
    fn test_zero_rate_falls_back() {
        let limiter = RateLimiter::per_minute(0);
        assert_eq!(limiter.requests_per_minute(), 1);
        assert!(limiter.limiter.check().is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_budget() {
        let limiter = RateLimiter::per_minute(1);
        let clone = limiter.clone();
        limiter.wait().await;

        let blocked =
            tokio::time::timeout(std::time::Duration::from_millis(50), clone.wait()).await;
        assert!(blocked.is_err(), "clone must see the spent budget");
    }

    #[tokio::test]
    async fn test_wait_with_capacity_returns_immediately() {
        let limiter = RateLimiter::per_minute(60);
        tokio::time::timeout(std::time::Duration::from_millis(100), limiter.wait())
            .await
            .expect("limiter should not block with spare capacity");
    }
}
