//! Rate-limited AI wrapper.
//!
//! Wraps any AI implementation with a request quota using the governor crate.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};

use crate::error::Result;
use crate::traits::ai::AI;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A backend wrapper that waits for a permit before every call.
///
/// Completions and embeddings share one quota. A batch embedding counts as
/// a single request.
pub struct RateLimitedAI<A: AI> {
    inner: A,
    limiter: Arc<DefaultRateLimiter>,
}

impl<A: AI> RateLimitedAI<A> {
    /// Allow at most `requests_per_second`, with no burst.
    pub fn new(inner: A, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(
            inner,
            Quota::per_second(requests_per_second).allow_burst(NonZeroU32::MIN),
        )
    }

    /// Sustained `requests_per_second` with bursts of up to `burst`.
    pub fn with_burst(inner: A, requests_per_second: NonZeroU32, burst: NonZeroU32) -> Self {
        Self::with_quota(inner, Quota::per_second(requests_per_second).allow_burst(burst))
    }

    pub fn with_quota(inner: A, quota: Quota) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<A: AI> AI for RateLimitedAI<A> {
    async fn complete(&self, persona: &str, prompt: &str) -> Result<String> {
        self.wait_for_permit().await;
        self.inner.complete(persona, prompt).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.wait_for_permit().await;
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.wait_for_permit().await;
        self.inner.embed_batch(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAI;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_delegates_to_inner() {
        let mock = MockAI::new().with_responses(["hello"]);
        let ai = RateLimitedAI::new(mock.clone(), NonZeroU32::new(100).unwrap());

        assert_eq!(ai.complete("p", "q").await.unwrap(), "hello");
        assert_eq!(ai.embed("text").await.unwrap().len(), 64);
        assert_eq!(mock.completion_count(), 1);
        assert_eq!(mock.embed_count(), 1);
    }

    #[tokio::test]
    async fn test_calls_are_spaced() {
        let ai = RateLimitedAI::new(MockAI::new(), NonZeroU32::new(20).unwrap());

        let start = Instant::now();
        for _ in 0..3 {
            ai.complete("p", "q").await.unwrap();
        }

        // First call is free, the next two wait ~50ms each
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
