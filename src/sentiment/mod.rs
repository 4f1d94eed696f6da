pub mod cryptopanic;
pub mod lexicon;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

pub use cryptopanic::CryptoPanicClient;

/// Aggregate news score and the headline that best explains it.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentReading {
    pub score: f64,
    pub headline: String,
}

impl SentimentReading {
    /// Neutral reading carrying a diagnostic instead of a headline.
    pub fn neutral(diagnostic: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            headline: diagnostic.into(),
        }
    }
}

/// News sentiment capability. Implementations never fail: any fault degrades
/// to a neutral reading.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn fetch_sentiment(&self) -> SentimentReading;
}

pub const OFFLINE_DIAGNOSTIC: &str = "Sentiment engine offline (missing token)";

/// Used when no provider credential is configured.
#[derive(Debug, Clone, Default)]
pub struct NeutralSentiment;

#[async_trait]
impl SentimentSource for NeutralSentiment {
    async fn fetch_sentiment(&self) -> SentimentReading {
        SentimentReading::neutral(OFFLINE_DIAGNOSTIC)
    }
}

/// Caps concurrent provider queries across all instrument workers.
pub struct Limited<S> {
    inner: S,
    permits: Arc<Semaphore>,
}

impl<S: SentimentSource> Limited<S> {
    pub fn new(inner: S, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }
}

#[async_trait]
impl<S: SentimentSource> SentimentSource for Limited<S> {
    async fn fetch_sentiment(&self) -> SentimentReading {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return SentimentReading::neutral("Sentiment limiter closed"),
        };
        self.inner.fetch_sentiment().await
    }
}

/// Pick the provider client when a token is present, the neutral source otherwise.
pub fn from_config(config: &crate::config::SentimentConfig) -> Arc<dyn SentimentSource> {
    match config.token.as_deref() {
        Some(token) => match CryptoPanicClient::new(config, token) {
            Ok(client) => {
                tracing::info!(base_url = %config.base_url, "CryptoPanic sentiment enabled");
                Arc::new(Limited::new(client, config.max_in_flight))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build sentiment client, using neutral sentiment");
                Arc::new(NeutralSentiment)
            }
        },
        None => {
            tracing::warn!("CRYPTOPANIC_TOKEN not set, sentiment filter degraded to neutral");
            Arc::new(NeutralSentiment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowSource {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SentimentSource for SlowSource {
        async fn fetch_sentiment(&self) -> SentimentReading {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            SentimentReading::neutral("slow")
        }
    }

    #[tokio::test]
    async fn limiter_caps_in_flight_queries() {
        let limited = Arc::new(Limited::new(
            SlowSource {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            2,
        ));
        let mut handles = Vec::new();
        for _ in 0..6 {
            let source = limited.clone();
            handles.push(tokio::spawn(async move { source.fetch_sentiment().await }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(limited.inner.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn neutral_source_reports_offline() {
        let reading = NeutralSentiment.fetch_sentiment().await;
        assert_eq!(reading.score, 0.0);
        assert_eq!(reading.headline, OFFLINE_DIAGNOSTIC);
    }
}
