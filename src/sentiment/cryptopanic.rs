use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::lexicon::score_titles;
use super::{SentimentReading, SentimentSource};
use crate::config::SentimentConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub results: Vec<Post>,
}

#[derive(Debug, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub title: String,
}

/// CryptoPanic posts API client.
pub struct CryptoPanicClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    post_limit: usize,
}

impl CryptoPanicClient {
    pub fn new(config: &SentimentConfig, token: &str) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            post_limit: config.post_limit,
        })
    }

    async fn fetch_posts(&self) -> AppResult<PostsResponse> {
        let url = format!("{}/api/v1/posts/", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("auth_token", self.token.as_str()), ("kind", "news")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json::<PostsResponse>().await?)
    }
}

#[async_trait]
impl SentimentSource for CryptoPanicClient {
    async fn fetch_sentiment(&self) -> SentimentReading {
        match self.fetch_posts().await {
            Ok(posts) => {
                let reading = score_titles(
                    posts
                        .results
                        .iter()
                        .take(self.post_limit)
                        .map(|p| p.title.as_str()),
                );
                tracing::debug!(score = reading.score, headline = %reading.headline, "Sentiment fetched");
                reading
            }
            Err(AppError::Status { status, .. }) => {
                tracing::warn!(status, "Sentiment provider returned error status");
                SentimentReading::neutral("API connection error")
            }
            // The request URL carries the auth token.
            Err(AppError::Http(e)) => {
                let e = e.without_url();
                tracing::warn!(error = %e, "Sentiment fetch failed");
                SentimentReading::neutral(format!("Fetch error: {}", e))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sentiment fetch failed");
                SentimentReading::neutral(format!("Fetch error: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_posts_and_tolerates_missing_titles() {
        let body = r#"{"count": 3, "results": [{"title": "A", "kind": "news"}, {"id": 2}]}"#;
        let resp: PostsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[1].title, "");
    }

    #[tokio::test]
    async fn unreachable_provider_degrades_to_neutral() {
        let config = SentimentConfig {
            // Port 9 (discard) on localhost: connection refused or timeout.
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..SentimentConfig::default()
        };
        let client = CryptoPanicClient::new(&config, "token").unwrap();
        let reading = client.fetch_sentiment().await;
        assert_eq!(reading.score, 0.0);
        assert!(reading.headline.starts_with("Fetch error"));
    }
}
