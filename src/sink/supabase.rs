use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::DecisionStore;
use crate::config::PersistenceConfig;
use crate::error::{AppError, AppResult};
use crate::model::decision::Decision;

/// Row shape of the `trade_logs` table.
#[derive(Debug, Serialize)]
pub struct TradeLogRow<'a> {
    pub timestamp: String,
    pub symbol: &'a str,
    pub price: f64,
    pub signal: &'a str,
    pub confidence: f64,
    pub reasoning: &'a str,
}

impl<'a> From<&'a Decision> for TradeLogRow<'a> {
    fn from(d: &'a Decision) -> Self {
        Self {
            timestamp: d.timestamp.to_rfc3339(),
            symbol: &d.symbol,
            price: d.price,
            signal: d.signal.as_str(),
            confidence: d.confidence,
            reasoning: &d.reasoning,
        }
    }
}

/// Inserts decisions through the Supabase PostgREST endpoint.
pub struct SupabaseStore {
    http: reqwest::Client,
    insert_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str, config: &PersistenceConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            insert_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), config.table),
            api_key: api_key.to_string(),
        })
    }

    pub async fn insert(&self, decision: &Decision) -> AppResult<()> {
        let resp = self
            .http
            .post(&self.insert_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&TradeLogRow::from(decision))
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
        Ok(())
    }
}

#[async_trait]
impl DecisionStore for SupabaseStore {
    async fn record(&self, decision: &Decision) {
        match self.insert(decision).await {
            Ok(()) => tracing::info!(symbol = %decision.symbol, "Decision saved"),
            Err(e) => tracing::error!(error = %e, symbol = %decision.symbol, "Failed to save decision"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decision::RiskLevel;
    use crate::model::signal::Signal;

    #[test]
    fn row_carries_logged_columns() {
        let decision = Decision {
            symbol: "BTCUSDT".to_string(),
            price: 42000.0,
            signal: Signal::Sell,
            confidence: 0.7,
            risk_level: RiskLevel::Moderate,
            reasoning: "Tech: BEARISH (RSI 45.0) | News Score: 0 | Headline: none".to_string(),
            sentiment_score: 0.0,
            headline: "none".to_string(),
            trend: None,
            rsi: 45.0,
            timestamp: chrono::Utc::now(),
        };
        let row = serde_json::to_value(TradeLogRow::from(&decision)).unwrap();
        assert_eq!(row["symbol"], "BTCUSDT");
        assert_eq!(row["signal"], "SELL");
        assert_eq!(row["confidence"], 0.7);
        assert!(row.get("risk_level").is_none());
    }
}
