use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::AlertSink;
use crate::config::AlertConfig;
use crate::error::{AppError, AppResult};
use crate::model::decision::Decision;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Telegram Bot API `sendMessage` alerts.
pub struct TelegramAlert {
    http: reqwest::Client,
    url: String,
    chat_id: String,
}

impl TelegramAlert {
    pub fn new(config: &AlertConfig, token: &str, chat_id: &str) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: format!(
                "{}/bot{}/sendMessage",
                config.telegram_api_url.trim_end_matches('/'),
                token
            ),
            chat_id: chat_id.to_string(),
        })
    }

    pub async fn post(&self, message: &str) -> AppResult<()> {
        let resp = self
            .http
            .post(&self.url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: message,
                parse_mode: "Markdown",
            })
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
impl AlertSink for TelegramAlert {
    async fn send(&self, message: &str) {
        match self.post(message).await {
            Ok(()) => tracing::info!("Alert sent"),
            // The error text would carry the bot token inside the URL.
            Err(AppError::Http(e)) => {
                let e = e.without_url();
                tracing::error!(error = %e, "Failed to reach Telegram")
            }
            Err(e) => tracing::error!(error = %e, "Telegram API error"),
        }
    }
}

/// Markdown alert body for one decision.
pub fn format_alert(decision: &Decision) -> String {
    let trend = decision.trend.map(|t| t.as_str()).unwrap_or("UNDEFINED");
    format!(
        "*TradeVision Alert* {symbol} @ {price}\n\n\
         *Technicals:*\n\
         • RSI: {rsi:.1}\n\
         • Trend: {trend}\n\n\
         *News filter:*\n\
         • Sentiment: {label} ({score})\n\
         • Risk: {risk}\n\
         • Key headline: {headline}\n\n\
         *Final decision:*\n\
         • Action: {signal} ({confidence:.0}%)",
        symbol = decision.symbol,
        price = decision.price,
        rsi = decision.rsi,
        trend = trend,
        label = decision.sentiment_label(),
        score = decision.sentiment_score,
        risk = decision.risk_level,
        headline = decision.headline,
        signal = decision.signal,
        confidence = decision.confidence * 100.0,
    )
}
