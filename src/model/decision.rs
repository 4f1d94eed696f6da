use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::signal::{Signal, Trend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    /// A technical BUY vetoed by negative news.
    BlockedByNews,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::BlockedByNews => "HIGH (blocked by news)",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finalized, immutable trade decision handed to the sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub symbol: String,
    pub price: f64,
    pub signal: Signal,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub sentiment_score: f64,
    pub headline: String,
    pub trend: Option<Trend>,
    pub rsi: f64,
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    pub fn sentiment_label(&self) -> &'static str {
        if self.sentiment_score > 0.0 {
            "Positive"
        } else if self.sentiment_score < 0.0 {
            "Negative"
        } else {
            "Neutral"
        }
    }
}

/// `Tech: BULLISH (RSI 55.2) | News Score: 2 | Headline: ...`
pub fn reasoning_text(trend: Option<Trend>, rsi: f64, sentiment_score: f64, headline: &str) -> String {
    let trend = trend.map(|t| t.as_str()).unwrap_or("UNDEFINED");
    format!(
        "Tech: {} (RSI {:.1}) | News Score: {} | Headline: {}",
        trend, rsi, sentiment_score, headline
    )
}
