use serde::Deserialize;

/// One inbound trade observation for an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketTick {
    pub symbol: String,
    pub price: f64,
    /// Publisher event time in milliseconds, when the message carried one.
    pub server_timestamp_ms: Option<u64>,
}

impl MarketTick {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            server_timestamp_ms: None,
        }
    }
}

/// Decoded trade-stream payload. Fields are optional so that a single missing
/// or oddly-typed field drops only this message, never the subscription.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeMessage {
    #[serde(rename = "e", default)]
    pub event_type: Option<String>,
    #[serde(rename = "E", default)]
    pub event_time: Option<serde_json::Value>,
    #[serde(rename = "s", default)]
    pub symbol: Option<String>,
    #[serde(rename = "p", default)]
    pub price: Option<serde_json::Value>,
}

pub const TRADE_EVENT: &str = "trade";
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

impl TradeMessage {
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    pub fn is_trade(&self) -> bool {
        self.event_type.as_deref() == Some(TRADE_EVENT)
    }

    /// Accepts numeric strings (`"42000.10"`) and plain JSON numbers.
    pub fn price_f64(&self) -> Option<f64> {
        match self.price.as_ref()? {
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            serde_json::Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// `None` when the message carries no numeric price.
    pub fn to_tick(&self) -> Option<MarketTick> {
        let price = self.price_f64()?;
        let symbol = self
            .symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SYMBOL);
        Some(MarketTick {
            symbol: symbol.to_ascii_uppercase(),
            price,
            server_timestamp_ms: self.event_time.as_ref().and_then(serde_json::Value::as_u64),
        })
    }
}
