use std::fmt;

use serde::Serialize;

/// Actionable trade direction carried by a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator engine classification. `Wait` until the engine has warmed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechnicalSignal {
    Wait,
    Buy,
    Sell,
    Hold,
}

impl TechnicalSignal {
    pub fn as_signal(self) -> Option<Signal> {
        match self {
            Self::Wait => None,
            Self::Buy => Some(Signal::Buy),
            Self::Sell => Some(Signal::Sell),
            Self::Hold => Some(Signal::Hold),
        }
    }
}

impl fmt::Display for TechnicalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_signal() {
            Some(signal) => f.write_str(signal.as_str()),
            None => f.write_str("WAIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
