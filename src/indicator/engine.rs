use super::ema::Ema;
use super::ring::RingBuffer;
use super::rsi::Rsi;
use crate::model::signal::{TechnicalSignal, Trend};

pub const FAST_EMA_PERIOD: usize = 20;
pub const SLOW_EMA_PERIOD: usize = 200;
pub const RSI_PERIOD: usize = 14;
/// Samples required before a signal is produced.
pub const WARMUP_SAMPLES: usize = SLOW_EMA_PERIOD;

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const BUY_BAND: (f64, f64) = (40.0, 70.0);
const SELL_BAND: (f64, f64) = (30.0, 60.0);

/// Read-only view of the engine after the latest update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnicalSnapshot {
    pub signal: TechnicalSignal,
    pub trend: Option<Trend>,
    pub rsi: f64,
    pub ema20: Option<f64>,
    pub ema200: Option<f64>,
}

/// Incremental EMA(20)/EMA(200)/RSI(14) state for one instrument.
#[derive(Debug, Clone)]
pub struct TechnicalEngine {
    prices: RingBuffer,
    ema_fast: Ema,
    ema_slow: Ema,
    rsi: Rsi,
}

impl Default for TechnicalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TechnicalEngine {
    pub fn new() -> Self {
        Self {
            prices: RingBuffer::new(WARMUP_SAMPLES),
            ema_fast: Ema::new(FAST_EMA_PERIOD),
            ema_slow: Ema::new(SLOW_EMA_PERIOD),
            rsi: Rsi::new(RSI_PERIOD),
        }
    }

    pub fn update(&mut self, price: f64) {
        self.prices.push(price);
        self.rsi.push(price);
        self.ema_fast.push(price);
        self.ema_slow.push(price);
    }

    pub fn evaluate(&self) -> TechnicalSnapshot {
        let rsi = self.rsi.value_or_neutral();
        let ema20 = self.ema_fast.value();
        let ema200 = self.ema_slow.value();
        let trend = classify_trend(ema20, ema200);

        let signal = if self.is_warm() {
            resolve_signal(trend, rsi)
        } else {
            TechnicalSignal::Wait
        };

        TechnicalSnapshot {
            signal,
            trend,
            rsi,
            ema20,
            ema200,
        }
    }

    pub fn is_warm(&self) -> bool {
        self.prices.is_full()
    }

    pub fn sample_count(&self) -> usize {
        self.prices.len()
    }

    pub fn rsi_value(&self) -> Option<f64> {
        self.rsi.value()
    }
}

pub fn classify_trend(ema20: Option<f64>, ema200: Option<f64>) -> Option<Trend> {
    let (fast, slow) = (ema20?, ema200?);
    Some(if fast > slow {
        Trend::Bullish
    } else if fast < slow {
        Trend::Bearish
    } else {
        Trend::Neutral
    })
}

/// Trend-following base case, then the overbought/oversold override. The
/// override wins even when it contradicts the trend.
pub fn resolve_signal(trend: Option<Trend>, rsi: f64) -> TechnicalSignal {
    let mut signal = match trend {
        Some(Trend::Bullish) if rsi > BUY_BAND.0 && rsi < BUY_BAND.1 => TechnicalSignal::Buy,
        Some(Trend::Bearish) if rsi > SELL_BAND.0 && rsi < SELL_BAND.1 => TechnicalSignal::Sell,
        _ => TechnicalSignal::Hold,
    };

    if rsi > RSI_OVERBOUGHT {
        signal = TechnicalSignal::Sell;
    } else if rsi < RSI_OVERSOLD {
        signal = TechnicalSignal::Buy;
    }
    signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_undefined_without_both_emas() {
        assert_eq!(classify_trend(None, Some(1.0)), None);
        assert_eq!(classify_trend(Some(1.0), None), None);
        assert_eq!(classify_trend(Some(1.0), Some(1.0)), Some(Trend::Neutral));
    }

    #[test]
    fn base_case_bands() {
        assert_eq!(resolve_signal(Some(Trend::Bullish), 55.0), TechnicalSignal::Buy);
        assert_eq!(resolve_signal(Some(Trend::Bullish), 40.0), TechnicalSignal::Hold);
        assert_eq!(resolve_signal(Some(Trend::Bearish), 45.0), TechnicalSignal::Sell);
        assert_eq!(resolve_signal(Some(Trend::Bearish), 60.0), TechnicalSignal::Hold);
        assert_eq!(resolve_signal(Some(Trend::Neutral), 50.0), TechnicalSignal::Hold);
    }

    #[test]
    fn override_beats_trend() {
        assert_eq!(resolve_signal(Some(Trend::Bearish), 25.0), TechnicalSignal::Buy);
        assert_eq!(resolve_signal(Some(Trend::Bullish), 75.0), TechnicalSignal::Sell);
        // Exactly 70 is neither overbought nor inside the buy band.
        assert_eq!(resolve_signal(Some(Trend::Bullish), 70.0), TechnicalSignal::Hold);
    }
}
