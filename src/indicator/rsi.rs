use super::ring::RingBuffer;

/// Value reported while fewer than `period` deltas have been observed.
pub const RSI_NEUTRAL: f64 = 50.0;

/// Relative Strength Index over the simple mean of the last `period` gains and
/// losses (no Wilder smoothing).
#[derive(Debug, Clone)]
pub struct Rsi {
    gains: RingBuffer,
    losses: RingBuffer,
    last_price: Option<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be > 0");
        Self {
            gains: RingBuffer::new(period),
            losses: RingBuffer::new(period),
            last_price: None,
        }
    }

    pub fn push(&mut self, price: f64) -> Option<f64> {
        if let Some(last) = self.last_price {
            let delta = price - last;
            if delta > 0.0 {
                self.gains.push(delta);
                self.losses.push(0.0);
            } else {
                self.gains.push(0.0);
                self.losses.push(delta.abs());
            }
        }
        self.last_price = Some(price);
        self.value()
    }

    /// `None` until the delta windows are full.
    pub fn value(&self) -> Option<f64> {
        if !self.gains.is_full() {
            return None;
        }
        let avg_gain = self.gains.mean()?;
        let avg_loss = self.losses.mean()?;
        // Means are summed fresh from the window so a run without losses is exactly 0.
        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }

    pub fn value_or_neutral(&self) -> f64 {
        self.value().unwrap_or(RSI_NEUTRAL)
    }
}
