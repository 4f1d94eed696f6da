use super::sma::Sma;

/// Exponential Moving Average, seeded with the SMA of its first `period` samples.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    ema: Option<f64>,
    seed: Sma,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be > 0");
        Self {
            alpha: 2.0 / (period as f64 + 1.0),
            ema: None,
            seed: Sma::new(period),
        }
    }

    /// Push a new value, return the current EMA if enough data.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.ema = match self.ema {
            Some(prev) => Some(value * self.alpha + prev * (1.0 - self.alpha)),
            // Undefined until the seed window fills; the filling sample seeds it.
            None => self.seed.push(value),
        };
        self.ema
    }

    pub fn value(&self) -> Option<f64> {
        self.ema
    }

    pub fn is_ready(&self) -> bool {
        self.ema.is_some()
    }
}
