use super::ring::RingBuffer;

/// Simple Moving Average over a ring buffer, O(1) push with a running sum.
#[derive(Debug, Clone)]
pub struct Sma {
    window: RingBuffer,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be > 0");
        Self {
            window: RingBuffer::new(period),
            sum: 0.0,
        }
    }

    /// Push a new value, return the current SMA if enough data.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if let Some(evicted) = self.window.push(value) {
            self.sum -= evicted;
        }
        self.sum += value;
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.window.is_full() {
            Some(self.sum / self.window.capacity() as f64)
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }
}
