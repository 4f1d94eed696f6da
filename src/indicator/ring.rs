/// Fixed-capacity ring buffer. Pushing into a full buffer evicts the oldest
/// value, so memory stays bounded and no allocation happens after `new`.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: Vec<f64>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        Self {
            buffer: vec![0.0; capacity],
            head: 0,
            len: 0,
        }
    }

    /// Push a value and return the evicted one when the buffer was full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.is_full() {
            Some(self.buffer[self.head])
        } else {
            self.len += 1;
            None
        };
        self.buffer[self.head] = value;
        self.head = (self.head + 1) % self.buffer.len();
        evicted
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Most recently pushed value.
    pub fn last(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let cap = self.buffer.len();
        Some(self.buffer[(self.head + cap - 1) % cap])
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let cap = self.buffer.len();
        let start = (self.head + cap - self.len) % cap;
        (0..self.len).map(move |i| self.buffer[(start + i) % cap])
    }

    /// Exact arithmetic mean of the stored values, summed fresh on every call.
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.len as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_then_evicts_oldest() {
        let mut ring = RingBuffer::new(3);
        assert_eq!(ring.push(1.0), None);
        assert_eq!(ring.push(2.0), None);
        assert_eq!(ring.push(3.0), None);
        assert!(ring.is_full());
        assert_eq!(ring.push(4.0), Some(1.0));
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(ring.last(), Some(4.0));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn partial_buffer_iterates_in_push_order() {
        let mut ring = RingBuffer::new(5);
        ring.push(7.0);
        ring.push(8.0);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![7.0, 8.0]);
        assert!((ring.mean().unwrap() - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_buffer_has_no_mean() {
        let ring = RingBuffer::new(2);
        assert_eq!(ring.mean(), None);
        assert_eq!(ring.last(), None);
    }

    #[test]
    #[should_panic(expected = "ring buffer capacity must be > 0")]
    fn zero_capacity_panics() {
        RingBuffer::new(0);
    }
}
