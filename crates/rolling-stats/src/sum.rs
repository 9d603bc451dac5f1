use crate::RingBuffer;

/// O(1) rolling sum over the last N contributions.
#[derive(Debug, Clone)]
pub struct RollingSum {
    ring: RingBuffer<f64>,
    sum: f64,
}

impl RollingSum {
    pub fn new(window: usize) -> Self {
        Self {
            ring: RingBuffer::new(window),
            sum: 0.0,
        }
    }

    /// Commit a contribution, returning the evicted one when the window was
    /// already full. The update uses the exact expression `preview` uses so
    /// a previewed value always equals the committed one bit-for-bit.
    pub fn add(&mut self, value: f64) -> Option<f64> {
        let evicted = self.ring.push(value);
        self.sum = self.sum + value - evicted.unwrap_or(0.0);
        evicted
    }

    /// The sum as it would be after `add(value)`, without mutating.
    pub fn preview(&self, value: f64) -> f64 {
        self.sum + value - self.ring.next_eviction().copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Number of contributions currently in the window.
    pub fn count(&self) -> usize {
        self.ring.len()
    }

    pub fn window(&self) -> usize {
        self.ring.capacity()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Mean over the observed contributions (k values when k < N).
    pub fn mean(&self) -> f64 {
        if self.ring.is_empty() {
            0.0
        } else {
            self.sum / self.ring.len() as f64
        }
    }

    /// The mean as it would be after `add(value)`, without mutating.
    pub fn preview_mean(&self, value: f64) -> f64 {
        let count = (self.ring.len() + 1).min(self.ring.capacity());
        self.preview(value) / count as f64
    }

    /// The contribution count as it would be after one more `add`.
    pub fn preview_count(&self) -> usize {
        (self.ring.len() + 1).min(self.ring.capacity())
    }

    /// Oldest contribution still in the window.
    pub fn oldest(&self) -> Option<f64> {
        self.ring.oldest().copied()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.sum = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_sum_evicts() {
        let mut sum = RollingSum::new(3);
        sum.add(1.0);
        sum.add(2.0);
        sum.add(3.0);
        assert_eq!(sum.sum(), 6.0);
        assert_eq!(sum.add(4.0), Some(1.0));
        assert_eq!(sum.sum(), 9.0);
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let mut sum = RollingSum::new(3);
        sum.add(1.0);
        sum.add(2.0);
        sum.add(3.0);
        assert_eq!(sum.preview(4.0), 9.0);
        assert_eq!(sum.preview(4.0), 9.0);
        assert_eq!(sum.sum(), 6.0);
        assert_eq!(sum.count(), 3);
    }

    #[test]
    fn test_partial_window_mean() {
        let mut sum = RollingSum::new(5);
        sum.add(10.0);
        sum.add(20.0);
        // k < N: mean over the k observed values, no phantom zeros
        assert_eq!(sum.mean(), 15.0);
        assert_eq!(sum.preview_mean(30.0), 20.0);
    }

    #[test]
    fn test_preview_matches_subsequent_add() {
        let mut sum = RollingSum::new(4);
        for v in [3.0, 1.0, 4.0, 1.0, 5.0, 9.0] {
            let previewed = sum.preview(v);
            sum.add(v);
            assert_eq!(previewed, sum.sum());
        }
    }
}
