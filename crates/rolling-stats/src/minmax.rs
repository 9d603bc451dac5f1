use std::collections::VecDeque;

/// Monotonic-deque sliding extremum. The deque holds (sample index, value)
/// pairs with values ordered so the front is the current extremum; entries
/// age out once they fall `window` samples behind.
#[derive(Debug, Clone)]
struct MonotonicWindow {
    deque: VecDeque<(u64, f64)>,
    window: usize,
    next_index: u64,
    /// true when `candidate` should evict `incumbent` from the tail.
    evict_tail: fn(incumbent: f64, candidate: f64) -> bool,
}

impl MonotonicWindow {
    fn new(window: usize, evict_tail: fn(f64, f64) -> bool) -> Self {
        Self {
            deque: VecDeque::new(),
            window: window.max(1),
            next_index: 0,
            evict_tail,
        }
    }

    fn add(&mut self, value: f64) {
        while let Some(&(_, tail)) = self.deque.back() {
            if (self.evict_tail)(tail, value) {
                self.deque.pop_back();
            } else {
                break;
            }
        }
        self.deque.push_back((self.next_index, value));
        self.next_index += 1;
        let cutoff = self.next_index.saturating_sub(self.window as u64);
        while let Some(&(idx, _)) = self.deque.front() {
            if idx < cutoff {
                self.deque.pop_front();
            } else {
                break;
            }
        }
    }

    /// The extremum as it would be after `add(value)`, computed against the
    /// head state without mutating the deque.
    fn preview(&self, value: f64) -> f64 {
        let cutoff = (self.next_index + 1).saturating_sub(self.window as u64);
        for &(idx, v) in &self.deque {
            if idx < cutoff {
                continue;
            }
            // Front survivor is the extremum among retained samples; the
            // candidate itself may still beat it.
            return if (self.evict_tail)(v, value) { value } else { v };
        }
        value
    }

    fn get(&self) -> Option<f64> {
        self.deque.front().map(|&(_, v)| v)
    }

    fn observed(&self) -> u64 {
        self.next_index
    }

    fn clear(&mut self) {
        self.deque.clear();
        self.next_index = 0;
    }
}

/// Sliding-window maximum in amortized O(1).
#[derive(Debug, Clone)]
pub struct RollingMax {
    inner: MonotonicWindow,
}

impl RollingMax {
    pub fn new(window: usize) -> Self {
        Self {
            inner: MonotonicWindow::new(window, |incumbent, candidate| incumbent <= candidate),
        }
    }

    pub fn add(&mut self, value: f64) {
        self.inner.add(value);
    }

    pub fn preview(&self, value: f64) -> f64 {
        self.inner.preview(value)
    }

    pub fn get(&self) -> Option<f64> {
        self.inner.get()
    }

    pub fn observed(&self) -> u64 {
        self.inner.observed()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Sliding-window minimum in amortized O(1).
#[derive(Debug, Clone)]
pub struct RollingMin {
    inner: MonotonicWindow,
}

impl RollingMin {
    pub fn new(window: usize) -> Self {
        Self {
            inner: MonotonicWindow::new(window, |incumbent, candidate| incumbent >= candidate),
        }
    }

    pub fn add(&mut self, value: f64) {
        self.inner.add(value);
    }

    pub fn preview(&self, value: f64) -> f64 {
        self.inner.preview(value)
    }

    pub fn get(&self) -> Option<f64> {
        self.inner.get()
    }

    pub fn observed(&self) -> u64 {
        self.inner.observed()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_max_window() {
        let mut max = RollingMax::new(3);
        for v in [1.0, 3.0, 2.0] {
            max.add(v);
        }
        assert_eq!(max.get(), Some(3.0));
        max.add(1.5);
        // window is now [3, 2, 1.5]
        assert_eq!(max.get(), Some(3.0));
        max.add(1.0);
        // window is now [2, 1.5, 1]
        assert_eq!(max.get(), Some(2.0));
    }

    #[test]
    fn test_rolling_min_window() {
        let mut min = RollingMin::new(3);
        for v in [5.0, 2.0, 4.0] {
            min.add(v);
        }
        assert_eq!(min.get(), Some(2.0));
        min.add(6.0);
        assert_eq!(min.get(), Some(2.0));
        min.add(6.5);
        // window is now [4, 6, 6.5]
        assert_eq!(min.get(), Some(4.0));
    }

    #[test]
    fn test_preview_is_pure_and_matches_add() {
        let mut max = RollingMax::new(4);
        let mut reference = RollingMax::new(4);
        for v in [3.0, 7.0, 1.0, 4.0, 2.0, 9.0, 0.5, 0.5, 0.5, 0.5, 8.0] {
            let previewed = max.preview(v);
            assert_eq!(previewed, max.preview(v));
            max.add(v);
            reference.add(v);
            assert_eq!(Some(previewed), max.get());
            assert_eq!(max.get(), reference.get());
        }
    }

    #[test]
    fn test_preview_with_aged_out_front() {
        let mut max = RollingMax::new(2);
        max.add(10.0);
        max.add(5.0);
        // Committing 1.0 would age out the 10.0 sample
        assert_eq!(max.preview(1.0), 5.0);
        assert_eq!(max.get(), Some(10.0));
    }

    #[test]
    fn test_min_preview_candidate_wins() {
        let mut min = RollingMin::new(3);
        min.add(4.0);
        min.add(3.0);
        assert_eq!(min.preview(1.0), 1.0);
        assert_eq!(min.preview(5.0), 3.0);
    }
}
