//! Small numeric helpers shared across indicator families.

use stream_core::Bar;

/// Wilder's smoothed running sum: `s' = s - s/n + x`, applied from the first
/// sample onward.
#[derive(Debug, Clone)]
pub struct WilderSum {
    length: f64,
    sum: f64,
}

impl WilderSum {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1) as f64,
            sum: 0.0,
        }
    }

    pub fn add(&mut self, value: f64) -> f64 {
        self.sum = self.sum - self.sum / self.length + value;
        self.sum
    }

    /// The sum as it would be after `add(value)`, without mutating.
    pub fn preview(&self, value: f64) -> f64 {
        self.sum - self.sum / self.length + value
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn clear(&mut self) {
        self.sum = 0.0;
    }
}

/// True range against the previous close; plain high-low on the first bar.
pub fn true_range(bar: &Bar, prev_close: Option<f64>) -> f64 {
    match prev_close {
        None => bar.high - bar.low,
        Some(pc) => (bar.high - bar.low)
            .max((bar.high - pc).abs())
            .max((bar.low - pc).abs()),
    }
}

/// `numerator / denominator`, or `fallback` when the denominator is zero or
/// not finite.
pub fn safe_div(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        fallback
    } else {
        numerator / denominator
    }
}
