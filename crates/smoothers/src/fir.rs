use crate::Smoother;
use rolling_stats::RingBuffer;

/// FIR filter over the trailing window with weights precomputed at
/// construction. `weights[j]` applies `j` bars back from the newest sample;
/// partial windows renormalize over the weights actually used.
#[derive(Debug, Clone)]
struct WindowedFir {
    weights: Vec<f64>,
    ring: RingBuffer<f64>,
}

impl WindowedFir {
    fn new(weights: Vec<f64>) -> Self {
        let history = weights.len().saturating_sub(1).max(1);
        Self {
            ring: RingBuffer::new(history),
            weights,
        }
    }

    fn compute_with(&self, candidate: f64) -> f64 {
        let mut num = self.weights[0] * candidate;
        let mut den = self.weights[0];
        let take = self.ring.len().min(self.weights.len() - 1);
        for j in 0..take {
            if let Some(&v) = self.ring.at_lag(j) {
                num += self.weights[j + 1] * v;
                den += self.weights[j + 1];
            }
        }
        num / den
    }

    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        let out = self.compute_with(value);
        if is_final && self.weights.len() > 1 {
            self.ring.push(value);
        }
        out
    }

    fn reset(&mut self) {
        self.ring.clear();
    }
}

/// Hann-windowed moving average.
#[derive(Debug, Clone)]
pub struct HannMa {
    inner: WindowedFir,
}

impl HannMa {
    pub fn new(length: usize) -> Self {
        let length = length.max(1);
        let weights = (0..length)
            .map(|j| {
                let phase = 2.0 * std::f64::consts::PI * (j as f64 + 1.0) / (length as f64 + 1.0);
                1.0 - phase.cos()
            })
            .collect();
        Self {
            inner: WindowedFir::new(weights),
        }
    }
}

impl Smoother for HannMa {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        self.inner.next(value, is_final)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// Hamming-windowed moving average.
#[derive(Debug, Clone)]
pub struct HammingMa {
    inner: WindowedFir,
}

impl HammingMa {
    pub fn new(length: usize) -> Self {
        let length = length.max(1);
        let weights = if length == 1 {
            vec![1.0]
        } else {
            (0..length)
                .map(|j| {
                    let phase =
                        2.0 * std::f64::consts::PI * j as f64 / (length as f64 - 1.0);
                    0.54 - 0.46 * phase.cos()
                })
                .collect()
        };
        Self {
            inner: WindowedFir::new(weights),
        }
    }
}

impl Smoother for HammingMa {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        self.inner.next(value, is_final)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}
