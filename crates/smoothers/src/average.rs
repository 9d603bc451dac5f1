use crate::Smoother;
use rolling_stats::{RingBuffer, RollingSum};

/// Simple moving average. Warm-up averages the observed prefix.
#[derive(Debug, Clone)]
pub struct Sma {
    sum: RollingSum,
}

impl Sma {
    pub fn new(length: usize) -> Self {
        Self {
            sum: RollingSum::new(length.max(1)),
        }
    }
}

impl Smoother for Sma {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        if is_final {
            self.sum.add(value);
            self.sum.mean()
        } else {
            self.sum.preview_mean(value)
        }
    }

    fn reset(&mut self) {
        self.sum.clear();
    }
}

/// Exponential moving average seeded with the first input.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    prev: Option<f64>,
}

impl Ema {
    pub fn new(length: usize) -> Self {
        let length = length.max(1);
        Self::with_alpha(2.0 / (length as f64 + 1.0))
    }

    pub fn with_alpha(alpha: f64) -> Self {
        Self { alpha, prev: None }
    }

    fn compute(&self, value: f64) -> f64 {
        match self.prev {
            None => value,
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
        }
    }
}

impl Smoother for Ema {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        let out = self.compute(value);
        if is_final {
            self.prev = Some(out);
        }
        out
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}

/// Wilders smoothing: an EMA with alpha = 1/length.
#[derive(Debug, Clone)]
pub struct WildersMa {
    inner: Ema,
}

impl WildersMa {
    pub fn new(length: usize) -> Self {
        let length = length.max(1);
        Self {
            inner: Ema::with_alpha(1.0 / length as f64),
        }
    }
}

impl Smoother for WildersMa {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        self.inner.next(value, is_final)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// Linearly weighted moving average, newest sample heaviest.
#[derive(Debug, Clone)]
pub struct Wma {
    ring: RingBuffer<f64>,
}

impl Wma {
    pub fn new(length: usize) -> Self {
        Self {
            ring: RingBuffer::new(length.max(1)),
        }
    }

    fn compute_with(&self, candidate: f64) -> f64 {
        let skip = if self.ring.is_full() { 1 } else { 0 };
        let mut weight = 1.0;
        let mut num = 0.0;
        let mut den = 0.0;
        for &v in self.ring.iter().skip(skip) {
            num += weight * v;
            den += weight;
            weight += 1.0;
        }
        num += weight * candidate;
        den += weight;
        num / den
    }
}

impl Smoother for Wma {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        let out = self.compute_with(value);
        if is_final {
            self.ring.push(value);
        }
        out
    }

    fn reset(&mut self) {
        self.ring.clear();
    }
}

/// Triangular moving average: an SMA of an SMA with split lengths.
#[derive(Debug, Clone)]
pub struct TriangularMa {
    first: RollingSum,
    second: RollingSum,
}

impl TriangularMa {
    pub fn new(length: usize) -> Self {
        let length = length.max(1);
        let (len1, len2) = if length % 2 == 0 {
            (length / 2, length / 2 + 1)
        } else {
            (length / 2 + 1, length / 2 + 1)
        };
        Self {
            first: RollingSum::new(len1),
            second: RollingSum::new(len2),
        }
    }
}

impl Smoother for TriangularMa {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        if is_final {
            self.first.add(value);
            let mid = self.first.mean();
            self.second.add(mid);
            self.second.mean()
        } else {
            let mid = self.first.preview_mean(value);
            self.second.preview_mean(mid)
        }
    }

    fn reset(&mut self) {
        self.first.clear();
        self.second.clear();
    }
}

/// Hull moving average: WMA(2·WMA(n/2) − WMA(n)) over sqrt(n).
#[derive(Debug, Clone)]
pub struct HullMa {
    half: Wma,
    full: Wma,
    sqrt: Wma,
}

impl HullMa {
    pub fn new(length: usize) -> Self {
        let length = length.max(1);
        Self {
            half: Wma::new((length / 2).max(1)),
            full: Wma::new(length),
            sqrt: Wma::new(((length as f64).sqrt().round() as usize).max(1)),
        }
    }
}

impl Smoother for HullMa {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        let raw = 2.0 * self.half.next(value, is_final) - self.full.next(value, is_final);
        self.sqrt.next(raw, is_final)
    }

    fn reset(&mut self) {
        self.half.reset();
        self.full.reset();
        self.sqrt.reset();
    }
}

/// Zero-lag EMA: EMA over the de-lagged input `2v − v[lag]`.
#[derive(Debug, Clone)]
pub struct ZeroLagEma {
    lag: usize,
    ring: RingBuffer<f64>,
    ema: Ema,
}

impl ZeroLagEma {
    pub fn new(length: usize) -> Self {
        let length = length.max(1);
        let lag = (length - 1) / 2;
        Self {
            lag,
            ring: RingBuffer::new(lag.max(1)),
            ema: Ema::new(length),
        }
    }

    /// Input `lag` bars back, counting `candidate` as the newest bar. Falls
    /// back to the oldest observed value during warm-up.
    fn lagged(&self, candidate: f64) -> f64 {
        if self.lag == 0 {
            return candidate;
        }
        self.ring
            .at_lag(self.lag - 1)
            .or_else(|| self.ring.oldest())
            .copied()
            .unwrap_or(candidate)
    }
}

impl Smoother for ZeroLagEma {
    fn next(&mut self, value: f64, is_final: bool) -> f64 {
        let delagged = 2.0 * value - self.lagged(value);
        let out = self.ema.next(delagged, is_final);
        if is_final {
            self.ring.push(value);
        }
        out
    }

    fn reset(&mut self) {
        self.ring.clear();
        self.ema.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Smoother;

    #[test]
    fn test_sma_warm_up_uses_observed_values() {
        let mut sma = Sma::new(3);
        assert_eq!(sma.next(10.0, true), 10.0);
        assert_eq!(sma.next(20.0, true), 15.0);
        assert_eq!(sma.next(30.0, true), 20.0);
        assert_eq!(sma.next(40.0, true), 30.0);
    }

    #[test]
    fn test_ema_seeds_with_first_input() {
        let mut ema = Ema::new(9);
        assert_eq!(ema.next(50.0, true), 50.0);
        let second = ema.next(60.0, true);
        let alpha = 2.0 / 10.0;
        assert!((second - (alpha * 60.0 + (1.0 - alpha) * 50.0)).abs() < 1e-12);
    }

    #[test]
    fn test_wilders_alpha() {
        let mut w = WildersMa::new(14);
        w.next(10.0, true);
        let second = w.next(24.0, true);
        assert!((second - (10.0 + (24.0 - 10.0) / 14.0)).abs() < 1e-12);
    }

    #[test]
    fn test_wma_weights_newest_heaviest() {
        let mut wma = Wma::new(3);
        wma.next(1.0, true);
        wma.next(2.0, true);
        let out = wma.next(3.0, true);
        // (1*1 + 2*2 + 3*3) / 6
        assert!((out - 14.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_wma_eviction() {
        let mut wma = Wma::new(2);
        wma.next(1.0, true);
        wma.next(2.0, true);
        let out = wma.next(3.0, true);
        // window [2, 3]: (1*2 + 2*3) / 3
        assert!((out - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_triangular_flat_series() {
        let mut tma = TriangularMa::new(4);
        for _ in 0..10 {
            assert!((tma.next(7.0, true) - 7.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hull_tracks_trend_with_low_lag() {
        let mut hull = HullMa::new(4);
        let mut sma = Sma::new(4);
        let mut last_hull = 0.0;
        let mut last_sma = 0.0;
        for i in 0..20 {
            let v = i as f64;
            last_hull = hull.next(v, true);
            last_sma = sma.next(v, true);
        }
        // Hull hugs a ramp more tightly than the plain SMA
        assert!((19.0 - last_hull).abs() < (19.0 - last_sma).abs());
    }

    #[test]
    fn test_zero_lag_ema_ramp_overshoot() {
        let mut zlema = ZeroLagEma::new(5);
        let mut ema = Ema::new(5);
        let mut z = 0.0;
        let mut e = 0.0;
        for i in 0..30 {
            let v = i as f64;
            z = zlema.next(v, true);
            e = ema.next(v, true);
        }
        assert!(z > e);
    }
}
