//! Ehlers cycle-analysis filters.

use crate::input::BarInput;
use crate::util::safe_div;
use rolling_stats::RingBuffer;
use smoothers::{Smoother, SuperSmoother2Pole};
use std::f64::consts::PI;
use stream_core::{Bar, IndicatorName, IndicatorState, IndicatorValue, StreamError};

/// Second-order highpass with the 0.707 critical damping Ehlers uses in the
/// roofing filter. Coefficient computed once at construction.
#[derive(Debug, Clone)]
struct Highpass2 {
    alpha: f64,
    v1: f64,
    v2: f64,
    hp1: f64,
    hp2: f64,
    count: u64,
}

impl Highpass2 {
    fn new(period: usize) -> Self {
        let period = period.max(2) as f64;
        let phase = 0.707 * 2.0 * PI / period;
        let alpha = (phase.cos() + phase.sin() - 1.0) / phase.cos();
        Self {
            alpha,
            v1: 0.0,
            v2: 0.0,
            hp1: 0.0,
            hp2: 0.0,
            count: 0,
        }
    }

    fn evaluate(&self, v: f64) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let a = self.alpha;
        (1.0 - a / 2.0).powi(2) * (v - 2.0 * self.v1 + self.v2) + 2.0 * (1.0 - a) * self.hp1
            - (1.0 - a).powi(2) * self.hp2
    }

    fn commit(&mut self, v: f64, hp: f64) {
        self.hp2 = self.hp1;
        self.hp1 = hp;
        self.v2 = self.v1;
        self.v1 = v;
        self.count += 1;
    }

    fn clear(&mut self) {
        self.v1 = 0.0;
        self.v2 = 0.0;
        self.hp1 = 0.0;
        self.hp2 = 0.0;
        self.count = 0;
    }
}

/// Roofing filter: highpass to strip the trend, super smoother to strip
/// aliasing noise.
pub struct RoofingFilter {
    input: BarInput,
    highpass: Highpass2,
    smoother: SuperSmoother2Pole,
}

impl RoofingFilter {
    pub fn new(
        lowpass_length: usize,
        highpass_length: usize,
        input: BarInput,
    ) -> Result<Self, StreamError> {
        StreamError::require_length("RoofingFilter lowpass", lowpass_length)?;
        StreamError::require_length("RoofingFilter highpass", highpass_length)?;
        Ok(Self {
            input,
            highpass: Highpass2::new(highpass_length),
            smoother: SuperSmoother2Pole::new(lowpass_length),
        })
    }
}

impl IndicatorState for RoofingFilter {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let hp = self.highpass.evaluate(v);
        let out = self.smoother.next(hp, is_final);
        if is_final {
            self.highpass.commit(v, hp);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Roofing", out), ("Highpass", hp)])
    }

    fn reset(&mut self) {
        self.highpass.clear();
        self.smoother.reset();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::RoofingFilter
    }
}

/// Simple decycler: price minus its highpass component.
pub struct Decycler {
    input: BarInput,
    highpass: Highpass2,
}

impl Decycler {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Decycler", length)?;
        Ok(Self {
            input,
            highpass: Highpass2::new(length),
        })
    }
}

impl IndicatorState for Decycler {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let hp = self.highpass.evaluate(v);
        let out = v - hp;
        if is_final {
            self.highpass.commit(v, hp);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Decycler", out), ("Highpass", hp)])
    }

    fn reset(&mut self) {
        self.highpass.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Decycler
    }
}

/// Pearson correlation of price against time over the trailing window.
/// +1 is a perfect up-sloping line, -1 a perfect down-sloping line.
pub struct CorrelationTrend {
    input: BarInput,
    ring: RingBuffer<f64>,
}

impl CorrelationTrend {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("CorrelationTrend", length)?;
        Ok(Self {
            input,
            ring: RingBuffer::new(length),
        })
    }

    fn evaluate(&self, candidate: f64) -> f64 {
        let skip = if self.ring.is_full() { 1 } else { 0 };
        let mut k = 0.0;
        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut sxx = 0.0;
        let mut syy = 0.0;
        let mut sxy = 0.0;
        for &y in self.ring.iter().skip(skip).chain(std::iter::once(&candidate)) {
            let x = k;
            sx += x;
            sy += y;
            sxx += x * x;
            syy += y * y;
            sxy += x * y;
            k += 1.0;
        }
        if k < 2.0 {
            return 0.0;
        }
        let denom = ((k * sxx - sx * sx) * (k * syy - sy * sy)).sqrt();
        safe_div(k * sxy - sx * sy, denom, 0.0)
    }
}

impl IndicatorState for CorrelationTrend {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = self.evaluate(v);
        if is_final {
            self.ring.push(v);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("CorrelationTrend", out)])
    }

    fn reset(&mut self) {
        self.ring.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::CorrelationTrend
    }
}

/// Ehlers autocorrelation periodogram: dominant cycle period extracted from
/// lag correlations of the roofed price. Work per update is quadratic in the
/// maximum period, which is why the catalog prices it High.
pub struct AutocorrelationPeriodogram {
    input: BarInput,
    highpass: Highpass2,
    smoother: SuperSmoother2Pole,
    filt_ring: RingBuffer<f64>,
    avg_length: usize,
    max_period: usize,
}

impl AutocorrelationPeriodogram {
    const MIN_PERIOD: usize = 10;

    pub fn new(
        avg_length: usize,
        max_period: usize,
        input: BarInput,
    ) -> Result<Self, StreamError> {
        StreamError::require_length("AutocorrelationPeriodogram averaging", avg_length)?;
        if max_period < Self::MIN_PERIOD {
            return Err(StreamError::InvalidConfiguration(format!(
                "AutocorrelationPeriodogram max period must be >= {}, got {}",
                Self::MIN_PERIOD,
                max_period
            )));
        }
        Ok(Self {
            input,
            highpass: Highpass2::new(max_period),
            smoother: SuperSmoother2Pole::new(Self::MIN_PERIOD),
            filt_ring: RingBuffer::new(avg_length + max_period),
            avg_length,
            max_period,
        })
    }

    /// Pearson correlation between the newest `m` filter values and the same
    /// window shifted back by `lag`. `series` is newest-first.
    fn lag_correlation(series: &[f64], lag: usize, m: usize) -> f64 {
        if series.len() < m + lag {
            return 0.0;
        }
        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut sxx = 0.0;
        let mut syy = 0.0;
        let mut sxy = 0.0;
        for i in 0..m {
            let x = series[i];
            let y = series[i + lag];
            sx += x;
            sy += y;
            sxx += x * x;
            syy += y * y;
            sxy += x * y;
        }
        let m = m as f64;
        let denom = ((m * sxx - sx * sx) * (m * syy - sy * sy)).sqrt();
        safe_div(m * sxy - sx * sy, denom, 0.0)
    }

    /// (dominant period, max raw power) over the lag spectrum.
    fn evaluate(&self, candidate_filt: f64) -> (f64, f64) {
        // Newest-first view of the filter history including the candidate.
        let mut series = Vec::with_capacity(self.filt_ring.len() + 1);
        series.push(candidate_filt);
        for j in 0..self.filt_ring.len() {
            if let Some(&v) = self.filt_ring.at_lag(j) {
                series.push(v);
            }
        }

        let correlations: Vec<f64> = (0..=self.max_period)
            .map(|lag| Self::lag_correlation(&series, lag, self.avg_length))
            .collect();

        let mut powers = vec![0.0; self.max_period + 1];
        let mut max_power = 0.0_f64;
        for period in Self::MIN_PERIOD..=self.max_period {
            let mut cosine = 0.0;
            let mut sine = 0.0;
            for (lag, corr) in correlations.iter().enumerate() {
                let phase = 2.0 * PI * lag as f64 / period as f64;
                cosine += corr * phase.cos();
                sine += corr * phase.sin();
            }
            let power = cosine * cosine + sine * sine;
            powers[period] = power;
            max_power = max_power.max(power);
        }

        if max_power <= 0.0 {
            return (0.0, 0.0);
        }

        // Center of gravity over the strong half of the normalized spectrum.
        let mut weighted = 0.0;
        let mut total = 0.0;
        for period in Self::MIN_PERIOD..=self.max_period {
            let normalized = powers[period] / max_power;
            if normalized >= 0.5 {
                weighted += period as f64 * normalized;
                total += normalized;
            }
        }
        (safe_div(weighted, total, 0.0), max_power)
    }
}

impl IndicatorState for AutocorrelationPeriodogram {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let hp = self.highpass.evaluate(v);
        let filt = self.smoother.next(hp, is_final);
        let (dominant, max_power) = self.evaluate(filt);
        if is_final {
            self.highpass.commit(v, hp);
            self.filt_ring.push(filt);
        }
        IndicatorValue::with_outputs(
            dominant,
            include_outputs,
            [("DominantCycle", dominant), ("MaxPower", max_power)],
        )
    }

    fn reset(&mut self) {
        self.highpass.clear();
        self.smoother.reset();
        self.filt_ring.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::AutocorrelationPeriodogram
    }
}
