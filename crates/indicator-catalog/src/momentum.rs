//! Momentum oscillators.

use crate::input::BarInput;
use crate::util::safe_div;
use rolling_stats::{RingBuffer, RollingMax, RollingMin, RollingSum};
use smoothers::{Ema, Sma, Smoother, WildersMa};
use stream_core::{Bar, IndicatorName, IndicatorState, IndicatorValue, StreamError};

/// Relative strength index over Wilders-smoothed gains and losses.
pub struct Rsi {
    input: BarInput,
    avg_gain: WildersMa,
    avg_loss: WildersMa,
    prev_input: Option<f64>,
}

impl Rsi {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Rsi", length)?;
        Ok(Self {
            input,
            avg_gain: WildersMa::new(length),
            avg_loss: WildersMa::new(length),
            prev_input: None,
        })
    }

    fn step(&mut self, v: f64, is_final: bool) -> f64 {
        let Some(prev) = self.prev_input else {
            if is_final {
                self.prev_input = Some(v);
            }
            return 50.0;
        };
        let change = v - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let avg_gain = self.avg_gain.next(gain, is_final);
        let avg_loss = self.avg_loss.next(loss, is_final);
        if is_final {
            self.prev_input = Some(v);
        }
        if avg_loss == 0.0 {
            return if avg_gain == 0.0 { 50.0 } else { 100.0 };
        }
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

impl IndicatorState for Rsi {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = self.step(v, is_final);
        IndicatorValue::with_outputs(out, include_outputs, [("Rsi", out)])
    }

    fn reset(&mut self) {
        self.avg_gain.reset();
        self.avg_loss.reset();
        self.prev_input = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Rsi
    }
}

/// MACD line with its signal and histogram.
pub struct Macd {
    input: BarInput,
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(
        fast: usize,
        slow: usize,
        signal: usize,
        input: BarInput,
    ) -> Result<Self, StreamError> {
        StreamError::require_length("Macd fast", fast)?;
        StreamError::require_length("Macd slow", slow)?;
        StreamError::require_length("Macd signal", signal)?;
        if slow < fast {
            return Err(StreamError::InvalidConfiguration(format!(
                "Macd slow length {} must be >= fast length {}",
                slow, fast
            )));
        }
        Ok(Self {
            input,
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        })
    }
}

impl IndicatorState for Macd {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let fast = self.fast.next(v, is_final);
        let slow = self.slow.next(v, is_final);
        let macd = fast - slow;
        let signal = self.signal.next(macd, is_final);
        let histogram = macd - signal;
        IndicatorValue::with_outputs(
            macd,
            include_outputs,
            [("Macd", macd), ("Signal", signal), ("Histogram", histogram)],
        )
    }

    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Macd
    }
}

/// Percent rate of change against the value `length` bars back. During
/// warm-up the oldest observed value stands in.
pub struct Roc {
    input: BarInput,
    ring: RingBuffer<f64>,
}

impl Roc {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Roc", length)?;
        Ok(Self {
            input,
            ring: RingBuffer::new(length),
        })
    }
}

impl IndicatorState for Roc {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let reference = self.ring.oldest().copied().unwrap_or(v);
        let out = safe_div(100.0 * (v - reference), reference, 0.0);
        if is_final {
            self.ring.push(v);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Roc", out)])
    }

    fn reset(&mut self) {
        self.ring.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Roc
    }
}

/// Raw price difference against the value `length` bars back.
pub struct Momentum {
    input: BarInput,
    ring: RingBuffer<f64>,
}

impl Momentum {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Momentum", length)?;
        Ok(Self {
            input,
            ring: RingBuffer::new(length),
        })
    }
}

impl IndicatorState for Momentum {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let reference = self.ring.oldest().copied().unwrap_or(v);
        let out = v - reference;
        if is_final {
            self.ring.push(v);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Momentum", out)])
    }

    fn reset(&mut self) {
        self.ring.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Momentum
    }
}

/// Stochastic oscillator: smoothed %K with a %D signal line.
pub struct Stochastic {
    highs: RollingMax,
    lows: RollingMin,
    smooth_k: Sma,
    smooth_d: Sma,
}

impl Stochastic {
    pub fn new(k_length: usize, k_smoothing: usize, d_length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("Stochastic %K", k_length)?;
        StreamError::require_length("Stochastic %K smoothing", k_smoothing)?;
        StreamError::require_length("Stochastic %D", d_length)?;
        Ok(Self {
            highs: RollingMax::new(k_length),
            lows: RollingMin::new(k_length),
            smooth_k: Sma::new(k_smoothing),
            smooth_d: Sma::new(d_length),
        })
    }

    fn step(&mut self, bar: &Bar, is_final: bool) -> (f64, f64, f64) {
        let (highest, lowest) = if is_final {
            self.highs.add(bar.high);
            self.lows.add(bar.low);
            (
                self.highs.get().unwrap_or(bar.high),
                self.lows.get().unwrap_or(bar.low),
            )
        } else {
            (self.highs.preview(bar.high), self.lows.preview(bar.low))
        };
        let fast_k = if highest == lowest {
            50.0
        } else {
            100.0 * (bar.close - lowest) / (highest - lowest)
        };
        let slow_k = self.smooth_k.next(fast_k, is_final);
        let slow_d = self.smooth_d.next(slow_k, is_final);
        (fast_k, slow_k, slow_d)
    }
}

impl IndicatorState for Stochastic {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let (fast_k, slow_k, slow_d) = self.step(bar, is_final);
        IndicatorValue::with_outputs(
            slow_k,
            include_outputs,
            [("FastK", fast_k), ("SlowK", slow_k), ("SlowD", slow_d)],
        )
    }

    fn reset(&mut self) {
        self.highs.clear();
        self.lows.clear();
        self.smooth_k.reset();
        self.smooth_d.reset();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Stochastic
    }
}

/// Stochastic applied to an embedded RSI stream. `is_final` is forwarded to
/// the inner state unchanged.
pub struct StochasticRsi {
    rsi: Rsi,
    highs: RollingMax,
    lows: RollingMin,
    smooth_k: Sma,
    smooth_d: Sma,
}

impl StochasticRsi {
    pub fn new(
        rsi_length: usize,
        stoch_length: usize,
        k_smoothing: usize,
        d_length: usize,
        input: BarInput,
    ) -> Result<Self, StreamError> {
        StreamError::require_length("StochasticRsi stochastic", stoch_length)?;
        StreamError::require_length("StochasticRsi %K smoothing", k_smoothing)?;
        StreamError::require_length("StochasticRsi %D", d_length)?;
        Ok(Self {
            rsi: Rsi::new(rsi_length, input)?,
            highs: RollingMax::new(stoch_length),
            lows: RollingMin::new(stoch_length),
            smooth_k: Sma::new(k_smoothing),
            smooth_d: Sma::new(d_length),
        })
    }
}

impl IndicatorState for StochasticRsi {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let rsi = self.rsi.update(bar, is_final, false).value;
        let (highest, lowest) = if is_final {
            self.highs.add(rsi);
            self.lows.add(rsi);
            (
                self.highs.get().unwrap_or(rsi),
                self.lows.get().unwrap_or(rsi),
            )
        } else {
            (self.highs.preview(rsi), self.lows.preview(rsi))
        };
        let fast_k = if highest == lowest {
            50.0
        } else {
            100.0 * (rsi - lowest) / (highest - lowest)
        };
        let slow_k = self.smooth_k.next(fast_k, is_final);
        let slow_d = self.smooth_d.next(slow_k, is_final);
        IndicatorValue::with_outputs(
            slow_k,
            include_outputs,
            [("Rsi", rsi), ("SlowK", slow_k), ("SlowD", slow_d)],
        )
    }

    fn reset(&mut self) {
        self.rsi.reset();
        self.highs.clear();
        self.lows.clear();
        self.smooth_k.reset();
        self.smooth_d.reset();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::StochasticRsi
    }
}

/// Williams %R.
pub struct WilliamsR {
    highs: RollingMax,
    lows: RollingMin,
}

impl WilliamsR {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("WilliamsR", length)?;
        Ok(Self {
            highs: RollingMax::new(length),
            lows: RollingMin::new(length),
        })
    }
}

impl IndicatorState for WilliamsR {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let (highest, lowest) = if is_final {
            self.highs.add(bar.high);
            self.lows.add(bar.low);
            (
                self.highs.get().unwrap_or(bar.high),
                self.lows.get().unwrap_or(bar.low),
            )
        } else {
            (self.highs.preview(bar.high), self.lows.preview(bar.low))
        };
        let out = if highest == lowest {
            -50.0
        } else {
            -100.0 * (highest - bar.close) / (highest - lowest)
        };
        IndicatorValue::with_outputs(out, include_outputs, [("WilliamsR", out)])
    }

    fn reset(&mut self) {
        self.highs.clear();
        self.lows.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::WilliamsR
    }
}

/// Commodity channel index over the typical price.
pub struct Cci {
    input: BarInput,
    ring: RingBuffer<f64>,
    sum: RollingSum,
}

impl Cci {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Cci", length)?;
        Ok(Self {
            input,
            ring: RingBuffer::new(length),
            sum: RollingSum::new(length),
        })
    }

    fn evaluate(&self, candidate: f64) -> f64 {
        let mean = self.sum.preview_mean(candidate);
        let skip = if self.ring.is_full() { 1 } else { 0 };
        let mut deviation = 0.0;
        let mut k = 0.0;
        for &v in self.ring.iter().skip(skip).chain(std::iter::once(&candidate)) {
            deviation += (v - mean).abs();
            k += 1.0;
        }
        let mean_deviation = deviation / k;
        safe_div(candidate - mean, 0.015 * mean_deviation, 0.0)
    }
}

impl IndicatorState for Cci {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = self.evaluate(v);
        if is_final {
            self.ring.push(v);
            self.sum.add(v);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Cci", out)])
    }

    fn reset(&mut self) {
        self.ring.clear();
        self.sum.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Cci
    }
}

/// Chande momentum oscillator over rolling up/down move sums.
pub struct Cmo {
    input: BarInput,
    ups: RollingSum,
    downs: RollingSum,
    prev_input: Option<f64>,
}

impl Cmo {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Cmo", length)?;
        Ok(Self {
            input,
            ups: RollingSum::new(length),
            downs: RollingSum::new(length),
            prev_input: None,
        })
    }
}

impl IndicatorState for Cmo {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = match self.prev_input {
            None => 0.0,
            Some(prev) => {
                let change = v - prev;
                let gain = change.max(0.0);
                let loss = (-change).max(0.0);
                let (su, sd) = if is_final {
                    self.ups.add(gain);
                    self.downs.add(loss);
                    (self.ups.sum(), self.downs.sum())
                } else {
                    (self.ups.preview(gain), self.downs.preview(loss))
                };
                safe_div(100.0 * (su - sd), su + sd, 0.0)
            }
        };
        if is_final {
            self.prev_input = Some(v);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Cmo", out)])
    }

    fn reset(&mut self) {
        self.ups.clear();
        self.downs.clear();
        self.prev_input = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Cmo
    }
}

/// Ehlers Fisher transform of the normalized price position.
pub struct FisherTransform {
    input: BarInput,
    highs: RollingMax,
    lows: RollingMin,
    value1: f64,
    fisher: f64,
}

impl FisherTransform {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("FisherTransform", length)?;
        Ok(Self {
            input,
            highs: RollingMax::new(length),
            lows: RollingMin::new(length),
            value1: 0.0,
            fisher: 0.0,
        })
    }

    fn evaluate(&self, v: f64, highest: f64, lowest: f64) -> (f64, f64) {
        let position = if highest == lowest {
            0.0
        } else {
            2.0 * ((v - lowest) / (highest - lowest) - 0.5)
        };
        let value1 = (0.33 * position + 0.67 * self.value1).clamp(-0.999, 0.999);
        let fisher = 0.5 * ((1.0 + value1) / (1.0 - value1)).ln() + 0.5 * self.fisher;
        (value1, fisher)
    }
}

impl IndicatorState for FisherTransform {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let (highest, lowest) = if is_final {
            self.highs.add(v);
            self.lows.add(v);
            (self.highs.get().unwrap_or(v), self.lows.get().unwrap_or(v))
        } else {
            (self.highs.preview(v), self.lows.preview(v))
        };
        let trigger = self.fisher;
        let (value1, fisher) = self.evaluate(v, highest, lowest);
        if is_final {
            self.value1 = value1;
            self.fisher = fisher;
        }
        IndicatorValue::with_outputs(
            fisher,
            include_outputs,
            [("Fisher", fisher), ("Trigger", trigger)],
        )
    }

    fn reset(&mut self) {
        self.highs.clear();
        self.lows.clear();
        self.value1 = 0.0;
        self.fisher = 0.0;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::FisherTransform
    }
}

/// Awesome oscillator: fast minus slow SMA of the median price.
pub struct AwesomeOscillator {
    fast: RollingSum,
    slow: RollingSum,
}

impl AwesomeOscillator {
    pub fn new(fast: usize, slow: usize) -> Result<Self, StreamError> {
        StreamError::require_length("AwesomeOscillator fast", fast)?;
        StreamError::require_length("AwesomeOscillator slow", slow)?;
        Ok(Self {
            fast: RollingSum::new(fast),
            slow: RollingSum::new(slow),
        })
    }
}

impl IndicatorState for AwesomeOscillator {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let median = (bar.high + bar.low) / 2.0;
        let (fast, slow) = if is_final {
            self.fast.add(median);
            self.slow.add(median);
            (self.fast.mean(), self.slow.mean())
        } else {
            (
                self.fast.preview_mean(median),
                self.slow.preview_mean(median),
            )
        };
        let out = fast - slow;
        IndicatorValue::with_outputs(
            out,
            include_outputs,
            [("Ao", out), ("Fast", fast), ("Slow", slow)],
        )
    }

    fn reset(&mut self) {
        self.fast.clear();
        self.slow.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::AwesomeOscillator
    }
}

/// Ultimate oscillator over three horizons of buying pressure.
pub struct UltimateOscillator {
    bp: [RollingSum; 3],
    tr: [RollingSum; 3],
    prev_close: Option<f64>,
}

impl UltimateOscillator {
    pub fn new(short: usize, medium: usize, long: usize) -> Result<Self, StreamError> {
        StreamError::require_length("UltimateOscillator short", short)?;
        StreamError::require_length("UltimateOscillator medium", medium)?;
        StreamError::require_length("UltimateOscillator long", long)?;
        Ok(Self {
            bp: [
                RollingSum::new(short),
                RollingSum::new(medium),
                RollingSum::new(long),
            ],
            tr: [
                RollingSum::new(short),
                RollingSum::new(medium),
                RollingSum::new(long),
            ],
            prev_close: None,
        })
    }

    fn step(&mut self, bar: &Bar, is_final: bool) -> f64 {
        let floor = match self.prev_close {
            Some(pc) => bar.low.min(pc),
            None => bar.low,
        };
        let ceiling = match self.prev_close {
            Some(pc) => bar.high.max(pc),
            None => bar.high,
        };
        let bp = bar.close - floor;
        let tr = ceiling - floor;

        let mut averages = [0.0; 3];
        for i in 0..3 {
            let (sum_bp, sum_tr) = if is_final {
                self.bp[i].add(bp);
                self.tr[i].add(tr);
                (self.bp[i].sum(), self.tr[i].sum())
            } else {
                (self.bp[i].preview(bp), self.tr[i].preview(tr))
            };
            averages[i] = safe_div(sum_bp, sum_tr, 0.0);
        }
        if is_final {
            self.prev_close = Some(bar.close);
        }
        100.0 * (4.0 * averages[0] + 2.0 * averages[1] + averages[2]) / 7.0
    }
}

impl IndicatorState for UltimateOscillator {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let out = self.step(bar, is_final);
        IndicatorValue::with_outputs(out, include_outputs, [("UltimateOscillator", out)])
    }

    fn reset(&mut self) {
        for i in 0..3 {
            self.bp[i].clear();
            self.tr[i].clear();
        }
        self.prev_close = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::UltimateOscillator
    }
}

/// Percentile rank of the current value within the trailing window, using
/// midpoint interpolation: ties count as half.
pub struct PercentRank {
    input: BarInput,
    ring: RingBuffer<f64>,
}

impl PercentRank {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("PercentRank", length)?;
        Ok(Self {
            input,
            ring: RingBuffer::new(length),
        })
    }
}

impl IndicatorState for PercentRank {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = if self.ring.is_empty() {
            0.0
        } else {
            let below = self.ring.iter().filter(|&&x| x < v).count();
            let equal = self
                .ring
                .iter()
                .filter(|&&x| (x - v).abs() < f64::EPSILON)
                .count();
            100.0 * (below as f64 + 0.5 * equal as f64) / self.ring.len() as f64
        };
        if is_final {
            self.ring.push(v);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("PercentRank", out)])
    }

    fn reset(&mut self) {
        self.ring.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::PercentRank
    }
}
