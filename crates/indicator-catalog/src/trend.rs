//! Trend-following indicators.
//!
//! Every state machine here follows the same discipline: a provisional
//! update routes through the primitives' `preview`/`next(_, false)` paths and
//! leaves state untouched; a final update commits each owned primitive
//! exactly once.

use crate::input::BarInput;
use crate::util::{safe_div, true_range, WilderSum};
use rolling_stats::{RingBuffer, RollingSum};
use smoothers::{make_smoother, Ema, MaKind, Smoother};
use stream_core::{Bar, IndicatorName, IndicatorState, IndicatorValue, StreamError};

/// Single-smoother moving-average indicator. One struct serves every plain
/// member of the MA family; the catalog name and output key pick the flavor.
pub struct MovingAverage {
    name: IndicatorName,
    output_key: &'static str,
    input: BarInput,
    smoother: Box<dyn Smoother>,
}

impl MovingAverage {
    fn build(
        name: IndicatorName,
        output_key: &'static str,
        kind: MaKind,
        length: usize,
        input: BarInput,
    ) -> Result<Self, StreamError> {
        StreamError::require_length(output_key, length)?;
        Ok(Self {
            name,
            output_key,
            input,
            smoother: make_smoother(kind, length),
        })
    }

    pub fn sma(length: usize, input: BarInput) -> Result<Self, StreamError> {
        Self::build(IndicatorName::Sma, "Sma", MaKind::Simple, length, input)
    }

    pub fn ema(length: usize, input: BarInput) -> Result<Self, StreamError> {
        Self::build(IndicatorName::Ema, "Ema", MaKind::Exponential, length, input)
    }

    pub fn wma(length: usize, input: BarInput) -> Result<Self, StreamError> {
        Self::build(IndicatorName::Wma, "Wma", MaKind::Weighted, length, input)
    }

    pub fn wilders(length: usize, input: BarInput) -> Result<Self, StreamError> {
        Self::build(
            IndicatorName::WildersMa,
            "WildersMa",
            MaKind::Wilders,
            length,
            input,
        )
    }

    pub fn hull(length: usize, input: BarInput) -> Result<Self, StreamError> {
        Self::build(IndicatorName::HullMa, "HullMa", MaKind::Hull, length, input)
    }

    pub fn triangular(length: usize, input: BarInput) -> Result<Self, StreamError> {
        Self::build(
            IndicatorName::TriangularMa,
            "TriangularMa",
            MaKind::Triangular,
            length,
            input,
        )
    }

    pub fn zero_lag(length: usize, input: BarInput) -> Result<Self, StreamError> {
        Self::build(
            IndicatorName::ZeroLagEma,
            "ZeroLagEma",
            MaKind::ZeroLagExponential,
            length,
            input,
        )
    }

    pub fn super_smoother(length: usize, input: BarInput) -> Result<Self, StreamError> {
        Self::build(
            IndicatorName::SuperSmoother,
            "SuperSmoother",
            MaKind::Ehlers2PoleSuperSmoother,
            length,
            input,
        )
    }
}

impl IndicatorState for MovingAverage {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = self.smoother.next(v, is_final);
        IndicatorValue::with_outputs(out, include_outputs, [(self.output_key, out)])
    }

    fn reset(&mut self) {
        self.smoother.reset();
    }

    fn name(&self) -> IndicatorName {
        self.name
    }
}

/// Double exponential moving average: `2·EMA − EMA(EMA)`.
pub struct Dema {
    input: BarInput,
    e1: Ema,
    e2: Ema,
}

impl Dema {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Dema", length)?;
        Ok(Self {
            input,
            e1: Ema::new(length),
            e2: Ema::new(length),
        })
    }
}

impl IndicatorState for Dema {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let a = self.e1.next(v, is_final);
        let b = self.e2.next(a, is_final);
        let out = 2.0 * a - b;
        IndicatorValue::with_outputs(out, include_outputs, [("Dema", out), ("Ema", a)])
    }

    fn reset(&mut self) {
        self.e1.reset();
        self.e2.reset();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Dema
    }
}

/// Triple exponential moving average: `3·e1 − 3·e2 + e3`.
pub struct Tema {
    input: BarInput,
    e1: Ema,
    e2: Ema,
    e3: Ema,
}

impl Tema {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Tema", length)?;
        Ok(Self {
            input,
            e1: Ema::new(length),
            e2: Ema::new(length),
            e3: Ema::new(length),
        })
    }
}

impl IndicatorState for Tema {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let a = self.e1.next(v, is_final);
        let b = self.e2.next(a, is_final);
        let c = self.e3.next(b, is_final);
        let out = 3.0 * a - 3.0 * b + c;
        IndicatorValue::with_outputs(out, include_outputs, [("Tema", out)])
    }

    fn reset(&mut self) {
        self.e1.reset();
        self.e2.reset();
        self.e3.reset();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Tema
    }
}

/// Kaufman adaptive moving average.
pub struct Kama {
    input: BarInput,
    ring: RingBuffer<f64>,
    volatility: RollingSum,
    fast_sc: f64,
    slow_sc: f64,
    prev_input: Option<f64>,
    prev_kama: Option<f64>,
}

impl Kama {
    pub fn new(
        length: usize,
        fast: usize,
        slow: usize,
        input: BarInput,
    ) -> Result<Self, StreamError> {
        StreamError::require_length("Kama", length)?;
        StreamError::require_length("Kama fast", fast)?;
        StreamError::require_length("Kama slow", slow)?;
        Ok(Self {
            input,
            ring: RingBuffer::new(length),
            volatility: RollingSum::new(length),
            fast_sc: 2.0 / (fast as f64 + 1.0),
            slow_sc: 2.0 / (slow as f64 + 1.0),
            prev_input: None,
            prev_kama: None,
        })
    }

    fn evaluate(&self, v: f64) -> f64 {
        let Some(prior) = self.prev_kama else {
            return v;
        };
        let reference = self.ring.oldest().copied().unwrap_or(v);
        let change = (v - reference).abs();
        let vol = match self.prev_input {
            Some(prev) => self.volatility.preview((v - prev).abs()),
            None => 0.0,
        };
        let er = safe_div(change, vol, 0.0);
        let sc = (er * (self.fast_sc - self.slow_sc) + self.slow_sc).powi(2);
        prior + sc * (v - prior)
    }
}

impl IndicatorState for Kama {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = self.evaluate(v);
        if is_final {
            if let Some(prev) = self.prev_input {
                self.volatility.add((v - prev).abs());
            }
            self.ring.push(v);
            self.prev_input = Some(v);
            self.prev_kama = Some(out);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Kama", out)])
    }

    fn reset(&mut self) {
        self.ring.clear();
        self.volatility.clear();
        self.prev_input = None;
        self.prev_kama = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Kama
    }
}

/// Volume-weighted moving average over the trailing window.
pub struct Vwma {
    input: BarInput,
    weighted: RollingSum,
    volume: RollingSum,
}

impl Vwma {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Vwma", length)?;
        Ok(Self {
            input,
            weighted: RollingSum::new(length),
            volume: RollingSum::new(length),
        })
    }
}

impl IndicatorState for Vwma {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let (pv, vol) = if is_final {
            self.weighted.add(v * bar.volume);
            self.volume.add(bar.volume);
            (self.weighted.sum(), self.volume.sum())
        } else {
            (
                self.weighted.preview(v * bar.volume),
                self.volume.preview(bar.volume),
            )
        };
        let out = safe_div(pv, vol, v);
        IndicatorValue::with_outputs(out, include_outputs, [("Vwma", out)])
    }

    fn reset(&mut self) {
        self.weighted.clear();
        self.volume.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Vwma
    }
}

/// McGinley dynamic line: tracks price with a speed-adjusted divisor.
pub struct McGinleyDynamic {
    input: BarInput,
    length: f64,
    prev: Option<f64>,
}

impl McGinleyDynamic {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("McGinleyDynamic", length)?;
        Ok(Self {
            input,
            length: length as f64,
            prev: None,
        })
    }

    fn evaluate(&self, v: f64) -> f64 {
        let Some(md) = self.prev else {
            return v;
        };
        if md == 0.0 {
            return v;
        }
        let divisor = self.length * (v / md).powi(4);
        if !divisor.is_finite() || divisor == 0.0 {
            md
        } else {
            md + (v - md) / divisor
        }
    }
}

impl IndicatorState for McGinleyDynamic {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = self.evaluate(v);
        if is_final {
            self.prev = Some(out);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("McGinleyDynamic", out)])
    }

    fn reset(&mut self) {
        self.prev = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::McGinleyDynamic
    }
}

/// TRIX: one-bar rate of change of a triple-smoothed EMA, in percent.
pub struct Trix {
    input: BarInput,
    e1: Ema,
    e2: Ema,
    e3: Ema,
    prev_e3: Option<f64>,
}

impl Trix {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("Trix", length)?;
        Ok(Self {
            input,
            e1: Ema::new(length),
            e2: Ema::new(length),
            e3: Ema::new(length),
            prev_e3: None,
        })
    }
}

impl IndicatorState for Trix {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let a = self.e1.next(v, is_final);
        let b = self.e2.next(a, is_final);
        let c = self.e3.next(b, is_final);
        let out = match self.prev_e3 {
            None => 0.0,
            Some(p) => safe_div(100.0 * (c - p), p, 0.0),
        };
        if is_final {
            self.prev_e3 = Some(c);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Trix", out), ("Ema3", c)])
    }

    fn reset(&mut self) {
        self.e1.reset();
        self.e2.reset();
        self.e3.reset();
        self.prev_e3 = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Trix
    }
}

/// Least-squares line over the trailing window; the primary value is the
/// fitted value at the newest bar.
pub struct LinearRegression {
    input: BarInput,
    ring: RingBuffer<f64>,
}

impl LinearRegression {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("LinearRegression", length)?;
        Ok(Self {
            input,
            ring: RingBuffer::new(length),
        })
    }

    /// (forecast, slope, intercept) over the window including `candidate`.
    fn evaluate(&self, candidate: f64) -> (f64, f64, f64) {
        let skip = if self.ring.is_full() { 1 } else { 0 };
        let mut k = 0.0;
        let mut sum_x = 0.0;
        let mut sum_xx = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xy = 0.0;
        for &y in self.ring.iter().skip(skip).chain(std::iter::once(&candidate)) {
            let x = k;
            sum_x += x;
            sum_xx += x * x;
            sum_y += y;
            sum_xy += x * y;
            k += 1.0;
        }
        if k < 2.0 {
            return (candidate, 0.0, candidate);
        }
        let denom = k * sum_xx - sum_x * sum_x;
        let slope = safe_div(k * sum_xy - sum_x * sum_y, denom, 0.0);
        let intercept = (sum_y - slope * sum_x) / k;
        let forecast = intercept + slope * (k - 1.0);
        (forecast, slope, intercept)
    }
}

impl IndicatorState for LinearRegression {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let (forecast, slope, intercept) = self.evaluate(v);
        if is_final {
            self.ring.push(v);
        }
        IndicatorValue::with_outputs(
            forecast,
            include_outputs,
            [
                ("Forecast", forecast),
                ("Slope", slope),
                ("Intercept", intercept),
            ],
        )
    }

    fn reset(&mut self) {
        self.ring.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::LinearRegression
    }
}

/// Ehlers instantaneous trendline with its trigger line.
pub struct InstantaneousTrendline {
    input: BarInput,
    alpha: f64,
    v1: f64,
    v2: f64,
    it1: f64,
    it2: f64,
    count: u64,
}

impl InstantaneousTrendline {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("InstantaneousTrendline", length)?;
        Ok(Self {
            input,
            alpha: 2.0 / (length as f64 + 1.0),
            v1: 0.0,
            v2: 0.0,
            it1: 0.0,
            it2: 0.0,
            count: 0,
        })
    }

    fn evaluate(&self, v: f64) -> f64 {
        let a = self.alpha;
        match self.count {
            0 => v,
            1 => (v + self.v1) / 2.0,
            2..=6 => (v + 2.0 * self.v1 + self.v2) / 4.0,
            _ => {
                (a - a * a / 4.0) * v + 0.5 * a * a * self.v1
                    - (a - 0.75 * a * a) * self.v2
                    + 2.0 * (1.0 - a) * self.it1
                    - (1.0 - a) * (1.0 - a) * self.it2
            }
        }
    }
}

impl IndicatorState for InstantaneousTrendline {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = self.evaluate(v);
        let trigger = 2.0 * out - self.it2;
        if is_final {
            self.it2 = self.it1;
            self.it1 = out;
            self.v2 = self.v1;
            self.v1 = v;
            self.count += 1;
        }
        IndicatorValue::with_outputs(
            out,
            include_outputs,
            [("Trendline", out), ("Trigger", trigger)],
        )
    }

    fn reset(&mut self) {
        self.v1 = 0.0;
        self.v2 = 0.0;
        self.it1 = 0.0;
        self.it2 = 0.0;
        self.count = 0;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::InstantaneousTrendline
    }
}

/// Average directional index with the two directional lines.
pub struct Adx {
    smoothed_tr: WilderSum,
    smoothed_plus_dm: WilderSum,
    smoothed_minus_dm: WilderSum,
    adx_ma: smoothers::WildersMa,
    prev: Option<(f64, f64, f64)>,
}

impl Adx {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("Adx", length)?;
        Ok(Self {
            smoothed_tr: WilderSum::new(length),
            smoothed_plus_dm: WilderSum::new(length),
            smoothed_minus_dm: WilderSum::new(length),
            adx_ma: smoothers::WildersMa::new(length),
            prev: None,
        })
    }

    fn step(&mut self, bar: &Bar, is_final: bool) -> (f64, f64, f64) {
        let Some((prev_high, prev_low, prev_close)) = self.prev else {
            if is_final {
                self.prev = Some((bar.high, bar.low, bar.close));
            }
            return (0.0, 0.0, 0.0);
        };

        let up = bar.high - prev_high;
        let down = prev_low - bar.low;
        let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
        let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
        let tr = true_range(bar, Some(prev_close));

        let (s_tr, s_plus, s_minus) = if is_final {
            (
                self.smoothed_tr.add(tr),
                self.smoothed_plus_dm.add(plus_dm),
                self.smoothed_minus_dm.add(minus_dm),
            )
        } else {
            (
                self.smoothed_tr.preview(tr),
                self.smoothed_plus_dm.preview(plus_dm),
                self.smoothed_minus_dm.preview(minus_dm),
            )
        };

        let plus_di = safe_div(100.0 * s_plus, s_tr, 0.0);
        let minus_di = safe_div(100.0 * s_minus, s_tr, 0.0);
        let dx = safe_div(100.0 * (plus_di - minus_di).abs(), plus_di + minus_di, 0.0);
        let adx = self.adx_ma.next(dx, is_final);

        if is_final {
            self.prev = Some((bar.high, bar.low, bar.close));
        }
        (adx, plus_di, minus_di)
    }
}

impl IndicatorState for Adx {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let (adx, plus_di, minus_di) = self.step(bar, is_final);
        IndicatorValue::with_outputs(
            adx,
            include_outputs,
            [("Adx", adx), ("PlusDi", plus_di), ("MinusDi", minus_di)],
        )
    }

    fn reset(&mut self) {
        self.smoothed_tr.clear();
        self.smoothed_plus_dm.clear();
        self.smoothed_minus_dm.clear();
        smoothers::Smoother::reset(&mut self.adx_ma);
        self.prev = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Adx
    }
}
