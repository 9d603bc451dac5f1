//! Volume-driven indicators.

use crate::util::safe_div;
use rolling_stats::RollingSum;
use smoothers::{Ema, Sma, Smoother};
use stream_core::{Bar, IndicatorName, IndicatorState, IndicatorValue, StreamError};

fn typical_price(bar: &Bar) -> f64 {
    (bar.high + bar.low + bar.close) / 3.0
}

/// Close-location money flow multiplier in [-1, 1].
fn money_flow_multiplier(bar: &Bar) -> f64 {
    safe_div(
        (bar.close - bar.low) - (bar.high - bar.close),
        bar.high - bar.low,
        0.0,
    )
}

/// On-balance volume, seeded with the first bar's volume.
pub struct Obv {
    obv: f64,
    prev_close: Option<f64>,
}

impl Obv {
    pub fn new() -> Self {
        Self {
            obv: 0.0,
            prev_close: None,
        }
    }

    fn evaluate(&self, bar: &Bar) -> f64 {
        match self.prev_close {
            None => bar.volume,
            Some(pc) => {
                if bar.close > pc {
                    self.obv + bar.volume
                } else if bar.close < pc {
                    self.obv - bar.volume
                } else {
                    self.obv
                }
            }
        }
    }
}

impl Default for Obv {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorState for Obv {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let out = self.evaluate(bar);
        if is_final {
            self.obv = out;
            self.prev_close = Some(bar.close);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Obv", out)])
    }

    fn reset(&mut self) {
        self.obv = 0.0;
        self.prev_close = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Obv
    }
}

/// Accumulation/distribution line.
pub struct AccumulationDistribution {
    adl: f64,
}

impl AccumulationDistribution {
    pub fn new() -> Self {
        Self { adl: 0.0 }
    }
}

impl Default for AccumulationDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorState for AccumulationDistribution {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let out = self.adl + money_flow_multiplier(bar) * bar.volume;
        if is_final {
            self.adl = out;
        }
        IndicatorValue::with_outputs(out, include_outputs, [("Adl", out)])
    }

    fn reset(&mut self) {
        self.adl = 0.0;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::AccumulationDistribution
    }
}

/// Chaikin oscillator: fast minus slow EMA of the A/D line.
pub struct ChaikinOscillator {
    adl: f64,
    fast: Ema,
    slow: Ema,
}

impl ChaikinOscillator {
    pub fn new(fast: usize, slow: usize) -> Result<Self, StreamError> {
        StreamError::require_length("ChaikinOscillator fast", fast)?;
        StreamError::require_length("ChaikinOscillator slow", slow)?;
        Ok(Self {
            adl: 0.0,
            fast: Ema::new(fast),
            slow: Ema::new(slow),
        })
    }
}

impl IndicatorState for ChaikinOscillator {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let adl = self.adl + money_flow_multiplier(bar) * bar.volume;
        let fast = self.fast.next(adl, is_final);
        let slow = self.slow.next(adl, is_final);
        if is_final {
            self.adl = adl;
        }
        let out = fast - slow;
        IndicatorValue::with_outputs(out, include_outputs, [("ChaikinOscillator", out), ("Adl", adl)])
    }

    fn reset(&mut self) {
        self.adl = 0.0;
        self.fast.reset();
        self.slow.reset();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::ChaikinOscillator
    }
}

/// Chaikin money flow over a rolling window.
pub struct ChaikinMoneyFlow {
    flow: RollingSum,
    volume: RollingSum,
}

impl ChaikinMoneyFlow {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("ChaikinMoneyFlow", length)?;
        Ok(Self {
            flow: RollingSum::new(length),
            volume: RollingSum::new(length),
        })
    }
}

impl IndicatorState for ChaikinMoneyFlow {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let mfv = money_flow_multiplier(bar) * bar.volume;
        let (sum_flow, sum_vol) = if is_final {
            self.flow.add(mfv);
            self.volume.add(bar.volume);
            (self.flow.sum(), self.volume.sum())
        } else {
            (self.flow.preview(mfv), self.volume.preview(bar.volume))
        };
        let out = safe_div(sum_flow, sum_vol, 0.0);
        IndicatorValue::with_outputs(out, include_outputs, [("ChaikinMoneyFlow", out)])
    }

    fn reset(&mut self) {
        self.flow.clear();
        self.volume.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::ChaikinMoneyFlow
    }
}

/// Money flow index over up/down typical-price flows.
pub struct Mfi {
    up_flow: RollingSum,
    down_flow: RollingSum,
    prev_typical: Option<f64>,
}

impl Mfi {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("Mfi", length)?;
        Ok(Self {
            up_flow: RollingSum::new(length),
            down_flow: RollingSum::new(length),
            prev_typical: None,
        })
    }

    fn step(&mut self, bar: &Bar, is_final: bool) -> f64 {
        let tp = typical_price(bar);
        let Some(prev_tp) = self.prev_typical else {
            if is_final {
                self.prev_typical = Some(tp);
            }
            return 50.0;
        };
        let raw_flow = tp * bar.volume;
        let up = if tp > prev_tp { raw_flow } else { 0.0 };
        let down = if tp < prev_tp { raw_flow } else { 0.0 };
        let (sum_up, sum_down) = if is_final {
            self.up_flow.add(up);
            self.down_flow.add(down);
            (self.up_flow.sum(), self.down_flow.sum())
        } else {
            (self.up_flow.preview(up), self.down_flow.preview(down))
        };
        if is_final {
            self.prev_typical = Some(tp);
        }
        if sum_down == 0.0 {
            return if sum_up == 0.0 { 50.0 } else { 100.0 };
        }
        100.0 - 100.0 / (1.0 + sum_up / sum_down)
    }
}

impl IndicatorState for Mfi {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let out = self.step(bar, is_final);
        IndicatorValue::with_outputs(out, include_outputs, [("Mfi", out)])
    }

    fn reset(&mut self) {
        self.up_flow.clear();
        self.down_flow.clear();
        self.prev_typical = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Mfi
    }
}

/// EMA-smoothed force index.
pub struct ForceIndex {
    smoother: Ema,
    prev_close: Option<f64>,
}

impl ForceIndex {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("ForceIndex", length)?;
        Ok(Self {
            smoother: Ema::new(length),
            prev_close: None,
        })
    }
}

impl IndicatorState for ForceIndex {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let raw = match self.prev_close {
            None => 0.0,
            Some(pc) => (bar.close - pc) * bar.volume,
        };
        let out = self.smoother.next(raw, is_final);
        if is_final {
            self.prev_close = Some(bar.close);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("ForceIndex", out), ("Raw", raw)])
    }

    fn reset(&mut self) {
        self.smoother.reset();
        self.prev_close = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::ForceIndex
    }
}

/// SMA-smoothed ease of movement.
pub struct EaseOfMovement {
    smoother: Sma,
    prev_midpoint: Option<f64>,
}

impl EaseOfMovement {
    const VOLUME_SCALE: f64 = 100_000_000.0;

    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("EaseOfMovement", length)?;
        Ok(Self {
            smoother: Sma::new(length),
            prev_midpoint: None,
        })
    }
}

impl IndicatorState for EaseOfMovement {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let midpoint = (bar.high + bar.low) / 2.0;
        let raw = match self.prev_midpoint {
            None => 0.0,
            Some(prev) => {
                let distance = midpoint - prev;
                let box_ratio = safe_div(bar.volume / Self::VOLUME_SCALE, bar.high - bar.low, 0.0);
                safe_div(distance, box_ratio, 0.0)
            }
        };
        let out = self.smoother.next(raw, is_final);
        if is_final {
            self.prev_midpoint = Some(midpoint);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("EaseOfMovement", out), ("Raw", raw)])
    }

    fn reset(&mut self) {
        self.smoother.reset();
        self.prev_midpoint = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::EaseOfMovement
    }
}

/// Volume-weighted average of the typical price over a rolling window.
pub struct RollingVwap {
    weighted: RollingSum,
    volume: RollingSum,
}

impl RollingVwap {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("RollingVwap", length)?;
        Ok(Self {
            weighted: RollingSum::new(length),
            volume: RollingSum::new(length),
        })
    }
}

impl IndicatorState for RollingVwap {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let tp = typical_price(bar);
        let (sum_weighted, sum_volume) = if is_final {
            self.weighted.add(tp * bar.volume);
            self.volume.add(bar.volume);
            (self.weighted.sum(), self.volume.sum())
        } else {
            (
                self.weighted.preview(tp * bar.volume),
                self.volume.preview(bar.volume),
            )
        };
        let out = safe_div(sum_weighted, sum_volume, tp);
        IndicatorValue::with_outputs(out, include_outputs, [("Vwap", out)])
    }

    fn reset(&mut self) {
        self.weighted.clear();
        self.volume.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::RollingVwap
    }
}
