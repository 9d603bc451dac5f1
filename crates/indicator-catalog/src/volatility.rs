//! Volatility and channel indicators.

use crate::input::BarInput;
use crate::util::{safe_div, true_range};
use rolling_stats::{RingBuffer, RollingMax, RollingMin, RollingSum};
use smoothers::{Ema, Smoother, WildersMa};
use stream_core::{Bar, IndicatorName, IndicatorState, IndicatorValue, StreamError};

/// Average true range, Wilders-smoothed.
pub struct Atr {
    smoother: WildersMa,
    prev_close: Option<f64>,
}

impl Atr {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("Atr", length)?;
        Ok(Self {
            smoother: WildersMa::new(length),
            prev_close: None,
        })
    }
}

impl IndicatorState for Atr {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let tr = true_range(bar, self.prev_close);
        let atr = self.smoother.next(tr, is_final);
        if is_final {
            self.prev_close = Some(bar.close);
        }
        IndicatorValue::with_outputs(atr, include_outputs, [("Atr", atr), ("TrueRange", tr)])
    }

    fn reset(&mut self) {
        self.smoother.reset();
        self.prev_close = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::Atr
    }
}

/// Rolling population mean/variance accumulator shared by the deviation
/// indicators.
#[derive(Debug, Clone)]
struct MomentWindow {
    sum: RollingSum,
    sum_sq: RollingSum,
}

impl MomentWindow {
    fn new(length: usize) -> Self {
        Self {
            sum: RollingSum::new(length),
            sum_sq: RollingSum::new(length),
        }
    }

    /// (mean, stddev) as they would be after committing `v`.
    fn preview(&self, v: f64) -> (f64, f64) {
        let count = self.sum.preview_count() as f64;
        let mean = self.sum.preview(v) / count;
        let mean_sq = self.sum_sq.preview(v * v) / count;
        (mean, (mean_sq - mean * mean).max(0.0).sqrt())
    }

    fn add(&mut self, v: f64) -> (f64, f64) {
        self.sum.add(v);
        self.sum_sq.add(v * v);
        let count = self.sum.count() as f64;
        let mean = self.sum.sum() / count;
        let mean_sq = self.sum_sq.sum() / count;
        (mean, (mean_sq - mean * mean).max(0.0).sqrt())
    }

    fn clear(&mut self) {
        self.sum.clear();
        self.sum_sq.clear();
    }
}

/// Bollinger bands around an SMA midline.
pub struct BollingerBands {
    input: BarInput,
    window: MomentWindow,
    width: f64,
}

impl BollingerBands {
    pub fn new(length: usize, width: f64, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("BollingerBands", length)?;
        if width <= 0.0 {
            return Err(StreamError::InvalidConfiguration(format!(
                "BollingerBands width must be positive, got {}",
                width
            )));
        }
        Ok(Self {
            input,
            window: MomentWindow::new(length),
            width,
        })
    }
}

impl IndicatorState for BollingerBands {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let (mean, sd) = if is_final {
            self.window.add(v)
        } else {
            self.window.preview(v)
        };
        let upper = mean + self.width * sd;
        let lower = mean - self.width * sd;
        let percent_b = safe_div(v - lower, upper - lower, 0.5);
        IndicatorValue::with_outputs(
            mean,
            include_outputs,
            [
                ("Upper", upper),
                ("Middle", mean),
                ("Lower", lower),
                ("PercentB", percent_b),
            ],
        )
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::BollingerBands
    }
}

/// Rolling population standard deviation.
pub struct StandardDeviation {
    input: BarInput,
    window: MomentWindow,
}

impl StandardDeviation {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("StandardDeviation", length)?;
        Ok(Self {
            input,
            window: MomentWindow::new(length),
        })
    }
}

impl IndicatorState for StandardDeviation {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let (mean, sd) = if is_final {
            self.window.add(v)
        } else {
            self.window.preview(v)
        };
        IndicatorValue::with_outputs(
            sd,
            include_outputs,
            [("StandardDeviation", sd), ("Mean", mean)],
        )
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::StandardDeviation
    }
}

/// Keltner channels: EMA midline with ATR-scaled envelopes.
pub struct KeltnerChannels {
    input: BarInput,
    midline: Ema,
    atr: WildersMa,
    multiplier: f64,
    prev_close: Option<f64>,
}

impl KeltnerChannels {
    pub fn new(
        ema_length: usize,
        atr_length: usize,
        multiplier: f64,
        input: BarInput,
    ) -> Result<Self, StreamError> {
        StreamError::require_length("KeltnerChannels EMA", ema_length)?;
        StreamError::require_length("KeltnerChannels ATR", atr_length)?;
        Ok(Self {
            input,
            midline: Ema::new(ema_length),
            atr: WildersMa::new(atr_length),
            multiplier,
            prev_close: None,
        })
    }
}

impl IndicatorState for KeltnerChannels {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let middle = self.midline.next(v, is_final);
        let tr = true_range(bar, self.prev_close);
        let atr = self.atr.next(tr, is_final);
        if is_final {
            self.prev_close = Some(bar.close);
        }
        let upper = middle + self.multiplier * atr;
        let lower = middle - self.multiplier * atr;
        IndicatorValue::with_outputs(
            middle,
            include_outputs,
            [("Upper", upper), ("Middle", middle), ("Lower", lower)],
        )
    }

    fn reset(&mut self) {
        self.midline.reset();
        self.atr.reset();
        self.prev_close = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::KeltnerChannels
    }
}

/// Donchian channels over the trailing highs and lows.
pub struct DonchianChannels {
    highs: RollingMax,
    lows: RollingMin,
}

impl DonchianChannels {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("DonchianChannels", length)?;
        Ok(Self {
            highs: RollingMax::new(length),
            lows: RollingMin::new(length),
        })
    }
}

impl IndicatorState for DonchianChannels {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let (upper, lower) = if is_final {
            self.highs.add(bar.high);
            self.lows.add(bar.low);
            (
                self.highs.get().unwrap_or(bar.high),
                self.lows.get().unwrap_or(bar.low),
            )
        } else {
            (self.highs.preview(bar.high), self.lows.preview(bar.low))
        };
        let middle = (upper + lower) / 2.0;
        IndicatorValue::with_outputs(
            middle,
            include_outputs,
            [("Upper", upper), ("Middle", middle), ("Lower", lower)],
        )
    }

    fn reset(&mut self) {
        self.highs.clear();
        self.lows.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::DonchianChannels
    }
}

/// Choppiness index: log-scaled ratio of path length to range.
pub struct ChoppinessIndex {
    length: usize,
    tr_sum: RollingSum,
    highs: RollingMax,
    lows: RollingMin,
    prev_close: Option<f64>,
}

impl ChoppinessIndex {
    pub fn new(length: usize) -> Result<Self, StreamError> {
        StreamError::require_length("ChoppinessIndex", length)?;
        Ok(Self {
            length,
            tr_sum: RollingSum::new(length),
            highs: RollingMax::new(length),
            lows: RollingMin::new(length),
            prev_close: None,
        })
    }
}

impl IndicatorState for ChoppinessIndex {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let tr = true_range(bar, self.prev_close);
        let (sum_tr, highest, lowest) = if is_final {
            self.tr_sum.add(tr);
            self.highs.add(bar.high);
            self.lows.add(bar.low);
            (
                self.tr_sum.sum(),
                self.highs.get().unwrap_or(bar.high),
                self.lows.get().unwrap_or(bar.low),
            )
        } else {
            (
                self.tr_sum.preview(tr),
                self.highs.preview(bar.high),
                self.lows.preview(bar.low),
            )
        };
        if is_final {
            self.prev_close = Some(bar.close);
        }
        let range = highest - lowest;
        let length_log = (self.length as f64).log10();
        let out = if sum_tr <= 0.0 || range <= 0.0 || length_log == 0.0 {
            0.0
        } else {
            let ratio = sum_tr / range;
            if ratio <= 0.0 {
                0.0
            } else {
                100.0 * ratio.log10() / length_log
            }
        };
        IndicatorValue::with_outputs(out, include_outputs, [("ChoppinessIndex", out)])
    }

    fn reset(&mut self) {
        self.tr_sum.clear();
        self.highs.clear();
        self.lows.clear();
        self.prev_close = None;
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::ChoppinessIndex
    }
}

/// Ulcer index: RMS percent drawdown from the running window high.
pub struct UlcerIndex {
    input: BarInput,
    ring: RingBuffer<f64>,
}

impl UlcerIndex {
    pub fn new(length: usize, input: BarInput) -> Result<Self, StreamError> {
        StreamError::require_length("UlcerIndex", length)?;
        Ok(Self {
            input,
            ring: RingBuffer::new(length),
        })
    }

    fn evaluate(&self, candidate: f64) -> f64 {
        let skip = if self.ring.is_full() { 1 } else { 0 };
        let mut running_max = f64::NEG_INFINITY;
        let mut sum_sq = 0.0;
        let mut k = 0.0;
        for &v in self.ring.iter().skip(skip).chain(std::iter::once(&candidate)) {
            running_max = running_max.max(v);
            let drawdown = safe_div(100.0 * (v - running_max), running_max, 0.0);
            sum_sq += drawdown * drawdown;
            k += 1.0;
        }
        (sum_sq / k).sqrt()
    }
}

impl IndicatorState for UlcerIndex {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue {
        let v = self.input.project(bar);
        let out = self.evaluate(v);
        if is_final {
            self.ring.push(v);
        }
        IndicatorValue::with_outputs(out, include_outputs, [("UlcerIndex", out)])
    }

    fn reset(&mut self) {
        self.ring.clear();
    }

    fn name(&self) -> IndicatorName {
        IndicatorName::UlcerIndex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{bars_from_closes, bars_from_ohlcv};

    fn drive_final(state: &mut dyn IndicatorState, bars: &[Bar]) -> Vec<f64> {
        bars.iter().map(|b| state.update(b, true, false).value).collect()
    }

    #[test]
    fn test_atr_first_bar_uses_high_low() {
        let bars = bars_from_ohlcv(&[(10.0, 12.0, 9.0, 11.0, 0.0)]);
        let mut atr = Atr::new(14).unwrap();
        assert_eq!(drive_final(&mut atr, &bars)[0], 3.0);
    }

    #[test]
    fn test_atr_positive_and_volatility_sensitive() {
        let calm: Vec<(f64, f64, f64, f64, f64)> =
            (0..20).map(|_| (100.0, 100.5, 99.5, 100.0, 0.0)).collect();
        let wild: Vec<(f64, f64, f64, f64, f64)> =
            (0..20).map(|_| (100.0, 110.0, 90.0, 100.0, 0.0)).collect();
        let mut atr_calm = Atr::new(5).unwrap();
        let mut atr_wild = Atr::new(5).unwrap();
        let calm_out = drive_final(&mut atr_calm, &bars_from_ohlcv(&calm));
        let wild_out = drive_final(&mut atr_wild, &bars_from_ohlcv(&wild));
        assert!(wild_out[19] > calm_out[19]);
    }

    #[test]
    fn test_bollinger_band_ordering() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + (i as f64 * 0.8).sin() * 3.0).collect();
        let bars = bars_from_closes(&closes);
        let mut bb = BollingerBands::new(10, 2.0, BarInput::default()).unwrap();
        for bar in &bars {
            let update = bb.update(bar, true, true);
            let outputs = update.outputs.unwrap();
            assert!(outputs["Upper"] >= outputs["Middle"]);
            assert!(outputs["Middle"] >= outputs["Lower"]);
        }
    }

    #[test]
    fn test_bollinger_narrow_on_constant_prices() {
        let bars = bars_from_closes(&[100.0; 15]);
        let mut bb = BollingerBands::new(10, 2.0, BarInput::default()).unwrap();
        let last = bars
            .iter()
            .map(|b| bb.update(b, true, true))
            .last()
            .unwrap();
        let outputs = last.outputs.unwrap();
        assert!((outputs["Upper"] - outputs["Lower"]).abs() < 1e-9);
    }

    #[test]
    fn test_standard_deviation_known_window() {
        let bars = bars_from_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let mut sd = StandardDeviation::new(8, BarInput::default()).unwrap();
        let out = drive_final(&mut sd, &bars);
        // Classic population stddev example
        assert!((out[7] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_donchian_channels_track_extremes() {
        let bars = bars_from_ohlcv(&[
            (10.0, 15.0, 9.0, 12.0, 0.0),
            (12.0, 13.0, 11.0, 12.5, 0.0),
            (12.5, 20.0, 12.0, 19.0, 0.0),
        ]);
        let mut dc = DonchianChannels::new(3).unwrap();
        let last = bars.iter().map(|b| dc.update(b, true, true)).last().unwrap();
        let outputs = last.outputs.unwrap();
        assert_eq!(outputs["Upper"], 20.0);
        assert_eq!(outputs["Lower"], 9.0);
        assert_eq!(outputs["Middle"], 14.5);
    }

    #[test]
    fn test_choppiness_high_in_sideways_market() {
        let sideways: Vec<(f64, f64, f64, f64, f64)> = (0..30)
            .map(|i| {
                let c = 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 };
                (c, c + 1.0, c - 1.0, c, 0.0)
            })
            .collect();
        let trending: Vec<(f64, f64, f64, f64, f64)> = (0..30)
            .map(|i| {
                let c = 100.0 + 3.0 * i as f64;
                (c, c + 1.0, c - 1.0, c, 0.0)
            })
            .collect();
        let mut chop_side = ChoppinessIndex::new(14).unwrap();
        let mut chop_trend = ChoppinessIndex::new(14).unwrap();
        let side = drive_final(&mut chop_side, &bars_from_ohlcv(&sideways));
        let trend = drive_final(&mut chop_trend, &bars_from_ohlcv(&trending));
        assert!(side[29] > trend[29]);
    }

    #[test]
    fn test_ulcer_index_zero_without_drawdown() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 13.0]);
        let mut ui = UlcerIndex::new(14, BarInput::default()).unwrap();
        for v in drive_final(&mut ui, &bars) {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_ulcer_index_positive_after_drop() {
        let bars = bars_from_closes(&[100.0, 80.0, 80.0]);
        let mut ui = UlcerIndex::new(14, BarInput::default()).unwrap();
        let out = drive_final(&mut ui, &bars);
        assert!(out[1] > 0.0);
    }

    #[test]
    fn test_keltner_provisional_coherence() {
        let rows: Vec<(f64, f64, f64, f64, f64)> = (0..20)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.5).sin() * 2.0;
                (c, c + 1.0, c - 1.0, c, 0.0)
            })
            .collect();
        let bars = bars_from_ohlcv(&rows);
        let mut kc = KeltnerChannels::new(20, 10, 2.0, BarInput::default()).unwrap();
        for bar in &bars {
            let provisional = kc.update(bar, false, false).value;
            let committed = kc.update(bar, true, false).value;
            assert_eq!(provisional, committed);
        }
    }
}
