//! One-shot batch calculations used as the parity oracle.
//!
//! Each function produces exactly one value per input index, including the
//! warm-up prefix, using the same seed arithmetic as the streaming states:
//! window aggregates use the observed values when fewer than N are available,
//! and recursive filters seed from their first input.

use stream_core::Bar;

fn div_or(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        fallback
    } else {
        numerator / denominator
    }
}

/// Simple moving average with partial warm-up windows.
pub fn sma(data: &[f64], length: usize) -> Vec<f64> {
    let length = length.max(1);
    let mut out = Vec::with_capacity(data.len());
    let mut sum = 0.0;
    for i in 0..data.len() {
        sum += data[i];
        if i >= length {
            sum -= data[i - length];
        }
        let count = (i + 1).min(length);
        out.push(sum / count as f64);
    }
    out
}

/// Exponential moving average seeded with the first value.
pub fn ema(data: &[f64], length: usize) -> Vec<f64> {
    ema_alpha(data, 2.0 / (length.max(1) as f64 + 1.0))
}

/// Wilders smoothing: EMA with alpha = 1/length.
pub fn wilders(data: &[f64], length: usize) -> Vec<f64> {
    ema_alpha(data, 1.0 / length.max(1) as f64)
}

fn ema_alpha(data: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev: Option<f64> = None;
    for &v in data {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// RSI over Wilders-smoothed gains and losses; 50 before the first change.
pub fn rsi(data: &[f64], length: usize) -> Vec<f64> {
    let alpha = 1.0 / length.max(1) as f64;
    let mut out = Vec::with_capacity(data.len());
    let mut avg_gain: Option<f64> = None;
    let mut avg_loss: Option<f64> = None;
    for i in 0..data.len() {
        if i == 0 {
            out.push(50.0);
            continue;
        }
        let change = data[i] - data[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = Some(match avg_gain {
            None => gain,
            Some(p) => alpha * gain + (1.0 - alpha) * p,
        });
        avg_loss = Some(match avg_loss {
            None => loss,
            Some(p) => alpha * loss + (1.0 - alpha) * p,
        });
        let (g, l) = (avg_gain.unwrap(), avg_loss.unwrap());
        if l == 0.0 {
            out.push(if g == 0.0 { 50.0 } else { 100.0 });
        } else {
            out.push(100.0 - 100.0 / (1.0 + g / l));
        }
    }
    out
}

pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_line = ema(data, fast);
    let slow_line = ema(data, slow);
    let macd_line: Vec<f64> = fast_line
        .iter()
        .zip(&slow_line)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal);
    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();
    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                let pc = bars[i - 1].close;
                (bar.high - bar.low)
                    .max((bar.high - pc).abs())
                    .max((bar.low - pc).abs())
            }
        })
        .collect()
}

/// ATR: Wilders-smoothed true range.
pub fn atr(bars: &[Bar], length: usize) -> Vec<f64> {
    wilders(&true_ranges(bars), length)
}

/// ADX over Wilder running sums; zero on the first bar.
pub fn adx(bars: &[Bar], length: usize) -> Vec<f64> {
    let n = length.max(1) as f64;
    let alpha = 1.0 / n;
    let mut out = Vec::with_capacity(bars.len());
    let mut smoothed_tr = 0.0;
    let mut smoothed_plus = 0.0;
    let mut smoothed_minus = 0.0;
    let mut adx_val: Option<f64> = None;
    for i in 0..bars.len() {
        if i == 0 {
            out.push(0.0);
            continue;
        }
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
        let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
        let pc = bars[i - 1].close;
        let tr = (bars[i].high - bars[i].low)
            .max((bars[i].high - pc).abs())
            .max((bars[i].low - pc).abs());

        smoothed_tr = smoothed_tr - smoothed_tr / n + tr;
        smoothed_plus = smoothed_plus - smoothed_plus / n + plus_dm;
        smoothed_minus = smoothed_minus - smoothed_minus / n + minus_dm;

        let plus_di = div_or(100.0 * smoothed_plus, smoothed_tr, 0.0);
        let minus_di = div_or(100.0 * smoothed_minus, smoothed_tr, 0.0);
        let dx = div_or(100.0 * (plus_di - minus_di).abs(), plus_di + minus_di, 0.0);
        adx_val = Some(match adx_val {
            None => dx,
            Some(p) => alpha * dx + (1.0 - alpha) * p,
        });
        out.push(adx_val.unwrap());
    }
    out
}

pub struct StochasticSeries {
    pub fast_k: Vec<f64>,
    pub slow_k: Vec<f64>,
    pub slow_d: Vec<f64>,
}

pub fn stochastic(
    bars: &[Bar],
    k_length: usize,
    k_smoothing: usize,
    d_length: usize,
) -> StochasticSeries {
    let k_length = k_length.max(1);
    let mut fast_k = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        let start = (i + 1).saturating_sub(k_length);
        let window = &bars[start..=i];
        let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        fast_k.push(if highest == lowest {
            50.0
        } else {
            100.0 * (bars[i].close - lowest) / (highest - lowest)
        });
    }
    let slow_k = sma(&fast_k, k_smoothing);
    let slow_d = sma(&slow_k, d_length);
    StochasticSeries {
        fast_k,
        slow_k,
        slow_d,
    }
}

/// MFI over rolling up/down typical-price flows; 50 before the first change.
/// Window sums are maintained incrementally with the same add/evict
/// arithmetic the streaming state uses.
pub fn mfi(bars: &[Bar], length: usize) -> Vec<f64> {
    let length = length.max(1);
    let mut out = Vec::with_capacity(bars.len());
    let mut ups: Vec<f64> = Vec::with_capacity(bars.len());
    let mut downs: Vec<f64> = Vec::with_capacity(bars.len());
    let mut sum_up = 0.0;
    let mut sum_down = 0.0;
    let tp: Vec<f64> = bars
        .iter()
        .map(|b| (b.high + b.low + b.close) / 3.0)
        .collect();
    for i in 0..bars.len() {
        if i == 0 {
            out.push(50.0);
            continue;
        }
        let raw = tp[i] * bars[i].volume;
        let up = if tp[i] > tp[i - 1] { raw } else { 0.0 };
        let down = if tp[i] < tp[i - 1] { raw } else { 0.0 };
        let evicted = ups.len().checked_sub(length);
        sum_up = sum_up + up - evicted.map(|j| ups[j]).unwrap_or(0.0);
        sum_down = sum_down + down - evicted.map(|j| downs[j]).unwrap_or(0.0);
        ups.push(up);
        downs.push(down);
        if sum_down == 0.0 {
            out.push(if sum_up == 0.0 { 50.0 } else { 100.0 });
        } else {
            out.push(100.0 - 100.0 / (1.0 + sum_up / sum_down));
        }
    }
    out
}

/// OBV seeded with the first bar's volume.
pub fn obv(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        if i == 0 {
            out.push(bars[0].volume);
            continue;
        }
        let prev: f64 = out[i - 1];
        out.push(if bars[i].close > bars[i - 1].close {
            prev + bars[i].volume
        } else if bars[i].close < bars[i - 1].close {
            prev - bars[i].volume
        } else {
            prev
        });
    }
    out
}

/// Percent rate of change against the value `length` bars back, clamped to
/// the oldest observed value during warm-up.
pub fn roc(data: &[f64], length: usize) -> Vec<f64> {
    let length = length.max(1);
    data.iter()
        .enumerate()
        .map(|(i, &v)| {
            let reference = data[i.saturating_sub(length)];
            div_or(100.0 * (v - reference), reference, 0.0)
        })
        .collect()
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::fixture_bars;

    #[test]
    fn test_sma_partial_windows() {
        let out = sma(&[10.0, 20.0, 30.0, 40.0], 2);
        assert_eq!(out, vec![10.0, 15.0, 25.0, 35.0]);
    }

    #[test]
    fn test_ema_seed_and_recursion() {
        let out = ema(&[10.0, 20.0], 3);
        assert_eq!(out[0], 10.0);
        assert!((out[1] - (0.5 * 20.0 + 0.5 * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rsi_full_length() {
        let bars = fixture_bars(64);
        let out = rsi(&closes(&bars), 14);
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_macd_histogram_identity() {
        let bars = fixture_bars(64);
        let series = macd(&closes(&bars), 12, 26, 9);
        for i in 0..64 {
            assert!((series.histogram[i] - (series.macd[i] - series.signal[i])).abs() < 1e-12);
        }
    }

    #[test]
    fn test_every_oracle_is_full_length() {
        let bars = fixture_bars(50);
        let data = closes(&bars);
        assert_eq!(sma(&data, 20).len(), 50);
        assert_eq!(ema(&data, 20).len(), 50);
        assert_eq!(wilders(&data, 14).len(), 50);
        assert_eq!(rsi(&data, 14).len(), 50);
        assert_eq!(atr(&bars, 14).len(), 50);
        assert_eq!(adx(&bars, 14).len(), 50);
        assert_eq!(stochastic(&bars, 14, 3, 3).slow_k.len(), 50);
        assert_eq!(mfi(&bars, 14).len(), 50);
        assert_eq!(obv(&bars).len(), 50);
        assert_eq!(roc(&data, 12).len(), 50);
    }
}
