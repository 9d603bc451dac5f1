use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Bar interval. Tick treats every input event as its own closed bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Tick,
    Seconds(u32),
    Minutes(u32),
    Hours(u32),
    Days(u32),
}

impl Timeframe {
    /// Duration of one bar, or None for tick bars.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Timeframe::Tick => None,
            Timeframe::Seconds(n) => Some(Duration::seconds(*n as i64)),
            Timeframe::Minutes(n) => Some(Duration::minutes(*n as i64)),
            Timeframe::Hours(n) => Some(Duration::hours(*n as i64)),
            Timeframe::Days(n) => Some(Duration::days(*n as i64)),
        }
    }

    /// Bar length in whole seconds, or None for tick bars.
    pub fn period_seconds(&self) -> Option<i64> {
        self.period().map(|d| d.num_seconds())
    }

    /// The interval magnitude, 0 for tick.
    pub fn magnitude(&self) -> u32 {
        match self {
            Timeframe::Tick => 0,
            Timeframe::Seconds(n)
            | Timeframe::Minutes(n)
            | Timeframe::Hours(n)
            | Timeframe::Days(n) => *n,
        }
    }

    /// Floor a timestamp down to the start of the bucket containing it.
    /// Tick timeframes bucket to the event timestamp itself.
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self.period_seconds() {
            None => ts,
            Some(secs) => {
                let epoch = ts.timestamp();
                let floored = epoch - epoch.rem_euclid(secs);
                Utc.timestamp_opt(floored, 0).single().unwrap_or(ts)
            }
        }
    }

    /// Human-readable name, e.g. "tick", "5s", "15m", "4h", "1d".
    pub fn name(&self) -> String {
        match self {
            Timeframe::Tick => "tick".to_string(),
            Timeframe::Seconds(n) => format!("{}s", n),
            Timeframe::Minutes(n) => format!("{}m", n),
            Timeframe::Hours(n) => format!("{}h", n),
            Timeframe::Days(n) => format!("{}d", n),
        }
    }

    /// Interval magnitudes must be at least 1 for non-tick timeframes.
    pub fn is_valid(&self) -> bool {
        !matches!(
            self,
            Timeframe::Seconds(0) | Timeframe::Minutes(0) | Timeframe::Hours(0) | Timeframe::Days(0)
        )
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// OHLCV bar for one symbol and timeframe.
///
/// A provisional bar (`is_final == false`) may be re-emitted many times while
/// its window is open; a final bar is emitted exactly once per window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub is_final: bool,
}

/// Trade print.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub size: f64,
}

/// Top-of-book quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
    pub bid_size: f64,
    pub ask_size: f64,
}

impl Quote {
    /// Bid/ask midpoint.
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Synthetic zero-size trade at the midpoint, used for aggregation.
    pub fn to_synthetic_trade(&self) -> Trade {
        Trade {
            symbol: self.symbol.clone(),
            timestamp: self.timestamp,
            price: self.mid(),
            size: 0.0,
        }
    }
}

/// Scalar projection applied to each bar before it reaches an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputName {
    Close,
    Open,
    High,
    Low,
    /// (high + low + close) / 3
    TypicalPrice,
    /// (high + low + 2 * close) / 4
    WeightedClose,
    /// (open + high + low + close) / 4
    FullTypicalPrice,
    /// (high + low) / 2
    MedianPrice,
    Volume,
    /// Highest-high/lowest-low midpoint over a trailing window. Requires
    /// cross-bar lookback and is rejected by the pointwise resolver.
    Midpoint,
}

impl Default for InputName {
    fn default() -> Self {
        InputName::Close
    }
}

/// One indicator output: the primary value plus named sub-outputs when the
/// subscriber asked for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValue {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeMap<String, f64>>,
}

impl IndicatorValue {
    pub fn single(value: f64) -> Self {
        Self {
            value,
            outputs: None,
        }
    }

    /// Attach named outputs only when the caller asked for them, keeping the
    /// hot path allocation-free otherwise.
    pub fn with_outputs<const N: usize>(
        value: f64,
        include: bool,
        entries: [(&str, f64); N],
    ) -> Self {
        let outputs = include.then(|| {
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<String, f64>>()
        });
        Self { value, outputs }
    }
}
