use chrono::{DateTime, Utc};
use stream_core::{Bar, StreamError, Timeframe, Trade};

/// In-progress bucket for one (symbol, timeframe).
#[derive(Debug, Clone)]
struct Accumulator {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    event_count: u64,
}

impl Accumulator {
    fn from_trade(trade: &Trade, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.size,
            event_count: 1,
        }
    }

    fn from_bar(bar: &Bar, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            event_count: 1,
        }
    }

    fn merge_trade(&mut self, trade: &Trade) {
        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.close = trade.price;
        self.volume += trade.size;
        self.event_count += 1;
    }

    fn merge_bar(&mut self, bar: &Bar) {
        self.high = self.high.max(bar.high);
        self.low = self.low.min(bar.low);
        self.close = bar.close;
        self.volume += bar.volume;
        self.event_count += 1;
    }

    fn to_bar(&self, symbol: &str, timeframe: Timeframe, is_final: bool) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timeframe,
            start_time: self.start,
            end_time: self.end,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            is_final,
        }
    }
}

/// Converts monotone trade/bar events into OHLCV bars for one timeframe.
///
/// Time-bucketed timeframes emit one provisional bar per event while a bucket
/// is open, then the closed bucket exactly once as final when an event
/// crosses the boundary. Tick treats every trade as its own final bar and
/// never emits provisionals.
#[derive(Debug)]
pub struct BarAggregator {
    symbol: String,
    timeframe: Timeframe,
    current: Option<Accumulator>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl BarAggregator {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            current: None,
            last_timestamp: None,
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Events folded into the open bucket so far; zero when no bucket is
    /// open.
    pub fn current_event_count(&self) -> u64 {
        self.current.as_ref().map(|acc| acc.event_count).unwrap_or(0)
    }

    /// Reject timestamp regressions without touching the accumulator.
    fn check_order(&self, ts: DateTime<Utc>) -> Result<(), StreamError> {
        if let Some(latest) = self.last_timestamp {
            if ts < latest {
                return Err(StreamError::OutOfOrderEvent {
                    symbol: self.symbol.clone(),
                    latest,
                    incoming: ts,
                });
            }
        }
        Ok(())
    }

    pub fn on_trade(&mut self, trade: &Trade) -> Result<Vec<Bar>, StreamError> {
        self.check_order(trade.timestamp)?;
        self.last_timestamp = Some(trade.timestamp);

        let Some(period) = self.timeframe.period() else {
            // Tick: each trade is a closed single-tick bar.
            return Ok(vec![Bar {
                symbol: self.symbol.clone(),
                timeframe: self.timeframe,
                start_time: trade.timestamp,
                end_time: trade.timestamp,
                open: trade.price,
                high: trade.price,
                low: trade.price,
                close: trade.price,
                volume: trade.size,
                is_final: true,
            }]);
        };

        let bucket_start = self.timeframe.floor(trade.timestamp);
        let bucket_end = bucket_start + period;
        let mut emissions = Vec::with_capacity(2);

        match &mut self.current {
            None => {
                self.current = Some(Accumulator::from_trade(trade, bucket_start, bucket_end));
            }
            Some(acc) if trade.timestamp < acc.end => {
                acc.merge_trade(trade);
            }
            Some(acc) => {
                // Boundary crossed: close the old bucket, open the new one.
                emissions.push(acc.to_bar(&self.symbol, self.timeframe, true));
                self.current = Some(Accumulator::from_trade(trade, bucket_start, bucket_end));
            }
        }
        let acc = self.current.as_ref().expect("bucket opened above");
        emissions.push(acc.to_bar(&self.symbol, self.timeframe, false));
        Ok(emissions)
    }

    /// Fold an externally produced bar into this timeframe. Provisional input
    /// bars preview the merge without committing it, so re-emissions of the
    /// same in-progress bar cannot double count.
    pub fn on_bar(&mut self, bar: &Bar) -> Result<Vec<Bar>, StreamError> {
        self.check_order(bar.start_time)?;

        let Some(period) = self.timeframe.period() else {
            // Tick pass-through, re-tagged to this aggregator's stream.
            self.last_timestamp = Some(bar.start_time);
            let mut out = bar.clone();
            out.symbol = self.symbol.clone();
            out.timeframe = self.timeframe;
            return Ok(vec![out]);
        };

        let bucket_start = self.timeframe.floor(bar.start_time);
        let bucket_end = bucket_start + period;
        let mut emissions = Vec::with_capacity(2);

        if !bar.is_final {
            // Pure preview against the current accumulator state.
            let preview = match &self.current {
                Some(acc) if bar.start_time < acc.end => {
                    let mut merged = acc.clone();
                    merged.merge_bar(bar);
                    merged
                }
                _ => Accumulator::from_bar(bar, bucket_start, bucket_end),
            };
            emissions.push(preview.to_bar(&self.symbol, self.timeframe, false));
            return Ok(emissions);
        }

        self.last_timestamp = Some(bar.start_time);
        match &mut self.current {
            None => {
                self.current = Some(Accumulator::from_bar(bar, bucket_start, bucket_end));
            }
            Some(acc) if bar.start_time < acc.end => {
                acc.merge_bar(bar);
            }
            Some(acc) => {
                emissions.push(acc.to_bar(&self.symbol, self.timeframe, true));
                self.current = Some(Accumulator::from_bar(bar, bucket_start, bucket_end));
            }
        }
        let acc = self.current.as_ref().expect("bucket opened above");
        if acc.end <= bar.end_time {
            // The input bar covers the whole bucket, so it is already closed.
            emissions.push(acc.to_bar(&self.symbol, self.timeframe, true));
            self.current = None;
        } else {
            emissions.push(acc.to_bar(&self.symbol, self.timeframe, false));
        }
        Ok(emissions)
    }

    /// Close and emit the open bucket, if any. Used on shutdown or on an
    /// external time-tick signal.
    pub fn flush(&mut self) -> Option<Bar> {
        self.current
            .take()
            .map(|acc| acc.to_bar(&self.symbol, self.timeframe, true))
    }
}
