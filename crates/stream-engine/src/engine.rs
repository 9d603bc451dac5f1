use crate::aggregator::BarAggregator;
use crate::subscription::{
    EngineOptions, IndicatorUpdate, SubscriptionHandle, SubscriptionOptions, UpdateCallback,
};
use dashmap::DashMap;
use indicator_catalog::{build_default, input::validate_input, BarInput, CatalogFilter};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use stream_core::{Bar, CostClass, IndicatorName, IndicatorState, Quote, StreamError, Timeframe, Trade};
use tracing::{debug, warn};

struct Subscription {
    id: u64,
    state: Box<dyn IndicatorState>,
    callback: UpdateCallback,
    options: SubscriptionOptions,
    cost: CostClass,
}

#[derive(Default)]
struct SymbolState {
    aggregators: HashMap<Timeframe, BarAggregator>,
    subscriptions: HashMap<Timeframe, Vec<Subscription>>,
}

impl SymbolState {
    fn handle_trade(&mut self, trade: &Trade, options: &EngineOptions) -> Result<(), StreamError> {
        let mut emissions: Vec<(Timeframe, Vec<Bar>)> = Vec::with_capacity(self.aggregators.len());
        for (tf, agg) in self.aggregators.iter_mut() {
            emissions.push((*tf, agg.on_trade(trade)?));
        }
        for (tf, bars) in emissions {
            self.dispatch(tf, &bars, options);
        }
        Ok(())
    }

    fn handle_bar(&mut self, bar: &Bar, options: &EngineOptions) -> Result<(), StreamError> {
        let mut emissions: Vec<(Timeframe, Vec<Bar>)> = Vec::with_capacity(self.aggregators.len());
        for (tf, agg) in self.aggregators.iter_mut() {
            emissions.push((*tf, agg.on_bar(bar)?));
        }
        for (tf, bars) in emissions {
            self.dispatch(tf, &bars, options);
        }
        Ok(())
    }

    fn dispatch(&mut self, timeframe: Timeframe, bars: &[Bar], options: &EngineOptions) {
        let Some(subs) = self.subscriptions.get_mut(&timeframe) else {
            return;
        };
        for bar in bars {
            if !bar.is_final && !options.emit_provisional_updates {
                continue;
            }
            for sub in subs.iter_mut() {
                if !bar.is_final && !sub.options.include_updates {
                    continue;
                }
                let result = sub.state.update(bar, bar.is_final, sub.options.include_outputs);
                let update = IndicatorUpdate {
                    symbol: bar.symbol.clone(),
                    timeframe,
                    bar_start: bar.start_time,
                    bar_end: bar.end_time,
                    is_final: bar.is_final,
                    value: result.value,
                    outputs: result.outputs,
                };
                // A panicking subscriber must not take down the dispatch of
                // its siblings.
                let callback = sub.callback.clone();
                if catch_unwind(AssertUnwindSafe(|| callback(&update))).is_err() {
                    warn!(
                        symbol = %bar.symbol,
                        timeframe = %timeframe,
                        subscription = sub.id,
                        "subscriber callback panicked; continuing dispatch"
                    );
                }
            }
        }
    }
}

/// Streaming indicator engine: routes trades, quotes, and bars through
/// per-(symbol, timeframe) aggregators into subscribed indicator states.
///
/// Dispatch is single-threaded per symbol on the caller of
/// `on_trade`/`on_quote`/`on_bar`. The routing tables are partitioned by
/// symbol, so distinct symbols never contend on the hot path.
pub struct StreamEngine {
    options: EngineOptions,
    symbols: DashMap<String, SymbolState>,
    next_id: AtomicU64,
}

impl StreamEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            symbols: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register one indicator across the given timeframes. A fresh state is
    /// built per timeframe so no state is ever shared between streams.
    pub fn register<F>(
        &self,
        symbol: &str,
        timeframes: &[Timeframe],
        state_factory: F,
        callback: UpdateCallback,
        options: SubscriptionOptions,
    ) -> Result<SubscriptionHandle, StreamError>
    where
        F: Fn() -> Box<dyn IndicatorState>,
    {
        Self::validate_registration(timeframes, &options)?;

        // Build every state before touching the routing tables so a failure
        // leaves the engine unchanged.
        let states: Vec<(Timeframe, Box<dyn IndicatorState>)> = timeframes
            .iter()
            .map(|tf| (*tf, state_factory()))
            .collect();
        let cost = states
            .first()
            .map(|(_, s)| s.name().cost())
            .unwrap_or(CostClass::Low);

        let mut entry = self.symbols.entry(symbol.to_string()).or_default();
        let mut entries = Vec::with_capacity(states.len());
        for (tf, state) in states {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            entry
                .aggregators
                .entry(tf)
                .or_insert_with(|| BarAggregator::new(symbol, tf));
            entry.subscriptions.entry(tf).or_default().push(Subscription {
                id,
                state,
                callback: callback.clone(),
                options: options.clone(),
                cost,
            });
            entries.push((tf, id));
        }
        debug!(symbol, count = entries.len(), "registered indicator subscription");
        Ok(SubscriptionHandle {
            symbol: symbol.to_string(),
            entries,
            cost,
        })
    }

    /// Bulk-register the filtered catalog, one handle per surviving
    /// (indicator, timeframe) pair, each built with its default parameters.
    pub fn register_all(
        &self,
        symbol: &str,
        timeframes: &[Timeframe],
        callback: UpdateCallback,
        options: SubscriptionOptions,
        filter: Option<&CatalogFilter>,
    ) -> Result<Vec<SubscriptionHandle>, StreamError> {
        Self::validate_registration(timeframes, &options)?;
        let input = BarInput::named(options.input_name)?;
        let names: Vec<IndicatorName> = match filter {
            Some(f) => f.apply(),
            None => IndicatorName::all().to_vec(),
        };

        // Build first, insert after: a bad catalog entry must not leave a
        // partial registration behind.
        let mut built: Vec<(IndicatorName, Timeframe, Box<dyn IndicatorState>)> =
            Vec::with_capacity(names.len() * timeframes.len());
        for &name in &names {
            for &tf in timeframes {
                built.push((name, tf, build_default(name, input.clone())?));
            }
        }

        let mut entry = self.symbols.entry(symbol.to_string()).or_default();
        let mut handles = Vec::with_capacity(built.len());
        for (name, tf, state) in built {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            entry
                .aggregators
                .entry(tf)
                .or_insert_with(|| BarAggregator::new(symbol, tf));
            entry.subscriptions.entry(tf).or_default().push(Subscription {
                id,
                state,
                callback: callback.clone(),
                options: options.clone(),
                cost: name.cost(),
            });
            handles.push(SubscriptionHandle {
                symbol: symbol.to_string(),
                entries: vec![(tf, id)],
                cost: name.cost(),
            });
        }
        debug!(symbol, count = handles.len(), "bulk-registered catalog subscriptions");
        Ok(handles)
    }

    /// Remove a subscription. After this returns no further callbacks fire
    /// for the handle.
    pub fn unregister(&self, handle: &SubscriptionHandle) -> Result<(), StreamError> {
        let mut removed = 0usize;
        if let Some(mut entry) = self.symbols.get_mut(&handle.symbol) {
            for (tf, id) in &handle.entries {
                if let Some(subs) = entry.subscriptions.get_mut(tf) {
                    let before = subs.len();
                    subs.retain(|s| s.id != *id);
                    removed += before - subs.len();
                }
            }
        }
        if removed == 0 {
            return Err(StreamError::SubscriptionNotFound(
                handle.entries.first().map(|(_, id)| *id).unwrap_or(0),
            ));
        }
        debug!(symbol = %handle.symbol, removed, "unregistered subscription");
        Ok(())
    }

    pub fn on_trade(&self, trade: &Trade) -> Result<(), StreamError> {
        let Some(mut entry) = self.symbols.get_mut(&trade.symbol) else {
            return Ok(());
        };
        entry.handle_trade(trade, &self.options)
    }

    /// Quotes aggregate as synthetic zero-size trades at the midpoint unless
    /// the engine was configured to suppress them.
    pub fn on_quote(&self, quote: &Quote) -> Result<(), StreamError> {
        if self.options.suppress_quotes {
            return Ok(());
        }
        let Some(mut entry) = self.symbols.get_mut(&quote.symbol) else {
            return Ok(());
        };
        let synthetic = quote.to_synthetic_trade();
        entry.handle_trade(&synthetic, &self.options)
    }

    pub fn on_bar(&self, bar: &Bar) -> Result<(), StreamError> {
        let Some(mut entry) = self.symbols.get_mut(&bar.symbol) else {
            return Ok(());
        };
        entry.handle_bar(bar, &self.options)
    }

    /// Live subscription counts for a symbol, split by cost class. Useful
    /// for sizing a mass registration before pointing a hot feed at it.
    pub fn subscription_costs(&self, symbol: &str) -> HashMap<CostClass, usize> {
        let mut counts = HashMap::new();
        if let Some(entry) = self.symbols.get(symbol) {
            for subs in entry.subscriptions.values() {
                for sub in subs {
                    *counts.entry(sub.cost).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Close every open bucket for a symbol and dispatch the finals. Stands
    /// in for the time-tick signal of a live clock.
    pub fn flush_symbol(&self, symbol: &str) {
        let Some(mut entry) = self.symbols.get_mut(symbol) else {
            return;
        };
        let state = &mut *entry;
        let mut flushed: Vec<(Timeframe, Vec<Bar>)> = Vec::new();
        for (tf, agg) in state.aggregators.iter_mut() {
            if let Some(bar) = agg.flush() {
                flushed.push((*tf, vec![bar]));
            }
        }
        for (tf, bars) in flushed {
            state.dispatch(tf, &bars, &self.options);
        }
    }

    fn validate_registration(
        timeframes: &[Timeframe],
        options: &SubscriptionOptions,
    ) -> Result<(), StreamError> {
        if timeframes.is_empty() {
            return Err(StreamError::InvalidConfiguration(
                "at least one timeframe is required".to_string(),
            ));
        }
        for tf in timeframes {
            if !tf.is_valid() {
                return Err(StreamError::InvalidConfiguration(format!(
                    "timeframe magnitude must be >= 1, got {}",
                    tf
                )));
            }
        }
        validate_input(options.input_name)?;
        Ok(())
    }
}

impl Default for StreamEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
