use chrono::{TimeZone, Utc};
use indicator_catalog::trend::MovingAverage;
use indicator_catalog::{BarInput, CatalogFilter};
use std::sync::{Arc, Mutex};
use stream_core::{CostClass, IndicatorName, Quote, Timeframe, Trade};
use stream_engine::{
    EngineOptions, IndicatorUpdate, StreamEngine, SubscriptionOptions, UpdateCallback,
};

fn trade(secs: i64, price: f64, size: f64) -> Trade {
    Trade {
        symbol: "AAPL".to_string(),
        timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        price,
        size,
    }
}

fn collector() -> (Arc<Mutex<Vec<IndicatorUpdate>>>, UpdateCallback) {
    let sink: Arc<Mutex<Vec<IndicatorUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = sink.clone();
    let callback: UpdateCallback = Arc::new(move |update: &IndicatorUpdate| {
        captured.lock().unwrap().push(update.clone());
    });
    (sink, callback)
}

fn sma2_factory() -> Box<dyn stream_core::IndicatorState> {
    Box::new(MovingAverage::sma(2, BarInput::default()).unwrap())
}

#[test]
fn test_sma2_over_two_tick_trades() {
    let engine = StreamEngine::default();
    let (sink, callback) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Tick],
            sma2_factory,
            callback,
            SubscriptionOptions {
                include_outputs: true,
                ..Default::default()
            },
        )
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();
    engine.on_trade(&trade(1, 20.0, 1.0)).unwrap();

    let updates = sink.lock().unwrap();
    assert_eq!(updates.len(), 2);
    let second = &updates[1];
    assert!(second.is_final);
    assert_eq!(second.value, 15.0);
    assert_eq!(second.outputs.as_ref().unwrap()["Sma"], 15.0);
}

#[test]
fn test_fan_out_across_tick_and_seconds() {
    let engine = StreamEngine::default();
    let (sink, callback) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Tick, Timeframe::Seconds(1)],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();
    engine.on_trade(&trade(1, 20.0, 1.0)).unwrap();
    engine.on_trade(&trade(2, 30.0, 1.0)).unwrap();

    let updates = sink.lock().unwrap();

    let tick_finals: Vec<f64> = updates
        .iter()
        .filter(|u| u.timeframe == Timeframe::Tick && u.is_final)
        .map(|u| u.value)
        .collect();
    assert_eq!(tick_finals, vec![10.0, 15.0, 25.0]);

    // Tick never emits provisionals
    assert!(updates
        .iter()
        .all(|u| u.timeframe != Timeframe::Tick || u.is_final));

    // Each boundary crossing closes the prior one-second bucket: the SMA(2)
    // over closes 10 then 10,20
    let second_finals: Vec<f64> = updates
        .iter()
        .filter(|u| u.timeframe == Timeframe::Seconds(1) && u.is_final)
        .map(|u| u.value)
        .collect();
    assert_eq!(second_finals, vec![10.0, 15.0]);

    // And the in-progress buckets previewed along the way
    let second_provisionals = updates
        .iter()
        .filter(|u| u.timeframe == Timeframe::Seconds(1) && !u.is_final)
        .count();
    assert!(second_provisionals >= 2);
}

#[test]
fn test_one_trade_produces_one_update_per_emitting_timeframe() {
    let engine = StreamEngine::default();
    let (sink, callback) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Tick, Timeframe::Seconds(1), Timeframe::Minutes(1)],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();

    let updates = sink.lock().unwrap();
    // One final tick bar plus one provisional per bucketed timeframe
    assert_eq!(updates.len(), 3);
    for tf in [Timeframe::Tick, Timeframe::Seconds(1), Timeframe::Minutes(1)] {
        assert_eq!(updates.iter().filter(|u| u.timeframe == tf).count(), 1);
    }
}

#[test]
fn test_cost_filter_bulk_registration_yields_four_handles() {
    let engine = StreamEngine::default();
    let (_sink, callback) = collector();
    let filter = CatalogFilter::default()
        .include_names(vec![IndicatorName::Sma, IndicatorName::Ema])
        .max_cost(CostClass::Low);
    let handles = engine
        .register_all(
            "AAPL",
            &[Timeframe::Tick, Timeframe::Seconds(1)],
            callback,
            SubscriptionOptions::default(),
            Some(&filter),
        )
        .unwrap();
    assert_eq!(handles.len(), 4);
    for handle in &handles {
        assert_eq!(handle.cost(), CostClass::Low);
    }
}

#[test]
fn test_max_cost_excludes_quadratic_indicators() {
    let engine = StreamEngine::default();
    let (_sink, callback) = collector();
    let filter = CatalogFilter::default().max_cost(CostClass::Low);
    let handles = engine
        .register_all(
            "AAPL",
            &[Timeframe::Tick],
            callback,
            SubscriptionOptions::default(),
            Some(&filter),
        )
        .unwrap();
    assert!(handles.iter().all(|h| h.cost() == CostClass::Low));
    let low_count = IndicatorName::all()
        .iter()
        .filter(|n| n.cost() == CostClass::Low)
        .count();
    assert_eq!(handles.len(), low_count);
}

#[test]
fn test_subscription_costs_summary() {
    let engine = StreamEngine::default();
    let (_sink, callback) = collector();
    let filter = CatalogFilter::default().include_names(vec![
        IndicatorName::Sma,
        IndicatorName::Wma,
        IndicatorName::AutocorrelationPeriodogram,
    ]);
    engine
        .register_all(
            "AAPL",
            &[Timeframe::Tick],
            callback,
            SubscriptionOptions::default(),
            Some(&filter),
        )
        .unwrap();

    let costs = engine.subscription_costs("AAPL");
    assert_eq!(costs[&CostClass::Low], 1);
    assert_eq!(costs[&CostClass::Medium], 1);
    assert_eq!(costs[&CostClass::High], 1);
    assert!(engine.subscription_costs("MSFT").is_empty());
}

#[test]
fn test_quote_becomes_synthetic_midpoint_tick() {
    let engine = StreamEngine::default();
    let (sink, callback) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Tick],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    let quote = Quote {
        symbol: "AAPL".to_string(),
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        bid: 100.0,
        ask: 102.0,
        bid_size: 10.0,
        ask_size: 10.0,
    };
    engine.on_quote(&quote).unwrap();

    let updates = sink.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].value, 101.0);
    assert!(updates[0].is_final);
}

#[test]
fn test_suppressed_quotes_never_reach_subscribers() {
    let engine = StreamEngine::new(EngineOptions {
        suppress_quotes: true,
        ..Default::default()
    });
    let (sink, callback) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Tick],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    let quote = Quote {
        symbol: "AAPL".to_string(),
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        bid: 100.0,
        ask: 102.0,
        bid_size: 10.0,
        ask_size: 10.0,
    };
    engine.on_quote(&quote).unwrap();
    assert!(sink.lock().unwrap().is_empty());
}

#[test]
fn test_unsubscribe_terminates_callbacks() {
    let engine = StreamEngine::default();
    let (sink, callback) = collector();
    let handle = engine
        .register(
            "AAPL",
            &[Timeframe::Tick],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();
    engine.unregister(&handle).unwrap();
    engine.on_trade(&trade(1, 20.0, 1.0)).unwrap();

    assert_eq!(sink.lock().unwrap().len(), 1);
    // Second unregister reports the handle as gone
    assert!(engine.unregister(&handle).is_err());
}

#[test]
fn test_provisional_updates_gated_globally() {
    let engine = StreamEngine::new(EngineOptions {
        emit_provisional_updates: false,
        ..Default::default()
    });
    let (sink, callback) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Seconds(1)],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();
    engine.on_trade(&trade(1, 20.0, 1.0)).unwrap();

    let updates = sink.lock().unwrap();
    assert!(!updates.is_empty());
    assert!(updates.iter().all(|u| u.is_final));
}

#[test]
fn test_provisional_updates_gated_per_subscription() {
    let engine = StreamEngine::default();
    let (finals_only_sink, finals_only_cb) = collector();
    let (all_sink, all_cb) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Seconds(1)],
            sma2_factory,
            finals_only_cb,
            SubscriptionOptions {
                include_updates: false,
                ..Default::default()
            },
        )
        .unwrap();
    engine
        .register(
            "AAPL",
            &[Timeframe::Seconds(1)],
            sma2_factory,
            all_cb,
            SubscriptionOptions::default(),
        )
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();
    engine.on_trade(&trade(1, 20.0, 1.0)).unwrap();

    assert!(finals_only_sink.lock().unwrap().iter().all(|u| u.is_final));
    assert!(all_sink.lock().unwrap().iter().any(|u| !u.is_final));
}

#[test]
fn test_panicking_callback_is_isolated() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("stream_engine=debug")
        .try_init();
    let engine = StreamEngine::default();
    let panicking: UpdateCallback = Arc::new(|_update: &IndicatorUpdate| {
        panic!("subscriber bug");
    });
    let (sink, callback) = collector();

    engine
        .register(
            "AAPL",
            &[Timeframe::Tick],
            sma2_factory,
            panicking,
            SubscriptionOptions::default(),
        )
        .unwrap();
    engine
        .register(
            "AAPL",
            &[Timeframe::Tick],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();
    assert_eq!(sink.lock().unwrap().len(), 1);
}

#[test]
fn test_out_of_order_trade_propagates_error() {
    let engine = StreamEngine::default();
    let (sink, callback) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Seconds(1)],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    engine.on_trade(&trade(10, 10.0, 1.0)).unwrap();
    let before = sink.lock().unwrap().len();
    assert!(engine.on_trade(&trade(5, 11.0, 1.0)).is_err());
    // Rejected event produced no dispatch
    assert_eq!(sink.lock().unwrap().len(), before);
}

#[test]
fn test_unknown_symbol_events_are_ignored() {
    let engine = StreamEngine::default();
    assert!(engine.on_trade(&trade(0, 10.0, 1.0)).is_ok());
}

#[test]
fn test_registration_rejects_unsupported_input() {
    let engine = StreamEngine::default();
    let (_sink, callback) = collector();
    let result = engine.register(
        "AAPL",
        &[Timeframe::Tick],
        sma2_factory,
        callback,
        SubscriptionOptions {
            input_name: stream_core::InputName::Midpoint,
            ..Default::default()
        },
    );
    assert!(result.is_err());
}

#[test]
fn test_registration_rejects_zero_magnitude_timeframe() {
    let engine = StreamEngine::default();
    let (_sink, callback) = collector();
    let result = engine.register(
        "AAPL",
        &[Timeframe::Seconds(0)],
        sma2_factory,
        callback,
        SubscriptionOptions::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_flush_closes_open_buckets() {
    let engine = StreamEngine::default();
    let (sink, callback) = collector();
    engine
        .register(
            "AAPL",
            &[Timeframe::Minutes(1)],
            sma2_factory,
            callback,
            SubscriptionOptions::default(),
        )
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();
    engine.flush_symbol("AAPL");

    let updates = sink.lock().unwrap();
    assert!(updates.iter().any(|u| u.is_final));
}

#[test]
fn test_registration_order_preserved_within_bar() {
    let engine = StreamEngine::default();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let first_order = order.clone();
    let first: UpdateCallback = Arc::new(move |_u: &IndicatorUpdate| {
        first_order.lock().unwrap().push("first");
    });
    let second_order = order.clone();
    let second: UpdateCallback = Arc::new(move |_u: &IndicatorUpdate| {
        second_order.lock().unwrap().push("second");
    });

    engine
        .register("AAPL", &[Timeframe::Tick], sma2_factory, first, SubscriptionOptions::default())
        .unwrap();
    engine
        .register("AAPL", &[Timeframe::Tick], sma2_factory, second, SubscriptionOptions::default())
        .unwrap();

    engine.on_trade(&trade(0, 10.0, 1.0)).unwrap();
    engine.on_trade(&trade(1, 11.0, 1.0)).unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["first", "second", "first", "second"]
    );
}
