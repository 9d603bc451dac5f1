use indicator_catalog::momentum::{Macd, Rsi, Stochastic};
use indicator_catalog::trend::{Adx, MovingAverage};
use indicator_catalog::volatility::Atr;
use indicator_catalog::volume::{Mfi, Obv};
use indicator_catalog::{build_default, BarInput};
use parity_harness::batch::{self, closes};
use parity_harness::{
    assert_parity, check_parity_suite, fixture_bars, run_streaming, ParityCase, PerfProfile,
};
use smoothers::{Sma, Smoother};
use stream_core::{IndicatorName, IndicatorState};

fn fixture() -> Vec<stream_core::Bar> {
    fixture_bars(PerfProfile::from_env().fixture_len())
}

#[test]
fn test_parity_sma_20() {
    let bars = fixture();
    let expected = batch::sma(&closes(&bars), 20);
    let mut state = MovingAverage::sma(20, BarInput::default()).unwrap();
    assert_parity("Sma(20)", &bars, &mut state, &expected);
}

#[test]
fn test_parity_ema_20() {
    let bars = fixture();
    let expected = batch::ema(&closes(&bars), 20);
    let mut state = MovingAverage::ema(20, BarInput::default()).unwrap();
    assert_parity("Ema(20)", &bars, &mut state, &expected);
}

#[test]
fn test_parity_rsi_14() {
    let bars = fixture();
    let expected = batch::rsi(&closes(&bars), 14);
    let mut state = Rsi::new(14, BarInput::default()).unwrap();
    assert_parity("Rsi(14)", &bars, &mut state, &expected);
}

#[test]
fn test_parity_macd_12_26_9() {
    let bars = fixture();
    let expected = batch::macd(&closes(&bars), 12, 26, 9);
    let mut state = Macd::new(12, 26, 9, BarInput::default()).unwrap();
    assert_parity("Macd(12,26,9)", &bars, &mut state, &expected.macd);

    // Named outputs carry the signal and histogram; check those too
    let mut state = Macd::new(12, 26, 9, BarInput::default()).unwrap();
    for (i, bar) in bars.iter().enumerate() {
        let outputs = state.update(bar, true, true).outputs.unwrap();
        assert!(
            (outputs["Signal"] - expected.signal[i]).abs() <= parity_harness::TOLERANCE,
            "signal diverged at {}",
            i
        );
        assert!(
            (outputs["Histogram"] - expected.histogram[i]).abs() <= parity_harness::TOLERANCE,
            "histogram diverged at {}",
            i
        );
    }
}

#[test]
fn test_parity_atr_14() {
    let bars = fixture();
    let expected = batch::atr(&bars, 14);
    let mut state = Atr::new(14).unwrap();
    assert_parity("Atr(14)", &bars, &mut state, &expected);
}

#[test]
fn test_parity_adx_14() {
    let bars = fixture();
    let expected = batch::adx(&bars, 14);
    let mut state = Adx::new(14).unwrap();
    assert_parity("Adx(14)", &bars, &mut state, &expected);
}

#[test]
fn test_parity_stochastic_14_3_3() {
    let bars = fixture();
    let expected = batch::stochastic(&bars, 14, 3, 3);
    let mut state = Stochastic::new(14, 3, 3).unwrap();
    assert_parity("Stochastic(14,3,3)", &bars, &mut state, &expected.slow_k);
}

#[test]
fn test_parity_mfi_14() {
    let bars = fixture();
    let expected = batch::mfi(&bars, 14);
    let mut state = Mfi::new(14).unwrap();
    assert_parity("Mfi(14)", &bars, &mut state, &expected);
}

#[test]
fn test_parity_obv() {
    let bars = fixture();
    let expected = batch::obv(&bars);
    let mut state = Obv::new();
    assert_parity("Obv", &bars, &mut state, &expected);
}

#[test]
fn test_parity_roc_12() {
    let bars = fixture();
    let expected = batch::roc(&closes(&bars), 12);
    let mut state = indicator_catalog::momentum::Roc::new(12, BarInput::default()).unwrap();
    assert_parity("Roc(12)", &bars, &mut state, &expected);
}

#[test]
fn test_parity_smoke_sweep_parallel() {
    let bars = fixture();
    let data = closes(&bars);

    let cases = vec![
        ParityCase::new(
            "Sma(20)",
            || Box::new(MovingAverage::sma(20, BarInput::default()).unwrap()),
            batch::sma(&data, 20),
        ),
        ParityCase::new(
            "Ema(20)",
            || Box::new(MovingAverage::ema(20, BarInput::default()).unwrap()),
            batch::ema(&data, 20),
        ),
        ParityCase::new(
            "Rsi(14)",
            || Box::new(Rsi::new(14, BarInput::default()).unwrap()),
            batch::rsi(&data, 14),
        ),
        ParityCase::new(
            "Macd(12,26,9)",
            || Box::new(Macd::new(12, 26, 9, BarInput::default()).unwrap()),
            batch::macd(&data, 12, 26, 9).macd,
        ),
        ParityCase::new("Atr(14)", || Box::new(Atr::new(14).unwrap()), batch::atr(&bars, 14)),
        ParityCase::new("Adx(14)", || Box::new(Adx::new(14).unwrap()), batch::adx(&bars, 14)),
        ParityCase::new(
            "Stochastic(14,3,3)",
            || Box::new(Stochastic::new(14, 3, 3).unwrap()),
            batch::stochastic(&bars, 14, 3, 3).slow_k,
        ),
        ParityCase::new("Mfi(14)", || Box::new(Mfi::new(14).unwrap()), batch::mfi(&bars, 14)),
        ParityCase::new("Obv", || Box::new(Obv::new()), batch::obv(&bars)),
        ParityCase::new(
            "Roc(12)",
            || Box::new(indicator_catalog::momentum::Roc::new(12, BarInput::default()).unwrap()),
            batch::roc(&data, 12),
        ),
    ];

    let failures = check_parity_suite(&bars, &cases);
    assert!(
        failures.is_empty(),
        "{}",
        failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    );
}

#[test]
fn test_smoother_matches_batch_counterparts() {
    let bars = fixture();
    let data = closes(&bars);
    let expected = batch::sma(&data, 10);
    let mut sma = Sma::new(10);
    for (i, &v) in data.iter().enumerate() {
        let out = sma.next(v, true);
        assert!((out - expected[i]).abs() <= parity_harness::TOLERANCE);
    }
}

#[test]
fn test_catalog_provisional_idempotence_and_coherence() {
    let bars = fixture_bars(128);
    for &name in IndicatorName::all() {
        let mut state = build_default(name, BarInput::default()).unwrap();
        for bar in &bars {
            let p1 = state.update(bar, false, true);
            let p2 = state.update(bar, false, true);
            assert_eq!(p1, p2, "{:?}: provisional update not idempotent", name);
            let committed = state.update(bar, true, true);
            assert_eq!(
                p1.value, committed.value,
                "{:?}: provisional and final disagree on the same bar",
                name
            );
        }
    }
}

#[test]
fn test_catalog_reset_equivalence() {
    let bars = fixture_bars(96);
    for &name in IndicatorName::all() {
        let mut state = build_default(name, BarInput::default()).unwrap();
        let _ = run_streaming(&bars, state.as_mut());
        state.reset();
        let replayed = run_streaming(&bars, state.as_mut());

        let mut fresh = build_default(name, BarInput::default()).unwrap();
        let reference = run_streaming(&bars, fresh.as_mut());
        assert_eq!(replayed, reference, "{:?}: reset is not equivalent to fresh", name);
    }
}

#[test]
fn test_catalog_determinism_across_instances() {
    let bars = fixture_bars(96);
    for &name in IndicatorName::all() {
        let mut a = build_default(name, BarInput::default()).unwrap();
        let mut b = build_default(name, BarInput::default()).unwrap();
        assert_eq!(
            run_streaming(&bars, a.as_mut()),
            run_streaming(&bars, b.as_mut()),
            "{:?}: nondeterministic output",
            name
        );
    }
}
