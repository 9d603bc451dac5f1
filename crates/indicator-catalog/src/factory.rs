use crate::input::BarInput;
use crate::trend::MovingAverage;
use stream_core::{IndicatorName, IndicatorState, StreamError};

/// Build any catalog member with its conventional default parameters.
///
/// Indicators that consume a configurable scalar input honor `input`; the
/// bar-structural ones (ATR, ADX, Donchian, the volume family) ignore it.
pub fn build_default(
    name: IndicatorName,
    input: BarInput,
) -> Result<Box<dyn IndicatorState>, StreamError> {
    use IndicatorName::*;
    let state: Box<dyn IndicatorState> = match name {
        Sma => Box::new(MovingAverage::sma(20, input)?),
        Ema => Box::new(MovingAverage::ema(20, input)?),
        Dema => Box::new(crate::trend::Dema::new(20, input)?),
        Tema => Box::new(crate::trend::Tema::new(20, input)?),
        Wma => Box::new(MovingAverage::wma(20, input)?),
        WildersMa => Box::new(MovingAverage::wilders(14, input)?),
        HullMa => Box::new(MovingAverage::hull(20, input)?),
        TriangularMa => Box::new(MovingAverage::triangular(20, input)?),
        Kama => Box::new(crate::trend::Kama::new(10, 2, 30, input)?),
        ZeroLagEma => Box::new(MovingAverage::zero_lag(20, input)?),
        Vwma => Box::new(crate::trend::Vwma::new(20, input)?),
        McGinleyDynamic => Box::new(crate::trend::McGinleyDynamic::new(14, input)?),
        Trix => Box::new(crate::trend::Trix::new(15, input)?),
        LinearRegression => Box::new(crate::trend::LinearRegression::new(14, input)?),
        InstantaneousTrendline => {
            Box::new(crate::trend::InstantaneousTrendline::new(20, input)?)
        }
        SuperSmoother => Box::new(MovingAverage::super_smoother(10, input)?),
        Adx => Box::new(crate::trend::Adx::new(14)?),
        Rsi => Box::new(crate::momentum::Rsi::new(14, input)?),
        Macd => Box::new(crate::momentum::Macd::new(12, 26, 9, input)?),
        Roc => Box::new(crate::momentum::Roc::new(12, input)?),
        Momentum => Box::new(crate::momentum::Momentum::new(10, input)?),
        Stochastic => Box::new(crate::momentum::Stochastic::new(14, 3, 3)?),
        StochasticRsi => Box::new(crate::momentum::StochasticRsi::new(14, 14, 3, 3, input)?),
        WilliamsR => Box::new(crate::momentum::WilliamsR::new(14)?),
        Cci => Box::new(crate::momentum::Cci::new(20, input)?),
        Cmo => Box::new(crate::momentum::Cmo::new(14, input)?),
        FisherTransform => Box::new(crate::momentum::FisherTransform::new(10, input)?),
        AwesomeOscillator => Box::new(crate::momentum::AwesomeOscillator::new(5, 34)?),
        UltimateOscillator => Box::new(crate::momentum::UltimateOscillator::new(7, 14, 28)?),
        PercentRank => Box::new(crate::momentum::PercentRank::new(100, input)?),
        Atr => Box::new(crate::volatility::Atr::new(14)?),
        BollingerBands => Box::new(crate::volatility::BollingerBands::new(20, 2.0, input)?),
        KeltnerChannels => {
            Box::new(crate::volatility::KeltnerChannels::new(20, 10, 2.0, input)?)
        }
        DonchianChannels => Box::new(crate::volatility::DonchianChannels::new(20)?),
        StandardDeviation => Box::new(crate::volatility::StandardDeviation::new(20, input)?),
        ChoppinessIndex => Box::new(crate::volatility::ChoppinessIndex::new(14)?),
        UlcerIndex => Box::new(crate::volatility::UlcerIndex::new(14, input)?),
        Obv => Box::new(crate::volume::Obv::new()),
        AccumulationDistribution => Box::new(crate::volume::AccumulationDistribution::new()),
        ChaikinOscillator => Box::new(crate::volume::ChaikinOscillator::new(3, 10)?),
        ChaikinMoneyFlow => Box::new(crate::volume::ChaikinMoneyFlow::new(20)?),
        Mfi => Box::new(crate::volume::Mfi::new(14)?),
        ForceIndex => Box::new(crate::volume::ForceIndex::new(13)?),
        EaseOfMovement => Box::new(crate::volume::EaseOfMovement::new(14)?),
        RollingVwap => Box::new(crate::volume::RollingVwap::new(20)?),
        RoofingFilter => Box::new(crate::cycle::RoofingFilter::new(10, 48, input)?),
        Decycler => Box::new(crate::cycle::Decycler::new(60, input)?),
        CorrelationTrend => Box::new(crate::cycle::CorrelationTrend::new(20, input)?),
        AutocorrelationPeriodogram => {
            Box::new(crate::cycle::AutocorrelationPeriodogram::new(10, 48, input)?)
        }
    };
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::bars_from_ohlcv;

    #[test]
    fn test_factory_builds_entire_catalog() {
        let rows: Vec<(f64, f64, f64, f64, f64)> = (0..80)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.37).sin() * 8.0;
                (c - 0.2, c + 1.0, c - 1.0, c, 1000.0 + 10.0 * i as f64)
            })
            .collect();
        let bars = bars_from_ohlcv(&rows);
        for &name in IndicatorName::all() {
            let mut state = build_default(name, BarInput::default())
                .unwrap_or_else(|e| panic!("{:?}: {}", name, e));
            assert_eq!(state.name(), name);
            for bar in &bars {
                let update = state.update(bar, true, true);
                assert!(update.value.is_finite(), "{:?} produced non-finite", name);
                assert!(update.outputs.is_some());
            }
        }
    }

    #[test]
    fn test_factory_states_are_isolated() {
        let rows = vec![(10.0, 11.0, 9.0, 10.0, 100.0), (10.0, 13.0, 10.0, 12.0, 100.0)];
        let bars = bars_from_ohlcv(&rows);
        let mut a = build_default(IndicatorName::Sma, BarInput::default()).unwrap();
        let mut b = build_default(IndicatorName::Sma, BarInput::default()).unwrap();
        a.update(&bars[0], true, false);
        // b never saw the first bar, so the two disagree on the second
        let va = a.update(&bars[1], true, false).value;
        let vb = b.update(&bars[1], true, false).value;
        assert_ne!(va, vb);
    }
}
