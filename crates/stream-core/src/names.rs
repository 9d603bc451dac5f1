use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad indicator family used by catalog filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorType {
    Trend,
    Momentum,
    Volatility,
    Volume,
    Other,
}

/// Per-update cost class. Low is constant work per bar; Medium scans its
/// window; High is quadratic in its maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CostClass {
    Low,
    Medium,
    High,
}

/// Every indicator the catalog knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorName {
    // Trend
    Sma,
    Ema,
    Dema,
    Tema,
    Wma,
    WildersMa,
    HullMa,
    TriangularMa,
    Kama,
    ZeroLagEma,
    Vwma,
    McGinleyDynamic,
    Trix,
    LinearRegression,
    InstantaneousTrendline,
    SuperSmoother,
    Adx,
    // Momentum
    Rsi,
    Macd,
    Roc,
    Momentum,
    Stochastic,
    StochasticRsi,
    WilliamsR,
    Cci,
    Cmo,
    FisherTransform,
    AwesomeOscillator,
    UltimateOscillator,
    PercentRank,
    // Volatility
    Atr,
    BollingerBands,
    KeltnerChannels,
    DonchianChannels,
    StandardDeviation,
    ChoppinessIndex,
    UlcerIndex,
    // Volume
    Obv,
    AccumulationDistribution,
    ChaikinOscillator,
    ChaikinMoneyFlow,
    Mfi,
    ForceIndex,
    EaseOfMovement,
    RollingVwap,
    // Cycle analysis (classified Other)
    RoofingFilter,
    Decycler,
    CorrelationTrend,
    AutocorrelationPeriodogram,
}

impl IndicatorName {
    /// Every catalog member, in display order.
    pub fn all() -> &'static [IndicatorName] {
        use IndicatorName::*;
        &[
            Sma,
            Ema,
            Dema,
            Tema,
            Wma,
            WildersMa,
            HullMa,
            TriangularMa,
            Kama,
            ZeroLagEma,
            Vwma,
            McGinleyDynamic,
            Trix,
            LinearRegression,
            InstantaneousTrendline,
            SuperSmoother,
            Adx,
            Rsi,
            Macd,
            Roc,
            Momentum,
            Stochastic,
            StochasticRsi,
            WilliamsR,
            Cci,
            Cmo,
            FisherTransform,
            AwesomeOscillator,
            UltimateOscillator,
            PercentRank,
            Atr,
            BollingerBands,
            KeltnerChannels,
            DonchianChannels,
            StandardDeviation,
            ChoppinessIndex,
            UlcerIndex,
            Obv,
            AccumulationDistribution,
            ChaikinOscillator,
            ChaikinMoneyFlow,
            Mfi,
            ForceIndex,
            EaseOfMovement,
            RollingVwap,
            RoofingFilter,
            Decycler,
            CorrelationTrend,
            AutocorrelationPeriodogram,
        ]
    }

    pub fn indicator_type(&self) -> IndicatorType {
        use IndicatorName::*;
        match self {
            Sma | Ema | Dema | Tema | Wma | WildersMa | HullMa | TriangularMa | Kama
            | ZeroLagEma | Vwma | McGinleyDynamic | Trix | LinearRegression
            | InstantaneousTrendline | SuperSmoother | Adx => IndicatorType::Trend,
            Rsi | Macd | Roc | Momentum | Stochastic | StochasticRsi | WilliamsR | Cci | Cmo
            | FisherTransform | AwesomeOscillator | UltimateOscillator | PercentRank => {
                IndicatorType::Momentum
            }
            Atr | BollingerBands | KeltnerChannels | DonchianChannels | StandardDeviation
            | ChoppinessIndex | UlcerIndex => IndicatorType::Volatility,
            Obv | AccumulationDistribution | ChaikinOscillator | ChaikinMoneyFlow | Mfi
            | ForceIndex | EaseOfMovement | RollingVwap => IndicatorType::Volume,
            RoofingFilter | Decycler | CorrelationTrend | AutocorrelationPeriodogram => {
                IndicatorType::Other
            }
        }
    }

    pub fn cost(&self) -> CostClass {
        use IndicatorName::*;
        match self {
            Wma | HullMa | Cci | PercentRank | UlcerIndex | LinearRegression
            | CorrelationTrend => CostClass::Medium,
            AutocorrelationPeriodogram => CostClass::High,
            _ => CostClass::Low,
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        use IndicatorName::*;
        match self {
            Sma => "Simple Moving Average",
            Ema => "Exponential Moving Average",
            Dema => "Double Exponential Moving Average",
            Tema => "Triple Exponential Moving Average",
            Wma => "Weighted Moving Average",
            WildersMa => "Wilders Smoothing",
            HullMa => "Hull Moving Average",
            TriangularMa => "Triangular Moving Average",
            Kama => "Kaufman Adaptive Moving Average",
            ZeroLagEma => "Zero Lag Exponential Moving Average",
            Vwma => "Volume Weighted Moving Average",
            McGinleyDynamic => "McGinley Dynamic",
            Trix => "Triple Exponential Average",
            LinearRegression => "Linear Regression",
            InstantaneousTrendline => "Ehlers Instantaneous Trendline",
            SuperSmoother => "Ehlers Super Smoother Filter",
            Adx => "Average Directional Index",
            Rsi => "Relative Strength Index",
            Macd => "Moving Average Convergence Divergence",
            Roc => "Rate of Change",
            Momentum => "Momentum",
            Stochastic => "Stochastic Oscillator",
            StochasticRsi => "Stochastic RSI",
            WilliamsR => "Williams %R",
            Cci => "Commodity Channel Index",
            Cmo => "Chande Momentum Oscillator",
            FisherTransform => "Fisher Transform",
            AwesomeOscillator => "Awesome Oscillator",
            UltimateOscillator => "Ultimate Oscillator",
            PercentRank => "Percent Rank",
            Atr => "Average True Range",
            BollingerBands => "Bollinger Bands",
            KeltnerChannels => "Keltner Channels",
            DonchianChannels => "Donchian Channels",
            StandardDeviation => "Standard Deviation",
            ChoppinessIndex => "Choppiness Index",
            UlcerIndex => "Ulcer Index",
            Obv => "On-Balance Volume",
            AccumulationDistribution => "Accumulation/Distribution Line",
            ChaikinOscillator => "Chaikin Oscillator",
            ChaikinMoneyFlow => "Chaikin Money Flow",
            Mfi => "Money Flow Index",
            ForceIndex => "Force Index",
            EaseOfMovement => "Ease of Movement",
            RollingVwap => "Rolling VWAP",
            RoofingFilter => "Ehlers Roofing Filter",
            Decycler => "Ehlers Simple Decycler",
            CorrelationTrend => "Ehlers Correlation Trend Indicator",
            AutocorrelationPeriodogram => "Ehlers Autocorrelation Periodogram",
        }
    }
}

impl fmt::Display for IndicatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
