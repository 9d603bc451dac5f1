use std::fmt;
use std::sync::Arc;
use stream_core::{Bar, InputName, StreamError};

/// Project a bar to a scalar by tagged name.
///
/// Only pointwise, single-bar projections are supported here. Names that need
/// cross-bar lookback (window midpoints, chained indicator inputs) fail with
/// a typed error so the mistake surfaces at construction, not mid-stream.
pub fn resolve_input(bar: &Bar, name: InputName) -> Result<f64, StreamError> {
    validate_input(name)?;
    Ok(project_pointwise(bar, name))
}

/// Reject input names the pointwise resolver cannot serve.
pub fn validate_input(name: InputName) -> Result<(), StreamError> {
    match name {
        InputName::Midpoint => Err(StreamError::UnsupportedInput {
            input: name,
            reason: "requires cross-bar lookback; pass a projection closure instead".to_string(),
        }),
        _ => Ok(()),
    }
}

fn project_pointwise(bar: &Bar, name: InputName) -> f64 {
    match name {
        InputName::Close => bar.close,
        InputName::Open => bar.open,
        InputName::High => bar.high,
        InputName::Low => bar.low,
        InputName::TypicalPrice => (bar.high + bar.low + bar.close) / 3.0,
        InputName::WeightedClose => (bar.high + bar.low + 2.0 * bar.close) / 4.0,
        InputName::FullTypicalPrice => (bar.open + bar.high + bar.low + bar.close) / 4.0,
        InputName::MedianPrice => (bar.high + bar.low) / 2.0,
        InputName::Volume => bar.volume,
        // Rejected by validate_input; never constructed into a BarInput.
        InputName::Midpoint => f64::NAN,
    }
}

/// Per-indicator input projection: either a validated tagged name or a
/// caller-supplied closure.
#[derive(Clone)]
pub enum BarInput {
    Named(InputName),
    Custom(Arc<dyn Fn(&Bar) -> f64 + Send + Sync>),
}

impl BarInput {
    /// Build from a tagged name, rejecting unsupported projections.
    pub fn named(name: InputName) -> Result<Self, StreamError> {
        validate_input(name)?;
        Ok(BarInput::Named(name))
    }

    /// Caller-supplied projection, bypassing the tagged resolver.
    pub fn custom(f: impl Fn(&Bar) -> f64 + Send + Sync + 'static) -> Self {
        BarInput::Custom(Arc::new(f))
    }

    /// Infallible on the hot path: unsupported names cannot be constructed.
    pub fn project(&self, bar: &Bar) -> f64 {
        match self {
            BarInput::Named(name) => project_pointwise(bar, *name),
            BarInput::Custom(f) => f(bar),
        }
    }
}

impl Default for BarInput {
    fn default() -> Self {
        BarInput::Named(InputName::Close)
    }
}

impl fmt::Debug for BarInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarInput::Named(name) => write!(f, "BarInput::Named({:?})", name),
            BarInput::Custom(_) => write!(f, "BarInput::Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::bars_from_ohlcv;

    #[test]
    fn test_typical_price() {
        let bars = bars_from_ohlcv(&[(100.0, 110.0, 90.0, 105.0, 0.0)]);
        let v = resolve_input(&bars[0], InputName::TypicalPrice).unwrap();
        assert!((v - (110.0 + 90.0 + 105.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pointwise_projections() {
        let bars = bars_from_ohlcv(&[(10.0, 20.0, 5.0, 15.0, 300.0)]);
        let bar = &bars[0];
        assert_eq!(resolve_input(bar, InputName::Open).unwrap(), 10.0);
        assert_eq!(resolve_input(bar, InputName::High).unwrap(), 20.0);
        assert_eq!(resolve_input(bar, InputName::Low).unwrap(), 5.0);
        assert_eq!(resolve_input(bar, InputName::Close).unwrap(), 15.0);
        assert_eq!(resolve_input(bar, InputName::MedianPrice).unwrap(), 12.5);
        assert_eq!(
            resolve_input(bar, InputName::WeightedClose).unwrap(),
            (20.0 + 5.0 + 30.0) / 4.0
        );
        assert_eq!(
            resolve_input(bar, InputName::FullTypicalPrice).unwrap(),
            12.5
        );
        assert_eq!(resolve_input(bar, InputName::Volume).unwrap(), 300.0);
    }

    #[test]
    fn test_midpoint_rejected() {
        let bars = bars_from_ohlcv(&[(10.0, 20.0, 5.0, 15.0, 300.0)]);
        let err = resolve_input(&bars[0], InputName::Midpoint).unwrap_err();
        assert!(matches!(err, StreamError::UnsupportedInput { .. }));
        assert!(BarInput::named(InputName::Midpoint).is_err());
    }

    #[test]
    fn test_custom_projection() {
        let bars = bars_from_ohlcv(&[(10.0, 20.0, 5.0, 15.0, 300.0)]);
        let input = BarInput::custom(|b| b.high - b.low);
        assert_eq!(input.project(&bars[0]), 15.0);
    }
}
