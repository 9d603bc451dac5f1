use rayon::prelude::*;
use std::fmt;
use stream_core::{Bar, IndicatorState};

/// Absolute tolerance for streaming-vs-batch agreement.
pub const TOLERANCE: f64 = 1e-10;

/// First index at which a streaming run diverged from the oracle.
#[derive(Debug, Clone)]
pub struct ParityError {
    pub label: String,
    pub index: usize,
    pub expected: f64,
    pub actual: f64,
}

impl fmt::Display for ParityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parity mismatch for {} at index {}: expected {}, actual {}",
            self.label, self.index, self.expected, self.actual
        )
    }
}

impl std::error::Error for ParityError {}

/// NaN compares equal to NaN; otherwise absolute difference within tolerance.
pub fn values_match(actual: f64, expected: f64) -> bool {
    (actual.is_nan() && expected.is_nan()) || (actual - expected).abs() <= TOLERANCE
}

/// Drive a state over closed bars, collecting the primary values.
pub fn run_streaming(bars: &[Bar], state: &mut dyn IndicatorState) -> Vec<f64> {
    bars.iter()
        .map(|bar| state.update(bar, true, false).value)
        .collect()
}

/// Compare a streaming run against the batch oracle, index by index.
pub fn check_parity(
    label: &str,
    bars: &[Bar],
    state: &mut dyn IndicatorState,
    expected: &[f64],
) -> Result<(), ParityError> {
    assert_eq!(
        bars.len(),
        expected.len(),
        "{}: oracle length does not cover the fixture",
        label
    );
    for (index, bar) in bars.iter().enumerate() {
        let actual = state.update(bar, true, false).value;
        if !values_match(actual, expected[index]) {
            return Err(ParityError {
                label: label.to_string(),
                index,
                expected: expected[index],
                actual,
            });
        }
    }
    Ok(())
}

/// Panicking wrapper for test bodies.
pub fn assert_parity(label: &str, bars: &[Bar], state: &mut dyn IndicatorState, expected: &[f64]) {
    if let Err(e) = check_parity(label, bars, state, expected) {
        panic!("{}", e);
    }
}

/// One entry of a parity sweep: a fresh-state factory plus its oracle.
pub struct ParityCase {
    pub label: String,
    pub factory: Box<dyn Fn() -> Box<dyn IndicatorState> + Send + Sync>,
    pub expected: Vec<f64>,
}

impl ParityCase {
    pub fn new(
        label: impl Into<String>,
        factory: impl Fn() -> Box<dyn IndicatorState> + Send + Sync + 'static,
        expected: Vec<f64>,
    ) -> Self {
        Self {
            label: label.into(),
            factory: Box::new(factory),
            expected,
        }
    }
}

/// Run every case against the same fixture in parallel, returning the
/// failures (empty when the suite is green).
pub fn check_parity_suite(bars: &[Bar], cases: &[ParityCase]) -> Vec<ParityError> {
    cases
        .par_iter()
        .filter_map(|case| {
            let mut state = (case.factory)();
            check_parity(&case.label, bars, state.as_mut(), &case.expected).err()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_match_nan_identity() {
        assert!(values_match(f64::NAN, f64::NAN));
        assert!(!values_match(f64::NAN, 1.0));
        assert!(!values_match(1.0, f64::NAN));
    }

    #[test]
    fn test_values_match_tolerance() {
        assert!(values_match(1.0, 1.0 + 5e-11));
        assert!(!values_match(1.0, 1.0 + 5e-10));
    }
}
