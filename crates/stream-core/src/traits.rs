use crate::{Bar, IndicatorName, IndicatorValue};

/// Incremental indicator state machine.
///
/// Implementations own their rolling windows, smoothers, and scalar memory of
/// prior outputs. Two update modes:
///
/// - `is_final == false`: a provisional bar. The call must be a pure function
///   of current state and the bar: no rolling window is advanced, no smoother
///   commits, no scalar memory changes. Repeating the call yields the same
///   value and leaves the state observably unchanged.
/// - `is_final == true`: the bar's window closed. The call commits exactly
///   once per owned primitive, in construction order.
///
/// Driving a state with a series of closed bars must reproduce the batch
/// calculation for the same series index-by-index.
pub trait IndicatorState: Send + Sync {
    fn update(&mut self, bar: &Bar, is_final: bool, include_outputs: bool) -> IndicatorValue;

    /// Return to the construction-time observable state.
    fn reset(&mut self);

    fn name(&self) -> IndicatorName;
}

/// Factory invoked once per (subscription, timeframe) so every subscription
/// owns a fresh, isolated state.
pub type StateFactory = Box<dyn Fn() -> Box<dyn IndicatorState> + Send + Sync>;
