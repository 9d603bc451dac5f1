use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use stream_core::{CostClass, InputName, Timeframe};

/// Engine-wide behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// When false, in-progress bars are dropped before dispatch and
    /// subscribers only ever see closed bars.
    pub emit_provisional_updates: bool,
    /// When true, quotes are not converted into synthetic midpoint trades
    /// and never reach the aggregators.
    pub suppress_quotes: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            emit_provisional_updates: true,
            suppress_quotes: false,
        }
    }
}

/// Per-subscription dispatch policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionOptions {
    /// Allow provisional (in-progress bar) updates for this subscription.
    pub include_updates: bool,
    /// Attach named sub-outputs to each callback payload.
    pub include_outputs: bool,
    /// Input projection used by bulk registration factories.
    pub input_name: InputName,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            include_updates: true,
            include_outputs: false,
            input_name: InputName::Close,
        }
    }
}

/// Payload delivered to a subscriber for one indicator update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorUpdate {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub bar_start: DateTime<Utc>,
    pub bar_end: DateTime<Utc>,
    pub is_final: bool,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeMap<String, f64>>,
}

/// Subscriber callback. Runs inline on the dispatching thread; must not call
/// back into the engine for the same symbol.
pub type UpdateCallback = Arc<dyn Fn(&IndicatorUpdate) + Send + Sync>;

/// Returned by `register`; identifies every routing-table entry the
/// registration created so `unregister` can remove them.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    pub(crate) symbol: String,
    pub(crate) entries: Vec<(Timeframe, u64)>,
    pub(crate) cost: CostClass,
}

impl SubscriptionHandle {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.entries.iter().map(|(tf, _)| *tf)
    }

    pub fn cost(&self) -> CostClass {
        self.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let engine = EngineOptions::default();
        assert!(engine.emit_provisional_updates);

        let sub = SubscriptionOptions::default();
        assert!(sub.include_updates);
        assert!(!sub.include_outputs);
        assert_eq!(sub.input_name, InputName::Close);
    }

    #[test]
    fn test_update_serializes_without_empty_outputs() {
        let update = IndicatorUpdate {
            symbol: "AAPL".to_string(),
            timeframe: Timeframe::Tick,
            bar_start: Utc::now(),
            bar_end: Utc::now(),
            is_final: true,
            value: 15.0,
            outputs: None,
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(!json.contains("outputs"));
    }
}
