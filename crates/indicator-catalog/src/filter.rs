use serde::{Deserialize, Serialize};
use stream_core::{CostClass, IndicatorName, IndicatorType};

/// Selects the slice of the catalog a bulk registration touches.
///
/// All clauses are conjunctive: a name survives when it is in
/// `include_names` (if set), not in `exclude_names`, of an included type (if
/// set), and at or below `max_cost` (if set).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_names: Option<Vec<IndicatorName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_names: Option<Vec<IndicatorName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_types: Option<Vec<IndicatorType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost: Option<CostClass>,
}

impl CatalogFilter {
    pub fn matches(&self, name: IndicatorName) -> bool {
        if let Some(include) = &self.include_names {
            if !include.contains(&name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_names {
            if exclude.contains(&name) {
                return false;
            }
        }
        if let Some(types) = &self.include_types {
            if !types.contains(&name.indicator_type()) {
                return false;
            }
        }
        if let Some(max_cost) = self.max_cost {
            if name.cost() > max_cost {
                return false;
            }
        }
        true
    }

    /// The surviving catalog members, in catalog order.
    pub fn apply(&self) -> Vec<IndicatorName> {
        IndicatorName::all()
            .iter()
            .copied()
            .filter(|n| self.matches(*n))
            .collect()
    }

    pub fn include_names(mut self, names: Vec<IndicatorName>) -> Self {
        self.include_names = Some(names);
        self
    }

    pub fn exclude_names(mut self, names: Vec<IndicatorName>) -> Self {
        self.exclude_names = Some(names);
        self
    }

    pub fn include_types(mut self, types: Vec<IndicatorType>) -> Self {
        self.include_types = Some(types);
        self
    }

    pub fn max_cost(mut self, cost: CostClass) -> Self {
        self.max_cost = Some(cost);
        self
    }
}
