//! The indicator catalog: input projection, catalog metadata filtering, the
//! default-parameter factory, and the incremental state machines themselves,
//! grouped by family.

pub mod cycle;
pub mod factory;
pub mod filter;
pub mod input;
pub mod momentum;
pub mod trend;
pub mod util;
pub mod volatility;
pub mod volume;

pub use factory::build_default;
pub use filter::CatalogFilter;
pub use input::{resolve_input, BarInput};

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{Duration, TimeZone, Utc};
    use stream_core::{Bar, Timeframe};

    /// Closed daily bars around a close series, spaced one day apart.
    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                symbol: "TEST".to_string(),
                timeframe: Timeframe::Days(1),
                start_time: t0 + Duration::days(i as i64),
                end_time: t0 + Duration::days(i as i64 + 1),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000.0,
                is_final: true,
            })
            .collect()
    }

    /// Closed daily bars from explicit (open, high, low, close, volume) rows.
    pub fn bars_from_ohlcv(rows: &[(f64, f64, f64, f64, f64)]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close, volume))| Bar {
                symbol: "TEST".to_string(),
                timeframe: Timeframe::Days(1),
                start_time: t0 + Duration::days(i as i64),
                end_time: t0 + Duration::days(i as i64 + 1),
                open,
                high,
                low,
                close,
                volume,
                is_final: true,
            })
            .collect()
    }
}
