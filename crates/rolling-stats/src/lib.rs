//! Fixed-capacity rolling aggregates for incremental indicators.
//!
//! Every primitive has a mutating `add` and a pure `preview`: `preview(v)`
//! answers "what would the aggregate be if `v` were committed" without
//! touching state. Indicators call `preview` for in-progress bars and `add`
//! exactly once when the bar closes, so a provisional value can never be
//! applied twice.

pub mod minmax;
pub mod ring;
pub mod sum;

pub use minmax::{RollingMax, RollingMin};
pub use ring::RingBuffer;
pub use sum::RollingSum;
