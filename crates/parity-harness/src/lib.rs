//! Streaming-vs-batch parity harness.
//!
//! The batch module holds one-shot array calculations that define the
//! canonical per-index values for each indicator, seed arithmetic included.
//! The harness drives a streaming state bar-by-bar with final updates and
//! demands per-index agreement within an absolute tolerance, treating NaN as
//! equal to NaN.

pub mod batch;
pub mod fixture;
pub mod harness;

pub use fixture::{fixture_bars, PerfProfile};
pub use harness::{
    assert_parity, check_parity, check_parity_suite, run_streaming, ParityCase, ParityError,
    TOLERANCE,
};
