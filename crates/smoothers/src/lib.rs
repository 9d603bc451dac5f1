//! Single-input/single-output incremental moving-average filters.
//!
//! Every smoother exposes `next(v, is_final)`: a final call commits state
//! once, a provisional call computes the same value purely and can be
//! repeated (or refined) any number of times before the commit.

pub mod average;
pub mod ehlers;
pub mod fir;

pub use average::{Ema, HullMa, Sma, TriangularMa, WildersMa, Wma, ZeroLagEma};
pub use ehlers::{SuperSmoother2Pole, SuperSmoother3Pole};
pub use fir::{HammingMa, HannMa};

use serde::{Deserialize, Serialize};

/// Incremental smoothing filter.
pub trait Smoother: Send + Sync {
    /// Feed one input. `is_final == false` must not advance state.
    fn next(&mut self, value: f64, is_final: bool) -> f64;

    /// Return to the construction-time state.
    fn reset(&mut self);
}

/// Smoother families the factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaKind {
    Simple,
    Exponential,
    Weighted,
    Wilders,
    Triangular,
    Hull,
    ZeroLagExponential,
    Hann,
    Hamming,
    Ehlers2PoleSuperSmoother,
    Ehlers3PoleSuperSmoother,
}

/// Build a smoother by kind and length. Lengths below 1 clamp to 1.
pub fn make_smoother(kind: MaKind, length: usize) -> Box<dyn Smoother> {
    match kind {
        MaKind::Simple => Box::new(Sma::new(length)),
        MaKind::Exponential => Box::new(Ema::new(length)),
        MaKind::Weighted => Box::new(Wma::new(length)),
        MaKind::Wilders => Box::new(WildersMa::new(length)),
        MaKind::Triangular => Box::new(TriangularMa::new(length)),
        MaKind::Hull => Box::new(HullMa::new(length)),
        MaKind::ZeroLagExponential => Box::new(ZeroLagEma::new(length)),
        MaKind::Hann => Box::new(HannMa::new(length)),
        MaKind::Hamming => Box::new(HammingMa::new(length)),
        MaKind::Ehlers2PoleSuperSmoother => Box::new(SuperSmoother2Pole::new(length)),
        MaKind::Ehlers3PoleSuperSmoother => Box::new(SuperSmoother3Pole::new(length)),
    }
}
