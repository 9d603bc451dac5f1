pub mod error;
pub mod names;
pub mod traits;
pub mod types;

pub use error::*;
pub use names::*;
pub use traits::*;
pub use types::*;
