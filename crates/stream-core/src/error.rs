use crate::types::InputName;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("Unsupported input {input:?}: {reason}")]
    UnsupportedInput { input: InputName, reason: String },

    #[error("Out-of-order event for {symbol}: last seen {latest}, got {incoming}")]
    OutOfOrderEvent {
        symbol: String,
        latest: DateTime<Utc>,
        incoming: DateTime<Utc>,
    },

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(u64),
}

impl StreamError {
    /// Reject window lengths below 1 at construction time.
    pub fn require_length(what: &str, length: usize) -> Result<(), StreamError> {
        if length < 1 {
            return Err(StreamError::InvalidConfiguration(format!(
                "{} length must be >= 1, got {}",
                what, length
            )));
        }
        Ok(())
    }
}
