//! Provider-agnostic market data feed contract.
//!
//! The streaming engine consumes any adapter implementing [`MarketFeed`];
//! nothing here assumes a particular wire protocol.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stream_core::{Bar, Quote, Timeframe, Trade};

/// Delivery callbacks. Adapters invoke these from their own receive context;
/// implementations must be cheap and non-blocking.
pub type TradeCallback = Arc<dyn Fn(Trade) + Send + Sync>;
pub type QuoteCallback = Arc<dyn Fn(Quote) + Send + Sync>;
pub type BarCallback = Arc<dyn Fn(Bar) + Send + Sync>;

/// Current lifecycle state of a feed adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedStatus {
    Idle,
    Running,
    Stopped,
}

/// A market data provider adapter.
///
/// Subscriptions may be issued before or after `start`; events for symbols
/// with no subscription are dropped by the adapter. Events per symbol arrive
/// in non-decreasing timestamp order.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn subscribe_trades(&self, symbols: &[String], callback: TradeCallback) -> Result<()>;

    async fn subscribe_quotes(&self, symbols: &[String], callback: QuoteCallback) -> Result<()>;

    async fn subscribe_bars(
        &self,
        symbols: &[String],
        timeframes: &[Timeframe],
        callback: BarCallback,
    ) -> Result<()>;

    /// Begin delivering events. Idempotent once running.
    async fn start(&self) -> Result<()>;

    /// Stop delivery. In-flight callbacks may complete; no new ones begin
    /// after this returns.
    async fn stop(&self) -> Result<()>;

    fn status(&self) -> FeedStatus;
}
