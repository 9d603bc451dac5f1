//! In-process market feed that replays a recorded event script.
//!
//! The reference [`MarketFeed`] adapter: deterministic delivery of a
//! timestamp-ordered script on a spawned task, filtered by the symbols each
//! subscriber asked for. Scripts come from memory or JSON fixture files.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_trait::{
    BarCallback, FeedStatus, MarketFeed, QuoteCallback, TradeCallback,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stream_core::{Bar, Quote, Timeframe, Trade};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One scripted market event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    Trade(Trade),
    Quote(Quote),
    Bar(Bar),
}

impl FeedEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            FeedEvent::Trade(t) => t.timestamp,
            FeedEvent::Quote(q) => q.timestamp,
            FeedEvent::Bar(b) => b.start_time,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            FeedEvent::Trade(t) => &t.symbol,
            FeedEvent::Quote(q) => &q.symbol,
            FeedEvent::Bar(b) => &b.symbol,
        }
    }
}

/// Load a JSON array of feed events from disk.
pub fn load_events_from_json(path: impl AsRef<Path>) -> Result<Vec<FeedEvent>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading replay script {}", path.display()))?;
    let events: Vec<FeedEvent> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing replay script {}", path.display()))?;
    Ok(events)
}

struct TradeSub {
    symbols: HashSet<String>,
    callback: TradeCallback,
}

struct QuoteSub {
    symbols: HashSet<String>,
    callback: QuoteCallback,
}

struct BarSub {
    symbols: HashSet<String>,
    timeframes: HashSet<Timeframe>,
    callback: BarCallback,
}

#[derive(Default)]
struct Subscribers {
    trades: Vec<TradeSub>,
    quotes: Vec<QuoteSub>,
    bars: Vec<BarSub>,
}

impl Subscribers {
    fn deliver(&self, event: &FeedEvent) {
        match event {
            FeedEvent::Trade(trade) => {
                for sub in &self.trades {
                    if sub.symbols.contains(&trade.symbol) {
                        (sub.callback)(trade.clone());
                    }
                }
            }
            FeedEvent::Quote(quote) => {
                for sub in &self.quotes {
                    if sub.symbols.contains(&quote.symbol) {
                        (sub.callback)(quote.clone());
                    }
                }
            }
            FeedEvent::Bar(bar) => {
                for sub in &self.bars {
                    if sub.symbols.contains(&bar.symbol)
                        && sub.timeframes.contains(&bar.timeframe)
                    {
                        (sub.callback)(bar.clone());
                    }
                }
            }
        }
    }
}

const STATUS_IDLE: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_STOPPED: u8 = 2;

/// Replays a fixed script of events in timestamp order.
pub struct ReplayFeed {
    events: Arc<Vec<FeedEvent>>,
    subscribers: Arc<Mutex<Subscribers>>,
    pacing: Option<Duration>,
    status: Arc<AtomicU8>,
    shutdown: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayFeed {
    pub fn new(mut events: Vec<FeedEvent>) -> Self {
        // Deterministic delivery order regardless of script order.
        events.sort_by_key(|e| e.timestamp());
        Self {
            events: Arc::new(events),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            pacing: None,
            status: Arc::new(AtomicU8::new(STATUS_IDLE)),
            shutdown: Arc::new(Notify::new()),
            task: Mutex::new(None),
        }
    }

    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_events_from_json(path)?))
    }

    /// Insert a fixed delay between events instead of replaying flat out.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }

    /// Wait for the replay task to drain the script.
    pub async fn await_completion(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[async_trait]
impl MarketFeed for ReplayFeed {
    async fn subscribe_trades(&self, symbols: &[String], callback: TradeCallback) -> Result<()> {
        let mut subs = self.subscribers.lock().await;
        subs.trades.push(TradeSub {
            symbols: symbols.iter().map(|s| s.to_uppercase()).collect(),
            callback,
        });
        debug!(count = symbols.len(), "replay trade subscription added");
        Ok(())
    }

    async fn subscribe_quotes(&self, symbols: &[String], callback: QuoteCallback) -> Result<()> {
        let mut subs = self.subscribers.lock().await;
        subs.quotes.push(QuoteSub {
            symbols: symbols.iter().map(|s| s.to_uppercase()).collect(),
            callback,
        });
        Ok(())
    }

    async fn subscribe_bars(
        &self,
        symbols: &[String],
        timeframes: &[Timeframe],
        callback: BarCallback,
    ) -> Result<()> {
        let mut subs = self.subscribers.lock().await;
        subs.bars.push(BarSub {
            symbols: symbols.iter().map(|s| s.to_uppercase()).collect(),
            timeframes: timeframes.iter().copied().collect(),
            callback,
        });
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        if self
            .status
            .compare_exchange(
                STATUS_IDLE,
                STATUS_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Ok(());
        }

        let events = self.events.clone();
        let subscribers = self.subscribers.clone();
        let status = self.status.clone();
        let shutdown = self.shutdown.clone();
        let pacing = self.pacing;

        let handle = tokio::spawn(async move {
            info!(total = events.len(), "replay feed started");
            for event in events.iter() {
                if status.load(Ordering::SeqCst) != STATUS_RUNNING {
                    break;
                }
                if let Some(delay) = pacing {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.notified() => break,
                    }
                }
                let subs = subscribers.lock().await;
                subs.deliver(event);
            }
            status.store(STATUS_STOPPED, Ordering::SeqCst);
            info!("replay feed drained");
        });
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.status.store(STATUS_STOPPED, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        self.await_completion().await;
        Ok(())
    }

    fn status(&self) -> FeedStatus {
        match self.status.load(Ordering::SeqCst) {
            STATUS_RUNNING => FeedStatus::Running,
            STATUS_STOPPED => FeedStatus::Stopped,
            _ => FeedStatus::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;

    fn trade_event(symbol: &str, secs: i64, price: f64) -> FeedEvent {
        FeedEvent::Trade(Trade {
            symbol: symbol.to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            price,
            size: 1.0,
        })
    }

    #[tokio::test]
    async fn test_replay_delivers_subscribed_symbols_in_order() {
        let feed = ReplayFeed::new(vec![
            trade_event("AAPL", 2, 12.0),
            trade_event("AAPL", 0, 10.0),
            trade_event("MSFT", 1, 300.0),
        ]);
        let received: Arc<StdMutex<Vec<f64>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = received.clone();
        feed.subscribe_trades(
            &["AAPL".to_string()],
            Arc::new(move |t: Trade| {
                sink.lock().unwrap().push(t.price);
            }),
        )
        .await
        .unwrap();

        feed.start().await.unwrap();
        feed.await_completion().await;

        // Sorted by timestamp, MSFT filtered out
        assert_eq!(*received.lock().unwrap(), vec![10.0, 12.0]);
        assert_eq!(feed.status(), FeedStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stop_halts_delivery() {
        let events: Vec<FeedEvent> =
            (0..10_000).map(|i| trade_event("AAPL", i, 10.0)).collect();
        let feed = ReplayFeed::new(events).with_pacing(Duration::from_millis(5));
        let received: Arc<StdMutex<usize>> = Arc::new(StdMutex::new(0));
        let sink = received.clone();
        feed.subscribe_trades(
            &["AAPL".to_string()],
            Arc::new(move |_t: Trade| {
                *sink.lock().unwrap() += 1;
            }),
        )
        .await
        .unwrap();

        feed.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        feed.stop().await.unwrap();

        let count = *received.lock().unwrap();
        assert!(count < 10_000);
        assert_eq!(feed.status(), FeedStatus::Stopped);
    }

    #[test]
    fn test_event_json_round_trip() {
        let events = vec![trade_event("AAPL", 0, 10.0)];
        let json = serde_json::to_string(&events).unwrap();
        let parsed: Vec<FeedEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].symbol(), "AAPL");
    }
}
