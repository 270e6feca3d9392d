//! MarketDataClient
//!
//! Owns the single live order book for one instrument.
//! Responsibilities:
//!   • Spawn the feed worker (transport + reconnect) on its own task
//!   • Decode every frame and replace the shared snapshot on book updates
//!   • Drop malformed frames without touching the published book
//!   • Hand out cheap, immutable snapshot copies to any number of readers
//!
//! The snapshot lives behind one `parking_lot::Mutex`. Writers build the new
//! book before taking the lock and readers clone an `Arc` out of it, so the
//! critical section is a pointer swap in both directions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{
    mpsc::{self, Receiver},
    watch,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use common::latency::{DEFAULT_LATENCY_CAPACITY, LatencyTracker};
use common::time::now_ms;

use crate::okx::{OrderBookFeed, parser::parse_okx_event};
use crate::types::{FrameOutcome, OkxEvent, OrderBookSnapshot};

/// Read side of the client, used by the metrics pipeline.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> Arc<OrderBookSnapshot>;
}

pub struct MarketDataClient<F> {
    inst_id: String,
    feed: Arc<F>,
    frame_buffer: usize,

    /// Latest published book. Replaced, never mutated.
    book: Mutex<Arc<OrderBookSnapshot>>,

    /// Parse-and-publish time per book frame.
    ingest_latency: Mutex<LatencyTracker>,

    shutdown_tx: watch::Sender<bool>,
}

impl<F: OrderBookFeed> MarketDataClient<F> {
    /// Create a client wrapped in `Arc<Self>` so background tasks can share it.
    pub fn new(feed: Arc<F>, inst_id: impl Into<String>, frame_buffer: usize) -> Arc<Self> {
        let inst_id = inst_id.into();
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            book: Mutex::new(Arc::new(OrderBookSnapshot::empty(inst_id.clone()))),
            inst_id,
            feed,
            frame_buffer: frame_buffer.max(1),
            ingest_latency: Mutex::new(LatencyTracker::new(DEFAULT_LATENCY_CAPACITY)),
            shutdown_tx,
        })
    }

    /// Start the feed worker and the frame processor in the background.
    ///
    /// Returns immediately. The handle resolves once [`shutdown`](Self::shutdown)
    /// has been requested and both tasks have wound down.
    pub fn connect(self: &Arc<Self>) -> JoinHandle<()> {
        let (tx, rx) = mpsc::channel(self.frame_buffer);

        let feed = Arc::clone(&self.feed);
        let inst_id = self.inst_id.clone();
        let shutdown = self.shutdown_tx.subscribe();

        let feed_task = tokio::spawn(async move {
            if let Err(e) = feed.stream_books(inst_id.clone(), tx, shutdown).await {
                error!(error = ?e, inst_id = %inst_id, "order book feed terminated with error");
            }
        });

        let client = Arc::clone(self);
        tokio::spawn(async move {
            info!(inst_id = %client.inst_id, "order book processor running");
            client.process_frames(rx).await;

            if let Err(e) = feed_task.await {
                error!(error = ?e, "order book feed task panicked");
            }
            info!(inst_id = %client.inst_id, "order book stream stopped");
        })
    }

    /// Ask the feed worker to close its connection and stop retrying.
    pub fn shutdown(&self) {
        // send_replace never fails, even with no live receiver
        self.shutdown_tx.send_replace(true);
    }

    /// Drain frames until the feed drops its sender.
    pub async fn process_frames(&self, mut frames: Receiver<String>) {
        while let Some(raw) = frames.recv().await {
            self.on_message(&raw);
        }
    }

    /// Decode one raw frame and apply it.
    ///
    /// Book updates replace the snapshot wholesale. Everything that fails to
    /// parse is logged and dropped; the previously published book stays.
    pub fn on_message(&self, raw: &str) -> FrameOutcome {
        let start = Instant::now();

        let event = match parse_okx_event(raw) {
            Ok(ev) => ev,
            Err(e) => {
                warn!(error = %e, raw = %raw, "failed to parse incoming WebSocket frame; dropped");
                return FrameOutcome::Dropped;
            }
        };

        match event {
            OkxEvent::BookUpdate(update) => {
                let inst_id = update.inst_id.unwrap_or_else(|| self.inst_id.clone());
                if inst_id != self.inst_id {
                    warn!(
                        expected = %self.inst_id,
                        got = %inst_id,
                        "book frame for unexpected instrument; dropped"
                    );
                    return FrameOutcome::Dropped;
                }

                if update.action.as_deref() == Some("update") {
                    debug!("incremental book frame applied as full replacement");
                }

                let snapshot = OrderBookSnapshot {
                    inst_id,
                    ts_exchange: update.ts,
                    ts_local_ms: now_ms(),
                    asks: update.asks,
                    bids: update.bids,
                };
                self.publish(snapshot);

                let sample = self.ingest_latency.lock().record(start);
                debug!(latency_us = sample.as_micros() as u64, "book snapshot replaced");
                FrameOutcome::BookReplaced
            }
            OkxEvent::Subscribed { channel, inst_id } => {
                info!(channel = %channel, inst_id = ?inst_id, "subscription acknowledged");
                FrameOutcome::Acknowledged
            }
            OkxEvent::Error { code, msg } => {
                warn!(code = %code, msg = %msg, "exchange reported an error");
                FrameOutcome::Ignored
            }
            OkxEvent::Pong => FrameOutcome::Ignored,
            OkxEvent::Unknown(v) => {
                debug!(event = %v, "ignoring unrecognised frame");
                FrameOutcome::Ignored
            }
        }
    }

    fn publish(&self, snapshot: OrderBookSnapshot) {
        let next = Arc::new(snapshot);
        *self.book.lock() = next;
    }

    /// Current book. Empty (but valid) until the first book frame arrives.
    pub fn snapshot(&self) -> Arc<OrderBookSnapshot> {
        Arc::clone(&self.book.lock())
    }

    /// Most recent parse-and-publish duration, zero before the first book.
    pub fn ingest_latency(&self) -> Duration {
        self.ingest_latency.lock().latest()
    }
}

impl<F: OrderBookFeed> SnapshotSource for MarketDataClient<F> {
    fn snapshot(&self) -> Arc<OrderBookSnapshot> {
        MarketDataClient::snapshot(self)
    }
}

/// Fixed snapshot holder for callers that already have a book in hand.
#[derive(Debug, Default)]
pub struct StaticSnapshot(Mutex<Arc<OrderBookSnapshot>>);

impl StaticSnapshot {
    pub fn new(snapshot: OrderBookSnapshot) -> Self {
        Self(Mutex::new(Arc::new(snapshot)))
    }

    pub fn replace(&self, snapshot: OrderBookSnapshot) {
        *self.0.lock() = Arc::new(snapshot);
    }
}

impl SnapshotSource for StaticSnapshot {
    fn snapshot(&self) -> Arc<OrderBookSnapshot> {
        Arc::clone(&self.0.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc::Sender;

    struct IdleFeed;

    #[async_trait]
    impl OrderBookFeed for IdleFeed {
        async fn stream_books(
            &self,
            _inst_id: String,
            _sender: Sender<String>,
            mut shutdown: watch::Receiver<bool>,
        ) -> anyhow::Result<()> {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    fn client() -> Arc<MarketDataClient<IdleFeed>> {
        MarketDataClient::new(Arc::new(IdleFeed), "BTC-USDT", 8)
    }

    fn books(inst: &str, ts: &str, ask: &str, bid: &str) -> String {
        json!({
            "arg": { "channel": "books", "instId": inst },
            "action": "snapshot",
            "data": [{ "asks": [[ask, "1.0", "0", "1"]], "bids": [[bid, "2.0", "0", "1"]], "ts": ts }]
        })
        .to_string()
    }

    #[test]
    fn snapshot_is_empty_before_data() {
        let c = client();
        let s = c.snapshot();

        assert!(s.is_empty());
        assert_eq!(s.inst_id, "BTC-USDT");
        assert_eq!(c.ingest_latency(), Duration::ZERO);
    }

    #[test]
    fn book_frame_replaces_snapshot() {
        let c = client();

        assert_eq!(
            c.on_message(&books("BTC-USDT", "1", "101.5", "100.5")),
            FrameOutcome::BookReplaced
        );
        assert_eq!(
            c.on_message(&books("BTC-USDT", "2", "102.5", "101.5")),
            FrameOutcome::BookReplaced
        );

        let s = c.snapshot();
        assert_eq!(s.ts_exchange, "2");
        assert_eq!(s.asks.len(), 1);
        assert_eq!(s.asks[0].price, 102.5);
        assert_eq!(s.bids[0].price, 101.5);
        assert!(s.ts_local_ms > 0);
    }

    #[test]
    fn ack_is_acknowledged_and_keeps_book() {
        let c = client();
        let ack = r#"{"event":"subscribe","arg":{"channel":"books","instId":"BTC-USDT"}}"#;

        assert_eq!(c.on_message(ack), FrameOutcome::Acknowledged);
        assert!(c.snapshot().is_empty());
    }

    #[test]
    fn malformed_frame_leaves_previous_book() {
        let c = client();
        c.on_message(&books("BTC-USDT", "1", "101.0", "100.0"));

        assert_eq!(c.on_message("{ garbage"), FrameOutcome::Dropped);
        assert_eq!(
            c.on_message(&books("BTC-USDT", "2", "oops", "100.0")),
            FrameOutcome::Dropped
        );

        let s = c.snapshot();
        assert_eq!(s.ts_exchange, "1");
        assert_eq!(s.asks[0].price, 101.0);
    }

    #[test]
    fn foreign_instrument_is_dropped() {
        let c = client();

        assert_eq!(
            c.on_message(&books("ETH-USDT", "1", "2.0", "1.0")),
            FrameOutcome::Dropped
        );
        assert!(c.snapshot().is_empty());
    }

    #[test]
    fn readers_keep_their_copy_after_replacement() {
        let c = client();
        c.on_message(&books("BTC-USDT", "1", "101.0", "100.0"));
        let held = c.snapshot();

        c.on_message(&books("BTC-USDT", "2", "105.0", "104.0"));

        assert_eq!(held.ts_exchange, "1");
        assert_eq!(c.snapshot().ts_exchange, "2");
    }

    #[test]
    fn book_frames_record_ingest_latency_and_drops_do_not() {
        let c = client();

        c.on_message(&books("BTC-USDT", "1", "101.0", "100.0"));
        let after_book = c.ingest_latency();
        assert!(after_book > Duration::ZERO);
        assert_eq!(c.ingest_latency.lock().len(), 1);

        assert_eq!(c.on_message("{ garbage"), FrameOutcome::Dropped);
        assert_eq!(
            c.on_message(&books("ETH-USDT", "2", "2.0", "1.0")),
            FrameOutcome::Dropped
        );

        assert_eq!(c.ingest_latency(), after_book);
        assert_eq!(c.ingest_latency.lock().len(), 1);
    }

    #[test]
    fn static_snapshot_serves_replacements() {
        let src = StaticSnapshot::default();
        assert!(src.snapshot().is_empty());

        src.replace(OrderBookSnapshot::empty("SOL-USDT"));
        assert_eq!(src.snapshot().inst_id, "SOL-USDT");
    }
}
