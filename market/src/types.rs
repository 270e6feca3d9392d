use serde::Serialize;

/// One `(price, size)` level of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

impl PriceLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }
}

/// Full-depth order book as last published by the feed.
///
/// Replaced wholesale on every book frame and never mutated afterwards.
/// `asks` and `bids` keep the venue's ordering and are empty until the first
/// book frame arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderBookSnapshot {
    pub inst_id: String,
    /// Venue timestamp, epoch milliseconds as sent (string).
    pub ts_exchange: String,
    /// Local wall-clock capture time, epoch milliseconds.
    pub ts_local_ms: u64,
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// Placeholder published before any data has arrived.
    pub fn empty(inst_id: impl Into<String>) -> Self {
        Self {
            inst_id: inst_id.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }

    /// Both sides carry at least one level.
    pub fn is_two_sided(&self) -> bool {
        !self.asks.is_empty() && !self.bids.is_empty()
    }

    /// Mean price over all ask levels.
    pub fn avg_ask(&self) -> Option<f64> {
        mean_price(&self.asks)
    }

    /// Mean price over all bid levels.
    pub fn avg_bid(&self) -> Option<f64> {
        mean_price(&self.bids)
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    /// Milliseconds since the snapshot was captured locally.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.ts_local_ms)
    }
}

fn mean_price(levels: &[PriceLevel]) -> Option<f64> {
    if levels.is_empty() {
        return None;
    }
    let sum: f64 = levels.iter().map(|l| l.price).sum();
    Some(sum / levels.len() as f64)
}

/// Decoded `books` channel payload (`data[0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct BookUpdate {
    pub inst_id: Option<String>,
    /// `snapshot` or `update` as labelled by the venue.
    pub action: Option<String>,
    pub ts: String,
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
}

/// Typed view of every frame the OKX public socket can send us.
#[derive(Debug, Clone)]
pub enum OkxEvent {
    Subscribed {
        channel: String,
        inst_id: Option<String>,
    },
    Error {
        code: String,
        msg: String,
    },
    BookUpdate(Box<BookUpdate>),
    /// Reply to a text-level `ping`.
    Pong,
    Unknown(serde_json::Value),
}

/// What `MarketDataClient::on_message` did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    BookReplaced,
    Acknowledged,
    Ignored,
    Dropped,
}
