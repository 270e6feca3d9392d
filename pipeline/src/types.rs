use serde::Serialize;

use costs::{CostError, OrderRole, Prediction, is_vip_tier};

/// Externally supplied inputs for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickParams {
    pub quantity_usd: f64,
    pub volatility: f64,
    /// Internal tier name, e.g. `"Tier 1"` or `"VIP 2"`.
    pub fee_tier: String,
    /// Role assumed for the fee calculation.
    pub is_maker: bool,
}

impl TickParams {
    pub fn is_vip(&self) -> bool {
        is_vip_tier(&self.fee_tier)
    }
}

/// One row of the metrics history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    /// Venue timestamp of the book the metrics were derived from.
    pub timestamp: String,
    /// Local wall-clock time of the tick, epoch milliseconds.
    pub ts_ms: u64,
    pub slippage_usd: f64,
    pub impact_usd: f64,
    pub fee_usd: f64,
    pub net_cost_usd: f64,
    pub latency_secs: f64,
    /// `None` when no classifier is available.
    pub role: Option<OrderRole>,
}

impl MetricsRecord {
    pub fn latency_ms(&self) -> f64 {
        self.latency_secs * 1_000.0
    }
}

/// Book-derived prices a tick was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuoteView {
    pub avg_ask: f64,
    pub avg_bid: f64,
    pub spread: f64,
    pub data_age_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub record: MetricsRecord,
    pub quote: QuoteView,
    /// Book older than the configured freshness window.
    pub stale: bool,
    pub prediction: Result<Prediction, CostError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No two-sided book yet; nothing computed, nothing stored.
    AwaitingData,
    Recorded(Box<TickReport>),
}

impl TickOutcome {
    pub fn is_awaiting_data(&self) -> bool {
        matches!(self, TickOutcome::AwaitingData)
    }
}
