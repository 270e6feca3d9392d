//! MetricsPipeline
//!
//! One externally triggered tick walks
//! `ReadSnapshot -> Compute -> RecordLatency -> Append`:
//!   • read the last published book (never waits on the network)
//!   • derive slippage, impact, fees and the maker/taker prediction
//!   • record how long that took
//!   • append a single record to the bounded history
//!
//! A tick with no two-sided book short-circuits to `AwaitingData` and leaves
//! the history untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use common::latency::{DEFAULT_LATENCY_CAPACITY, LatencyTracker};
use common::logger::{child_span, warn_if_slow};
use common::time::now_ms;
use costs::{
    FeeTierTable, ImpactParams, MakerTakerClassifier, SlippageParams, estimate_market_impact,
    estimate_slippage, predict_maker_taker,
};
use market::{OrderBookSnapshot, SnapshotSource};

use crate::buffer::{DEFAULT_HISTORY_CAPACITY, MetricsBuffer, MetricsHistory};
use crate::types::{MetricsRecord, QuoteView, TickOutcome, TickParams, TickReport};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub history_capacity: usize,
    pub latency_capacity: usize,
    /// Books older than this are still used but flagged stale.
    pub stale_after: Duration,
    /// Ticks slower than this are logged.
    pub tick_budget: Duration,
    pub slippage: SlippageParams,
    pub impact: ImpactParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            latency_capacity: DEFAULT_LATENCY_CAPACITY,
            stale_after: Duration::from_secs(5),
            tick_budget: Duration::from_millis(50),
            slippage: SlippageParams::default(),
            impact: ImpactParams::default(),
        }
    }
}

pub struct MetricsPipeline {
    source: Arc<dyn SnapshotSource>,
    classifier: Option<Arc<MakerTakerClassifier>>,
    fee_tiers: FeeTierTable,
    config: PipelineConfig,

    buffer: Mutex<MetricsBuffer>,
    latency: Mutex<LatencyTracker>,
}

impl MetricsPipeline {
    /// `classifier = None` keeps the pipeline running without role predictions.
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        classifier: Option<Arc<MakerTakerClassifier>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            classifier,
            fee_tiers: FeeTierTable::standard(),
            buffer: Mutex::new(MetricsBuffer::new(config.history_capacity)),
            latency: Mutex::new(LatencyTracker::new(config.latency_capacity)),
            config,
        }
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Run one tick against whatever book is published right now.
    pub fn tick(&self, params: &TickParams) -> TickOutcome {
        warn_if_slow("metrics_tick", self.config.tick_budget, || {
            self.run_tick(params)
        })
    }

    fn run_tick(&self, params: &TickParams) -> TickOutcome {
        let span = child_span("metrics_tick");
        let _guard = span.enter();
        let start = Instant::now();

        // ReadSnapshot
        let book = self.source.snapshot();
        span.record("inst_id", book.inst_id.as_str());
        let Some(quote) = self.quote(&book) else {
            debug!("order book not yet two-sided; awaiting data");
            return TickOutcome::AwaitingData;
        };

        let stale = quote.data_age_ms > self.config.stale_after.as_millis() as u64;
        if stale {
            warn!(
                age_ms = quote.data_age_ms,
                ts_exchange = %book.ts_exchange,
                "order book data is stale"
            );
        }

        // Compute
        let slippage_usd = estimate_slippage(
            params.quantity_usd,
            quote.avg_ask,
            quote.avg_bid,
            &self.config.slippage,
        );
        let impact_usd =
            estimate_market_impact(params.quantity_usd, params.volatility, &self.config.impact);
        let fee_usd = self.fee_tiers.fee(
            params.quantity_usd,
            &params.fee_tier,
            params.is_maker,
            params.is_vip(),
        );
        let prediction = predict_maker_taker(
            self.classifier.as_deref(),
            params.quantity_usd,
            params.volatility,
            quote.spread,
        );
        if let Err(e) = &prediction {
            debug!(error = %e, "maker/taker prediction unavailable");
        }

        // RecordLatency
        let latency = self.latency.lock().record(start);

        // Append
        let record = MetricsRecord {
            timestamp: book.ts_exchange.clone(),
            ts_ms: now_ms(),
            slippage_usd,
            impact_usd,
            fee_usd,
            net_cost_usd: slippage_usd + impact_usd + fee_usd,
            latency_secs: latency.as_secs_f64(),
            role: prediction.as_ref().ok().map(|p| p.role),
        };
        self.buffer.lock().add(record.clone());

        debug!(
            net_cost_usd = record.net_cost_usd,
            latency_us = latency.as_micros() as u64,
            "tick recorded"
        );

        TickOutcome::Recorded(Box::new(TickReport {
            record,
            quote,
            stale,
            prediction,
        }))
    }

    fn quote(&self, book: &OrderBookSnapshot) -> Option<QuoteView> {
        let avg_ask = book.avg_ask()?;
        let avg_bid = book.avg_bid()?;

        Some(QuoteView {
            avg_ask,
            avg_bid,
            spread: (avg_ask - avg_bid).abs(),
            data_age_ms: book.age_ms(now_ms()),
        })
    }

    /// Current book, straight from the source.
    pub fn snapshot(&self) -> Arc<OrderBookSnapshot> {
        self.source.snapshot()
    }

    /// Retained records, oldest first.
    pub fn history(&self) -> Vec<MetricsRecord> {
        self.buffer.lock().records()
    }

    pub fn metrics_history(&self) -> MetricsHistory {
        self.buffer.lock().snapshot()
    }

    /// Duration of the most recent recorded tick; zero before the first.
    pub fn latest_latency(&self) -> Duration {
        self.latency.lock().latest()
    }

    pub fn mean_latency(&self) -> Option<Duration> {
        self.latency.lock().mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use costs::{CostError, LogisticModel, OrderRole, StandardScaler};
    use market::{PriceLevel, StaticSnapshot};
    use tracing_test::traced_test;

    fn book(ts: &str, ask: f64, bid: f64, local_ms: u64) -> OrderBookSnapshot {
        OrderBookSnapshot {
            inst_id: "BTC-USDT".into(),
            ts_exchange: ts.into(),
            ts_local_ms: local_ms,
            asks: vec![PriceLevel::new(ask, 1.0)],
            bids: vec![PriceLevel::new(bid, 1.0)],
        }
    }

    fn params() -> TickParams {
        TickParams {
            quantity_usd: 100.0,
            volatility: 0.05,
            fee_tier: "Tier 1".into(),
            is_maker: false,
        }
    }

    fn maker_classifier() -> Arc<MakerTakerClassifier> {
        let c = MakerTakerClassifier::new(
            StandardScaler {
                mean: vec![0.0; 3],
                scale: vec![1.0; 3],
            },
            LogisticModel {
                coefficients: vec![0.0, 0.0, 1.0],
                intercept: 0.0,
            },
        )
        .unwrap();
        Arc::new(c)
    }

    #[test]
    fn empty_book_awaits_data() {
        let p = MetricsPipeline::new(
            Arc::new(StaticSnapshot::default()),
            None,
            PipelineConfig::default(),
        );

        assert!(p.tick(&params()).is_awaiting_data());
        assert!(p.history().is_empty());
        assert_eq!(p.latest_latency(), Duration::ZERO);
    }

    #[test]
    fn one_sided_book_awaits_data() {
        let mut b = book("1", 101.0, 99.0, now_ms());
        b.bids.clear();
        let p = MetricsPipeline::new(
            Arc::new(StaticSnapshot::new(b)),
            None,
            PipelineConfig::default(),
        );

        assert!(p.tick(&params()).is_awaiting_data());
        assert!(p.history().is_empty());
    }

    #[test]
    fn tick_computes_costs_from_book() {
        let src = Arc::new(StaticSnapshot::new(book("1700", 101.0, 99.0, now_ms())));
        let p = MetricsPipeline::new(src, Some(maker_classifier()), PipelineConfig::default());

        let TickOutcome::Recorded(report) = p.tick(&params()) else {
            panic!("expected a record");
        };
        let r = &report.record;

        // spread 2, 100 USD -> 0.0005 * 1 * 2 * 0.1
        assert!((r.slippage_usd - 0.0001).abs() < 1e-12);
        // 0.01 * (100 / 1e6)^2 * 0.05 * 100
        assert!((r.impact_usd - 5e-10).abs() < 1e-20);
        // Tier 1 taker
        assert!((r.fee_usd - 0.1).abs() < 1e-12);
        assert!((r.net_cost_usd - (r.slippage_usd + r.impact_usd + r.fee_usd)).abs() < 1e-15);
        assert_eq!(r.timestamp, "1700");
        assert_eq!(r.role, Some(OrderRole::Maker));
        assert_eq!(report.quote.spread, 2.0);
        assert!(!report.stale);

        assert_eq!(p.history(), vec![r.clone()]);
        assert_eq!(p.latest_latency().as_secs_f64(), r.latency_secs);
    }

    #[test]
    fn vip_tier_gets_discount() {
        let src = Arc::new(StaticSnapshot::new(book("1", 101.0, 99.0, now_ms())));
        let p = MetricsPipeline::new(src, None, PipelineConfig::default());
        let vip = TickParams {
            quantity_usd: 1000.0,
            fee_tier: "VIP 1".into(),
            is_maker: true,
            ..params()
        };

        let TickOutcome::Recorded(report) = p.tick(&vip) else {
            panic!("expected a record");
        };
        assert!((report.record.fee_usd - 0.36).abs() < 1e-12);
    }

    #[test]
    fn missing_classifier_is_surfaced_not_defaulted() {
        let src = Arc::new(StaticSnapshot::new(book("1", 101.0, 99.0, now_ms())));
        let p = MetricsPipeline::new(src, None, PipelineConfig::default());

        let TickOutcome::Recorded(report) = p.tick(&params()) else {
            panic!("expected a record");
        };

        assert_eq!(report.prediction, Err(CostError::ModelNotLoaded));
        assert_eq!(report.record.role, None);
        assert!(!p.has_classifier());
    }

    #[test]
    fn history_is_bounded() {
        let src = Arc::new(StaticSnapshot::new(book("0", 101.0, 99.0, now_ms())));
        let config = PipelineConfig {
            history_capacity: 3,
            ..PipelineConfig::default()
        };
        let p = MetricsPipeline::new(src.clone(), None, config);

        for i in 1..=5 {
            src.replace(book(&i.to_string(), 101.0, 99.0, now_ms()));
            p.tick(&params());
        }

        let ts: Vec<String> = p.history().into_iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec!["3", "4", "5"]);
        assert_eq!(p.metrics_history().latency_ms.len(), 3);
    }

    #[traced_test]
    #[test]
    fn old_book_is_flagged_stale() {
        let old = now_ms().saturating_sub(60_000);
        let src = Arc::new(StaticSnapshot::new(book("1", 101.0, 99.0, old)));
        let p = MetricsPipeline::new(src, None, PipelineConfig::default());

        let TickOutcome::Recorded(report) = p.tick(&params()) else {
            panic!("expected a record");
        };

        assert!(report.stale);
        assert!(report.quote.data_age_ms >= 60_000);
        assert!(logs_contain("order book data is stale"));
    }
}
