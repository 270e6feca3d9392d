pub mod cli;
pub mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info, warn};

use common::logger::init_logger;
use costs::{CostError, MakerTakerClassifier};
use market::{MarketDataClient, OkxConfig, OkxWsClient};
use pipeline::{MetricsPipeline, PipelineConfig, TickOutcome, TickParams, export_csv};

use cli::Cli;
use config::AppConfig;

/// Load the classifier once. A missing artifact only disables predictions;
/// anything else is a startup error.
fn load_classifier(cfg: &AppConfig) -> anyhow::Result<Option<Arc<MakerTakerClassifier>>> {
    match MakerTakerClassifier::load_once(&cfg.artifacts()) {
        Ok(classifier) => Ok(Some(classifier)),
        Err(CostError::ArtifactMissing { path }) => {
            warn!(
                path = %path.display(),
                "classifier artifact missing; maker/taker predictions disabled"
            );
            Ok(None)
        }
        Err(e) => Err(e).context("failed to load maker/taker classifier"),
    }
}

fn report(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::AwaitingData => info!("awaiting order book data"),
        TickOutcome::Recorded(r) => {
            let role = r
                .record
                .role
                .map(|role| role.to_string())
                .unwrap_or_else(|| "Unavailable".to_string());

            info!(
                ts = %r.record.timestamp,
                avg_ask = r.quote.avg_ask,
                avg_bid = r.quote.avg_bid,
                spread = r.quote.spread,
                slippage_usd = r.record.slippage_usd,
                impact_usd = r.record.impact_usd,
                fee_usd = r.record.fee_usd,
                net_cost_usd = r.record.net_cost_usd,
                latency_ms = r.record.latency_ms(),
                role = %role,
                stale = r.stale,
                "tick"
            );
            if let Ok(p) = &r.prediction {
                debug!(
                    p_taker = p.probabilities[0],
                    p_maker = p.probabilities[1],
                    "maker/taker probabilities"
                );
            }
        }
    }
}

/// Tick on a fixed cadence until ctrl-c.
async fn run_ticks(
    pipeline: &MetricsPipeline,
    params: &TickParams,
    every: Duration,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for shutdown signal")?;
                info!("Shutdown signal received");
                return Ok(());
            }
            _ = ticker.tick() => report(&pipeline.tick(params)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_logger("tradesim", is_production);

    let cfg = AppConfig::from_env();
    info!(inst_id = %cli.inst, ws_url = %cfg.ws_url, "Starting tradesim...");

    let classifier = load_classifier(&cfg)?;

    let okx = OkxConfig {
        ws_url: cfg.ws_url.clone(),
        ..OkxConfig::default()
    }
    .with_inst_id(cli.inst.clone());
    let frame_buffer = okx.frame_buffer;
    let feed = Arc::new(OkxWsClient::new(okx));

    let client = MarketDataClient::new(feed, cli.inst.clone(), frame_buffer);
    let stream = client.connect();

    let pipeline = MetricsPipeline::new(
        client.clone(),
        classifier,
        PipelineConfig {
            history_capacity: cfg.history_capacity,
            latency_capacity: cfg.latency_capacity,
            stale_after: Duration::from_millis(cfg.stale_after_ms),
            ..PipelineConfig::default()
        },
    );

    let params = cli.tick_params();
    let ticks = run_ticks(&pipeline, &params, Duration::from_millis(cli.refresh_ms)).await;

    client.shutdown();
    if let Err(e) = stream.await {
        error!(error = ?e, "order book stream task failed");
    }
    ticks?;

    if let Some(path) = &cli.export {
        let history = pipeline.history();
        export_csv(path, &history)
            .with_context(|| format!("failed to export metrics to {}", path.display()))?;
        info!(path = %path.display(), records = history.len(), "metrics history exported");
    }

    Ok(())
}
