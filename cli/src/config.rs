use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use common::latency::DEFAULT_LATENCY_CAPACITY;
use costs::ModelArtifacts;
use costs::maker_taker::{MODEL_FILE, SCALER_FILE};
use market::okx::OKX_PUBLIC_WS_URL;
use pipeline::DEFAULT_HISTORY_CAPACITY;

pub const HISTORY_CAPACITY_RANGE: RangeInclusive<usize> = 1..=100_000;
pub const LATENCY_CAPACITY_RANGE: RangeInclusive<usize> = 1..=1_000_000;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// OKX public WebSocket endpoint.
    pub ws_url: String,

    // =========================
    // Classifier artifacts
    // =========================
    /// Serialized logistic-regression model. A missing file disables
    /// maker/taker predictions; a corrupt one aborts startup.
    pub model_path: PathBuf,
    /// Serialized feature scaler paired with `model_path`.
    pub scaler_path: PathBuf,

    // =========================
    // Pipeline
    // =========================
    /// Records retained in the rolling metrics history.
    pub history_capacity: usize,
    /// Latency samples retained per tracker.
    pub latency_capacity: usize,
    /// Book age after which a tick is flagged stale.
    pub stale_after_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; unset or unparsable values fall back
    /// to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let ws_url = get("OKX_WS_URL").unwrap_or_else(|| OKX_PUBLIC_WS_URL.to_string());
        let model_path = get("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(MODEL_FILE));
        let scaler_path = get("SCALER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(SCALER_FILE));

        Self {
            ws_url,
            model_path,
            scaler_path,

            history_capacity: bounded(
                &get,
                "HISTORY_CAPACITY",
                HISTORY_CAPACITY_RANGE,
                DEFAULT_HISTORY_CAPACITY,
            ),
            latency_capacity: bounded(
                &get,
                "LATENCY_CAPACITY",
                LATENCY_CAPACITY_RANGE,
                DEFAULT_LATENCY_CAPACITY,
            ),
            stale_after_ms: parsed(&get, "STALE_AFTER_MS", 5_000),
        }
    }

    pub fn artifacts(&self) -> ModelArtifacts {
        ModelArtifacts {
            model_path: self.model_path.clone(),
            scaler_path: self.scaler_path.clone(),
        }
    }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match get(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparsable config value; using default");
            default
        }),
        None => default,
    }
}

fn bounded(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    range: RangeInclusive<usize>,
    default: usize,
) -> usize {
    let v = parsed(get, key, default);
    if range.contains(&v) {
        return v;
    }
    tracing::warn!(
        key,
        value = v,
        min = *range.start(),
        max = *range.end(),
        "config value out of range; using default"
    );
    default
}
