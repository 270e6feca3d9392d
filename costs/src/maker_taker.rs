//! Maker/taker classifier.
//!
//! Inference side of an offline-trained logistic regression over the features
//! `[quantity_usd, volatility, spread]`, standardised with a fitted scaler.
//! Both pieces ship as JSON artifacts:
//!
//! ```jsonc
//! // scaler.json
//! { "mean": [5000.0, 0.5, 2.5], "scale": [2800.0, 0.29, 1.4] }
//!
//! // maker_taker_model.json (class 1 = Maker)
//! { "coefficients": [-0.8, -0.3, 0.6], "intercept": 0.05 }
//! ```
//!
//! Artifacts are loaded once into an immutable [`MakerTakerClassifier`] that
//! callers share behind an `Arc` and pass explicitly into prediction.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::info;

use crate::errors::CostError;

pub const FEATURE_COUNT: usize = 3;
pub const MODEL_FILE: &str = "maker_taker_model.json";
pub const SCALER_FILE: &str = "scaler.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderRole {
    Maker,
    Taker,
}

impl fmt::Display for OrderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderRole::Maker => write!(f, "Maker"),
            OrderRole::Taker => write!(f, "Taker"),
        }
    }
}

/// Per-feature standardisation: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, CostError> {
        if features.len() != self.mean.len() {
            return Err(CostError::FeatureMismatch {
                expected: self.mean.len(),
                got: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| {
                // constant features are fitted with scale 0; leave them centred only
                let s = if *s == 0.0 { 1.0 } else { *s };
                (x - m) / s
            })
            .collect())
    }
}

/// Binary logistic regression; class 1 is `Maker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    /// `[P(taker), P(maker)]` for an already-scaled feature vector.
    pub fn predict_proba(&self, scaled: &[f64]) -> Result<[f64; 2], CostError> {
        if scaled.len() != self.coefficients.len() {
            return Err(CostError::FeatureMismatch {
                expected: self.coefficients.len(),
                got: scaled.len(),
            });
        }

        let z: f64 = self.intercept
            + self
                .coefficients
                .iter()
                .zip(scaled)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        let p_maker = sigmoid(z);

        Ok([1.0 - p_maker, p_maker])
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Locations of the two serialized artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
}

impl ModelArtifacts {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_path: dir.join(MODEL_FILE),
            scaler_path: dir.join(SCALER_FILE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub role: OrderRole,
    /// `[P(taker), P(maker)]`
    pub probabilities: [f64; 2],
}

impl Prediction {
    pub fn p_maker(&self) -> f64 {
        self.probabilities[1]
    }
}

/// Loaded scaler + model pair. Immutable; safe to share across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct MakerTakerClassifier {
    scaler: StandardScaler,
    model: LogisticModel,
}

impl MakerTakerClassifier {
    pub fn new(scaler: StandardScaler, model: LogisticModel) -> Result<Self, CostError> {
        for got in [scaler.mean.len(), scaler.scale.len(), model.coefficients.len()] {
            if got != FEATURE_COUNT {
                return Err(CostError::FeatureMismatch {
                    expected: FEATURE_COUNT,
                    got,
                });
            }
        }
        Ok(Self { scaler, model })
    }

    /// Read both artifacts from disk.
    ///
    /// Missing files yield [`CostError::ArtifactMissing`]; unreadable or
    /// malformed ones yield [`CostError::ModelLoad`]. Callers load once at
    /// startup and keep the returned handle.
    pub fn load_once(artifacts: &ModelArtifacts) -> Result<Arc<Self>, CostError> {
        let model: LogisticModel = read_artifact(&artifacts.model_path)?;
        let scaler: StandardScaler = read_artifact(&artifacts.scaler_path)?;

        let classifier = Self::new(scaler, model).map_err(|e| CostError::ModelLoad {
            path: artifacts.model_path.clone(),
            reason: e.to_string(),
        })?;

        info!(
            model = %artifacts.model_path.display(),
            scaler = %artifacts.scaler_path.display(),
            "maker/taker classifier loaded"
        );
        Ok(Arc::new(classifier))
    }

    pub fn predict(
        &self,
        quantity_usd: f64,
        volatility: f64,
        spread: f64,
    ) -> Result<Prediction, CostError> {
        let scaled = self.scaler.transform(&[quantity_usd, volatility, spread])?;
        let probabilities = self.model.predict_proba(&scaled)?;

        let role = if probabilities[1] > 0.5 {
            OrderRole::Maker
        } else {
            OrderRole::Taker
        };

        Ok(Prediction {
            role,
            probabilities,
        })
    }
}

/// Classify with an injected handle; `None` means nothing was loaded.
pub fn predict_maker_taker(
    classifier: Option<&MakerTakerClassifier>,
    quantity_usd: f64,
    volatility: f64,
    spread: f64,
) -> Result<Prediction, CostError> {
    classifier
        .ok_or(CostError::ModelNotLoaded)?
        .predict(quantity_usd, volatility, spread)
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, CostError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CostError::ArtifactMissing {
            path: path.to_path_buf(),
        },
        _ => CostError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|e| CostError::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
