use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CostError {
    #[error("maker/taker model not loaded")]
    ModelNotLoaded,

    #[error("model artifact not found: {path:?}")]
    ArtifactMissing { path: PathBuf },

    #[error("failed to load model artifact {path:?}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
}
