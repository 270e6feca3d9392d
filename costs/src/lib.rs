//! Trading-cost models.
//!
//! Everything here is a pure function of its inputs (plus read-only tables and
//! an immutable classifier handle), so any number of ticks may call in
//! concurrently.

pub mod errors;
pub mod fees;
pub mod impact;
pub mod maker_taker;
pub mod slippage;

pub use errors::CostError;
pub use fees::{FeeRates, FeeTierTable, calculate_fees, is_vip_tier};
pub use impact::{ImpactParams, estimate_market_impact};
pub use maker_taker::{
    LogisticModel, MakerTakerClassifier, ModelArtifacts, OrderRole, Prediction, StandardScaler,
    predict_maker_taker,
};
pub use slippage::{SlippageParams, estimate_slippage};
