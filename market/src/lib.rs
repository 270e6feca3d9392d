pub mod client;
pub mod errors;
pub mod okx;
pub mod reconnect;
pub mod types;

pub use client::{MarketDataClient, SnapshotSource, StaticSnapshot};
pub use errors::MarketError;
pub use okx::{OkxConfig, OrderBookFeed, ws::OkxWsClient};
pub use types::{FrameOutcome, OrderBookSnapshot, PriceLevel};
