//! Per-tick trading-cost metrics over a live order book, kept in a bounded
//! history for display and export.

pub mod buffer;
pub mod export;
pub mod pipeline;
pub mod types;

pub use buffer::{DEFAULT_HISTORY_CAPACITY, MetricsBuffer, MetricsHistory};
pub use export::{export_csv, to_csv, write_csv};
pub use pipeline::{MetricsPipeline, PipelineConfig};
pub use types::{MetricsRecord, QuoteView, TickOutcome, TickParams, TickReport};
