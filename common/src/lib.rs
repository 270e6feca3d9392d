pub mod latency;
pub mod logger;
pub mod time;
