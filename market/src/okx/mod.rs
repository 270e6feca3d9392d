pub mod parser;
pub mod ws;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc::Sender, watch};

use crate::reconnect::{DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF};

pub const OKX_PUBLIC_WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";
pub const DEFAULT_INST_ID: &str = "BTC-USDT";

/// Connection settings for the OKX public order-book feed.
#[derive(Clone, Debug)]
pub struct OkxConfig {
    pub ws_url: String,
    pub inst_id: String,

    /// First reconnect delay; doubles per consecutive failure.
    pub initial_backoff: Duration,
    /// Upper bound for the reconnect delay.
    pub max_backoff: Duration,

    /// How often a WebSocket ping is sent on an idle connection.
    pub ping_interval: Duration,
    /// Grace period after `ping_interval` before a silent connection is
    /// considered dead.
    pub ping_timeout: Duration,

    /// Capacity of the channel between the socket reader and the book writer.
    pub frame_buffer: usize,
}

impl Default for OkxConfig {
    fn default() -> Self {
        Self {
            ws_url: OKX_PUBLIC_WS_URL.to_string(),
            inst_id: DEFAULT_INST_ID.to_string(),
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            ping_interval: Duration::from_secs(20),
            ping_timeout: Duration::from_secs(10),
            frame_buffer: 256,
        }
    }
}

impl OkxConfig {
    pub fn with_inst_id(mut self, inst_id: impl Into<String>) -> Self {
        self.inst_id = inst_id.into();
        self
    }

    /// Silence after which the connection is torn down.
    pub fn idle_timeout(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }
}

/// Source of raw order-book frames for one instrument.
///
/// Implementations own the transport and its reconnect policy and push every
/// text frame into `sender` until `shutdown` flips to `true`.
#[async_trait]
pub trait OrderBookFeed: Send + Sync + 'static {
    async fn stream_books(
        &self,
        inst_id: String,
        sender: Sender<String>,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_public_endpoint() {
        let cfg = OkxConfig::default().with_inst_id("ETH-USDT");

        assert_eq!(cfg.ws_url, OKX_PUBLIC_WS_URL);
        assert_eq!(cfg.inst_id, "ETH-USDT");
        assert_eq!(cfg.initial_backoff, Duration::from_secs(1));
        assert_eq!(cfg.max_backoff, Duration::from_secs(60));
        assert_eq!(cfg.idle_timeout(), Duration::from_secs(30));
    }
}
