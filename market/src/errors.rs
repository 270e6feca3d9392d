use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("websocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("malformed frame: {0}")]
    Parse(String),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid price level {level:?}: {reason}")]
    InvalidLevel { level: Vec<String>, reason: String },
}
