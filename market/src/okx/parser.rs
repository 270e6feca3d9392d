//! OKX public WebSocket frame parser.
//!
//! The public endpoint multiplexes control replies and channel data over one
//! socket. Frames we care about look like:
//!
//! ```jsonc
//! // subscription acknowledgement
//! { "event": "subscribe", "arg": { "channel": "books", "instId": "BTC-USDT" } }
//!
//! // order book push
//! {
//!   "arg":  { "channel": "books", "instId": "BTC-USDT" },
//!   "action": "snapshot",
//!   "data": [{
//!     "asks": [["41006.8", "0.60038921", "0", "1"], ...],
//!     "bids": [["41006.3", "0.30178218", "0", "2"], ...],
//!     "ts": "1629966436396"
//!   }]
//! }
//! ```
//!
//! Only the first two elements of each level (price, size) are consumed.
//! Levels must parse to finite, non-negative numbers; a single bad level
//! rejects the whole frame so a partially decoded book is never published.
//!
//! The parser is stateless. It never touches the shared snapshot.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::MarketError;
use crate::types::{BookUpdate, OkxEvent, PriceLevel};

pub const BOOKS_CHANNEL: &str = "books";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    arg: Option<ChannelArg>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    data: Option<Vec<RawBook>>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelArg {
    channel: String,
    #[serde(default)]
    inst_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBook {
    ts: String,
    asks: Vec<Vec<String>>,
    bids: Vec<Vec<String>>,
}

/// Decode one raw text frame.
pub fn parse_okx_event(raw: &str) -> Result<OkxEvent, MarketError> {
    if raw.trim() == "pong" {
        return Ok(OkxEvent::Pong);
    }

    let json: Value = serde_json::from_str(raw)?;
    if !json.is_object() {
        return Err(MarketError::Parse("frame is not a JSON object".into()));
    }

    // Books frames are the hot path; anything else is tried lazily.
    let is_books = json
        .get("arg")
        .and_then(|a| a.get("channel"))
        .and_then(Value::as_str)
        == Some(BOOKS_CHANNEL);

    if json.get("event").is_none() && !is_books {
        return Ok(OkxEvent::Unknown(json));
    }

    let env: Envelope = serde_json::from_value(json.clone())?;

    if let Some(event) = env.event.as_deref() {
        return Ok(match event {
            "subscribe" => {
                let arg = env
                    .arg
                    .ok_or_else(|| MarketError::Parse("subscribe ack without arg".into()))?;
                OkxEvent::Subscribed {
                    channel: arg.channel,
                    inst_id: arg.inst_id,
                }
            }
            "error" => OkxEvent::Error {
                code: env.code.unwrap_or_default(),
                msg: env.msg.unwrap_or_default(),
            },
            _ => OkxEvent::Unknown(json),
        });
    }

    let inst_id = env.arg.and_then(|a| a.inst_id);
    let book = env
        .data
        .and_then(|d| d.into_iter().next())
        .ok_or_else(|| MarketError::Parse("books frame without data[0]".into()))?;

    Ok(OkxEvent::BookUpdate(Box::new(BookUpdate {
        inst_id,
        action: env.action,
        ts: book.ts,
        asks: parse_levels(&book.asks)?,
        bids: parse_levels(&book.bids)?,
    })))
}

fn parse_levels(raw: &[Vec<String>]) -> Result<Vec<PriceLevel>, MarketError> {
    raw.iter().map(|lvl| parse_level(lvl)).collect()
}

fn parse_level(level: &[String]) -> Result<PriceLevel, MarketError> {
    let invalid = |reason: &str| MarketError::InvalidLevel {
        level: level.to_vec(),
        reason: reason.to_string(),
    };

    let (price, size) = match level {
        [p, s, ..] => (p, s),
        _ => return Err(invalid("expected at least [price, size]")),
    };

    let price: f64 = price.parse().map_err(|_| invalid("price is not numeric"))?;
    let size: f64 = size.parse().map_err(|_| invalid("size is not numeric"))?;

    if !price.is_finite() || !size.is_finite() {
        return Err(invalid("non-finite value"));
    }
    if price < 0.0 || size < 0.0 {
        return Err(invalid("negative value"));
    }

    Ok(PriceLevel { price, size })
}
