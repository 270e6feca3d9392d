use async_trait::async_trait;
use futures::{Sink, SinkExt, StreamExt};
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc::Sender, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};
use tracing::{Instrument, debug, info, trace, warn};

use common::logger::{TraceId, root_span};

use super::parser::BOOKS_CHANNEL;
use super::{OkxConfig, OrderBookFeed};
use crate::errors::MarketError;
use crate::reconnect::{
    Connector, ReconnectPolicy, SessionEnd, Sleeper, TokioSleeper, run_with_reconnect,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client for the OKX public `books` channel.
///
/// This client:
/// - connects to the public endpoint and subscribes to one instrument
/// - forwards every text frame, untouched, into an mpsc channel
/// - pings the server and tears down silent connections
/// - reconnects with capped exponential backoff until shutdown
pub struct OkxWsClient<S = TokioSleeper> {
    config: OkxConfig,
    sleeper: S,
}

impl OkxWsClient {
    pub fn new(config: OkxConfig) -> Self {
        Self::with_sleeper(config, TokioSleeper)
    }
}

impl<S: Sleeper> OkxWsClient<S> {
    pub fn with_sleeper(config: OkxConfig, sleeper: S) -> Self {
        Self { config, sleeper }
    }
}

/// JSON subscribe request for the `books` channel.
pub fn subscribe_request(inst_id: &str) -> serde_json::Value {
    json!({
        "op": "subscribe",
        "args": [{ "channel": BOOKS_CHANNEL, "instId": inst_id }]
    })
}

async fn send_subscribe<W>(write: &mut W, inst_id: &str) -> Result<(), MarketError>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(&subscribe_request(inst_id))?;
    debug!(payload = %text, "sending books subscription");
    write.send(Message::Text(text.into())).await?;
    Ok(())
}

/// One connection's worth of state handed to the reconnect driver.
struct OkxSession {
    url: String,
    inst_id: String,
    sender: Sender<String>,
    ping_interval: Duration,
    idle_timeout: Duration,
}

#[async_trait]
impl Connector for OkxSession {
    type Connection = WsStream;

    async fn open(&self) -> Result<WsStream, MarketError> {
        debug!(url = %self.url, "attempting connection to OKX WebSocket");
        let (ws, response) = connect_async(self.url.as_str()).await?;
        info!(status = %response.status(), "WebSocket connection established");
        Ok(ws)
    }

    async fn pump(&self, ws: WsStream, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        let (mut write, mut read) = ws.split();

        if let Err(e) = send_subscribe(&mut write, &self.inst_id).await {
            return SessionEnd::Closed(Some(e));
        }

        let mut ping = tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_frame = Instant::now();

        loop {
            let idle_deadline = last_frame + self.idle_timeout;

            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("shutdown requested; closing socket");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "close frame not sent");
                    }
                    return SessionEnd::Shutdown;
                }

                _ = ping.tick() => {
                    if let Err(e) = write.send(Message::Ping(Default::default())).await {
                        return SessionEnd::Closed(Some(e.into()));
                    }
                    trace!("ping sent");
                }

                _ = tokio::time::sleep_until(idle_deadline) => {
                    return SessionEnd::Closed(Some(MarketError::ConnectionLost(format!(
                        "no frames for {:?}",
                        self.idle_timeout
                    ))));
                }

                next = read.next() => {
                    let msg = match next {
                        None => return SessionEnd::Closed(None),
                        Some(Err(e)) => return SessionEnd::Closed(Some(e.into())),
                        Some(Ok(m)) => m,
                    };
                    last_frame = Instant::now();

                    match msg {
                        Message::Text(text) => {
                            // Raw frames only at TRACE to keep production logs small
                            trace!(raw_event = %text.as_str(), "received raw WebSocket message");
                            if self.sender.send(text.as_str().to_owned()).await.is_err() {
                                warn!("frame receiver dropped; worker shutting down");
                                return SessionEnd::Shutdown;
                            }
                        }
                        Message::Close(frame) => {
                            info!(frame = ?frame, "close frame received");
                            return SessionEnd::Closed(None);
                        }
                        Message::Ping(_) | Message::Pong(_) => trace!("keep-alive"),
                        other => debug!(msg_type = ?other, "ignoring non-text WebSocket message"),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<S: Sleeper + 'static> OrderBookFeed for OkxWsClient<S> {
    async fn stream_books(
        &self,
        inst_id: String,
        sender: Sender<String>,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let trace_id = TraceId::default();
        let span = root_span("okx_books_feed", &trace_id);
        span.record("inst_id", inst_id.as_str());

        let session = OkxSession {
            url: self.config.ws_url.clone(),
            inst_id,
            sender,
            ping_interval: self.config.ping_interval,
            idle_timeout: self.config.idle_timeout(),
        };
        let mut policy =
            ReconnectPolicy::new(self.config.initial_backoff, self.config.max_backoff);

        async {
            info!(url = %session.url, "starting OKX books stream worker");
            run_with_reconnect(&session, &self.sleeper, &mut policy, shutdown).await;
        }
        .instrument(span)
        .await;

        Ok(())
    }
}
