//! Reconnect state machine.
//!
//! ```text
//!            open() ok                 session ends
//! Connecting ─────────► Connected ─────────────────► Backoff(d)
//!     ▲  │ open() err                                    │
//!     │  └──────────────────────────────► Backoff(d) ────┘ sleep(d)
//!     │                                                  │
//!     └──────────────────────────────────────────────────┘
//! ```
//!
//! `d` starts at `initial`, doubles after every consecutive failure and is
//! capped at `max`. A successful open resets it. The driver owns no sockets or
//! timers directly: transport goes through [`Connector`] and waiting through
//! [`Sleeper`], so the loop can be exercised without network I/O.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::errors::MarketError;

pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Backoff(Duration),
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    initial: Duration,
    max: Duration,
    next_delay: Duration,
    consecutive_failures: u32,
    state: ConnectionState,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

impl ReconnectPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            next_delay: initial,
            consecutive_failures: 0,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Delay the next failure will produce.
    pub fn peek_delay(&self) -> Duration {
        self.next_delay
    }

    pub fn on_attempt(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// Transport opened: clears the failure streak.
    pub fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.next_delay = self.initial;
        self.consecutive_failures = 0;
    }

    /// Connection failed or dropped. Returns how long to wait before the next
    /// attempt and doubles the following delay, up to `max`.
    pub fn on_failure(&mut self) -> Duration {
        let delay = self.next_delay;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.next_delay = delay.saturating_mul(2).min(self.max);
        self.state = ConnectionState::Backoff(delay);
        delay
    }

    pub fn on_stop(&mut self) {
        self.state = ConnectionState::Stopped;
    }
}

/// How a connected session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The peer closed or the transport broke; `None` is a clean close frame.
    Closed(Option<MarketError>),
    Shutdown,
}

/// Transport seam for the reconnect driver.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send;

    async fn open(&self) -> Result<Self::Connection, MarketError>;

    /// Drive an open connection until it ends or shutdown is requested.
    async fn pump(
        &self,
        conn: Self::Connection,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Keep a connector alive until `shutdown` flips to `true` (or its sender is
/// dropped). Never returns otherwise.
pub async fn run_with_reconnect<C, S>(
    connector: &C,
    sleeper: &S,
    policy: &mut ReconnectPolicy,
    mut shutdown: watch::Receiver<bool>,
) where
    C: Connector,
    S: Sleeper,
{
    loop {
        if *shutdown.borrow() {
            break;
        }

        policy.on_attempt();
        debug!(state = ?policy.state(), "opening connection");

        let opened = tokio::select! {
            res = connector.open() => res,
            _ = shutdown.changed() => break,
        };

        match opened {
            Ok(conn) => {
                policy.on_connected();
                info!("connection opened");

                match connector.pump(conn, &mut shutdown).await {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Closed(None) => warn!("connection closed by peer"),
                    SessionEnd::Closed(Some(e)) => warn!(error = %e, "connection dropped"),
                }
            }
            Err(e) => error!(error = %e, "connection attempt failed"),
        }

        let delay = policy.on_failure();
        warn!(
            delay_ms = delay.as_millis() as u64,
            failures = policy.consecutive_failures(),
            "reconnecting after backoff"
        );

        tokio::select! {
            _ = sleeper.sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    policy.on_stop();
    info!("reconnect loop stopped");
}
