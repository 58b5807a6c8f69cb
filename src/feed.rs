//! Live feed client: owns the push-channel lifecycle.
//!
//! The client connects through a [`Connector`], decodes every text frame as a
//! [`LiveDataResponse`], stores it as the latest message and publishes it to a
//! [`FanoutRegistry`]. While the channel is open a keep-alive probe is sent on
//! a fixed interval. On error or close the client waits a fixed delay and
//! reconnects, according to its [`ReconnectPolicy`].
//!
//! Lifecycle: `Idle -> Connecting -> Open -> Closed -> Connecting -> ...`,
//! with teardown returning to `Idle` from any state. Transport failures never
//! leave this module; they show up only in [`ConnectionStatus`] and
//! [`FeedStats`].

use futures::future::BoxFuture;
use futures::sink::{Sink, SinkExt};
use futures::stream::{BoxStream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::feed_stats::FeedStats;
use crate::registry::FanoutRegistry;
use crate::sample::LiveDataResponse;

/// Delay between a close and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);
/// Interval of keep-alive probes while the channel is open.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(2000);
/// Probe text sent on every keep-alive tick.
pub const DEFAULT_PROBE_MESSAGE: &str = "get";
/// Push-channel path on the dashboard server.
pub const DEFAULT_FEED_PATH: &str = "/api/clients";

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("invalid feed configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),
}

/// What happens after the channel closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Reconnect after every close, without limit.
    #[default]
    Forever,
    /// Give up after this many consecutive reconnects without a successful
    /// open. The client then stays `Closed` until torn down.
    MaxAttempts(u32),
}

/// Configuration of a live feed client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Full push-channel URL (e.g. `ws://127.0.0.1:25774/api/clients`).
    pub url: String,
    pub reconnect_delay: Duration,
    pub keepalive_interval: Duration,
    pub probe_message: String,
    pub reconnect_policy: ReconnectPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: format!("ws://127.0.0.1:25774{}", DEFAULT_FEED_PATH),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            probe_message: DEFAULT_PROBE_MESSAGE.to_string(),
            reconnect_policy: ReconnectPolicy::Forever,
        }
    }
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_probe_message(mut self, probe: impl Into<String>) -> Self {
        self.probe_message = probe.into();
        self
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = policy;
        self
    }

    /// Rejects settings the connection task cannot run with: zero timers
    /// and an empty probe.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.reconnect_delay.is_zero() {
            return Err(FeedError::InvalidConfig(
                "reconnect_delay must be greater than 0".into(),
            ));
        }
        if self.keepalive_interval.is_zero() {
            return Err(FeedError::InvalidConfig(
                "keepalive_interval must be greater than 0".into(),
            ));
        }
        if self.probe_message.is_empty() {
            return Err(FeedError::InvalidConfig("probe_message must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One frame received from the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Ping, pong and other control traffic.
    Control,
    /// Remote close, with its reason if any.
    Close(Option<String>),
}

pub type FrameSink = Pin<Box<dyn Sink<String, Error = FeedError> + Send>>;
pub type FrameStream = BoxStream<'static, Result<Frame, FeedError>>;

/// Both halves of an open push channel.
pub struct FeedChannel {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl FeedChannel {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens push channels. The WebSocket implementation lives in
/// [`crate::transport`].
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<FeedChannel, FeedError>>;
}

/// Latest message and connection status, shared read-only with consumers.
///
/// The feed task is the only writer.
pub struct LiveFeedState {
    latest: RwLock<Option<Arc<LiveDataResponse>>>,
    status: watch::Sender<ConnectionStatus>,
}

impl Default for LiveFeedState {
    fn default() -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            latest: RwLock::new(None),
            status,
        }
    }
}

impl LiveFeedState {
    pub fn latest(&self) -> Option<Arc<LiveDataResponse>> {
        self.latest.read().ok().and_then(|guard| guard.clone())
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    fn store_latest(&self, message: Arc<LiveDataResponse>) {
        if let Ok(mut guard) = self.latest.write() {
            *guard = Some(message);
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(from = %previous, to = %status, "Live feed status changed");
        }
    }
}

/// Live feed client, not yet connected.
pub struct LiveFeedClient {
    config: FeedConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<FanoutRegistry>,
    state: Arc<LiveFeedState>,
    stats: Arc<FeedStats>,
}

impl LiveFeedClient {
    pub fn new(
        config: FeedConfig,
        connector: Arc<dyn Connector>,
        registry: Arc<FanoutRegistry>,
    ) -> Self {
        Self {
            config,
            connector,
            registry,
            state: Arc::new(LiveFeedState::default()),
            stats: Arc::new(FeedStats::new()),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn state(&self) -> Arc<LiveFeedState> {
        Arc::clone(&self.state)
    }

    pub fn stats(&self) -> Arc<FeedStats> {
        Arc::clone(&self.stats)
    }

    pub fn registry(&self) -> &Arc<FanoutRegistry> {
        &self.registry
    }

    /// Starts the connection task. Must be called inside a tokio runtime.
    ///
    /// The client is consumed so only one channel exists per client; the
    /// returned handle owns it until [`FeedHandle::teardown`] or drop.
    pub fn connect(self) -> FeedHandle {
        let cancel = CancellationToken::new();
        let state = Arc::clone(&self.state);
        let stats = Arc::clone(&self.stats);

        info!(url = %self.config.url, "Starting live feed");
        let task = tokio::spawn(self.run(cancel.clone()));

        FeedHandle {
            cancel,
            task: Some(task),
            state,
            stats,
        }
    }

    async fn run(self, cancel: CancellationToken) {
        if let Err(e) = self.config.validate() {
            error!(url = %self.config.url, error = %e, "Live feed not started");
            self.state.set_status(ConnectionStatus::Closed);
            return;
        }

        let mut reconnects: u32 = 0;

        loop {
            self.state.set_status(ConnectionStatus::Connecting);
            self.stats.record_connect_attempt();
            debug!(url = %self.config.url, "Connecting to live feed");

            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.connector.connect(&self.config.url) => result,
            };

            match connected {
                Ok(channel) => {
                    reconnects = 0;
                    self.stats.record_open();
                    self.state.set_status(ConnectionStatus::Open);
                    info!(url = %self.config.url, "Live feed open");

                    if self.pump(channel, &cancel).await == PumpExit::Cancelled {
                        break;
                    }
                }
                Err(e) => {
                    self.stats.record_connect_failure();
                    warn!(url = %self.config.url, error = %e, "Failed to connect to live feed");
                }
            }

            self.state.set_status(ConnectionStatus::Closed);

            if let ReconnectPolicy::MaxAttempts(max) = self.config.reconnect_policy {
                if reconnects >= max {
                    warn!(attempts = reconnects, "Reconnect attempts exhausted, live feed stays closed");
                    return;
                }
            }
            reconnects = reconnects.saturating_add(1);
            self.stats.record_reconnect_scheduled();

            info!(
                attempt = reconnects,
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Reconnecting to live feed"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(self.config.reconnect_delay) => {}
            }
        }

        self.state.set_status(ConnectionStatus::Idle);
        info!("Live feed torn down");
    }

    /// Drives one open channel until it closes or teardown is requested.
    async fn pump(&self, channel: FeedChannel, cancel: &CancellationToken) -> PumpExit {
        let FeedChannel { mut sink, mut stream } = channel;
        let period = self.config.keepalive_interval;
        let mut keepalive = interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    match timeout(CLOSE_TIMEOUT, sink.close()).await {
                        Ok(Ok(())) => debug!("Live feed channel closed"),
                        Ok(Err(e)) => debug!(error = %e, "Error while closing live feed channel"),
                        Err(_) => warn!("Timed out closing live feed channel"),
                    }
                    return PumpExit::Cancelled;
                }
                frame = stream.next() => match frame {
                    Some(Ok(Frame::Text(text))) => self.handle_text(&text),
                    Some(Ok(Frame::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => self.handle_text(&text),
                        Err(e) => {
                            self.stats.record_decode_error();
                            warn!(error = %e, "Dropping non UTF-8 live feed frame");
                        }
                    },
                    Some(Ok(Frame::Control)) => trace!("Control frame"),
                    Some(Ok(Frame::Close(reason))) => {
                        info!(reason = reason.as_deref().unwrap_or("none"), "Live feed closed by server");
                        return PumpExit::Closed;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Live feed transport error");
                        return PumpExit::Closed;
                    }
                    None => {
                        info!("Live feed stream ended");
                        return PumpExit::Closed;
                    }
                },
                _ = keepalive.tick() => {
                    match sink.send(self.config.probe_message.clone()).await {
                        Ok(()) => {
                            self.stats.record_probe(true);
                            trace!("Keep-alive probe sent");
                        }
                        Err(e) => {
                            self.stats.record_probe(false);
                            warn!(error = %e, "Keep-alive probe failed");
                            return PumpExit::Closed;
                        }
                    }
                }
            }
        }
    }

    fn handle_text(&self, text: &str) {
        self.stats.record_message(text.len());
        match serde_json::from_str::<LiveDataResponse>(text) {
            Ok(message) => {
                let message = Arc::new(message);
                self.state.store_latest(Arc::clone(&message));
                let delivered = self.registry.publish(&*message);
                trace!(
                    nodes = message.data.data.len(),
                    online = message.data.online.len(),
                    delivered,
                    "Live feed message dispatched"
                );
            }
            Err(e) => {
                self.stats.record_decode_error();
                warn!(error = %e, bytes = text.len(), "Dropping malformed live feed message");
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PumpExit {
    Closed,
    Cancelled,
}

/// Owner of a running feed task.
///
/// Dropping the handle requests teardown; [`teardown`](Self::teardown) also
/// waits for the task to finish.
pub struct FeedHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    state: Arc<LiveFeedState>,
    stats: Arc<FeedStats>,
}

impl FeedHandle {
    pub fn state(&self) -> Arc<LiveFeedState> {
        Arc::clone(&self.state)
    }

    pub fn stats(&self) -> Arc<FeedStats> {
        Arc::clone(&self.stats)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    pub fn latest(&self) -> Option<Arc<LiveDataResponse>> {
        self.state.latest()
    }

    /// Cancels pending timers, closes the channel if open and waits for the
    /// task to exit. Status is `Idle` afterwards.
    pub async fn teardown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Live feed task ended abnormally");
            }
        }
        self.state.set_status(ConnectionStatus::Idle);
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
