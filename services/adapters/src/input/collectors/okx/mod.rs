//! OKX candle websocket collector
//!
//! One supervisor task owns the connection lifecycle and reacts to events
//! from the read loop, the timers and the adapter handle:
//!
//! ```text
//!             ┌──────── FeedEvent (unbounded) ────────┐
//!  handle ────┤ Stop / ForceReconnect / Stale         │
//!  read loop ─┤ TransportLost{session}                ├──► supervisor
//!  timer ─────┤ ReconnectDue{generation}              │
//!             └───────────────────────────────────────┘
//! ```
//!
//! The supervisor is the only place state transitions happen. Events tagged
//! with an old session or timer generation are ignored. The read loop
//! only reads; the keepalive timer, the subscription and the close handshake
//! all write through one `tokio::sync::Mutex` around the sink.

pub mod frames;

use crate::input::{
    ConnectionState, ConnectionTracker, FeedHealth, InputAdapter, ReconnectPolicy, ScheduledTask,
};
use crate::{AdapterError, Result};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use signal_config::FeedConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use types::{Candle, InstrumentId};

use frames::{decode_frame, subscription_message, FeedFrame, KEEPALIVE_PING};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type SharedSink = Arc<Mutex<Option<WsSink>>>;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum FeedEvent {
    Stop,
    ReconnectDue { generation: u64 },
    ForceReconnect,
    Stale,
    TransportLost { session: u64, error: AdapterError },
}

/// What the read loop does after one inbound message
#[derive(Debug)]
enum ReadOutcome {
    Continue,
    ConsumerGone,
    Lost(AdapterError),
}

/// Streams one instrument's candles into a bounded queue
pub struct OkxCandleCollector {
    config: FeedConfig,
    tracker: Arc<ConnectionTracker>,
    output: mpsc::Sender<Candle>,
    control: Option<mpsc::UnboundedSender<FeedEvent>>,
    supervisor: Option<JoinHandle<Result<()>>>,
}

impl OkxCandleCollector {
    pub fn new(config: FeedConfig, output: mpsc::Sender<Candle>) -> Self {
        let tracker = Arc::new(ConnectionTracker::new(config.message_timeout()));
        Self {
            config,
            tracker,
            output,
            control: None,
            supervisor: None,
        }
    }

    /// Collector plus the receiving end of a queue sized from config
    pub fn with_queue(config: FeedConfig) -> (Self, mpsc::Receiver<Candle>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        (Self::new(config, tx), rx)
    }

    pub fn tracker(&self) -> Arc<ConnectionTracker> {
        self.tracker.clone()
    }

    fn send_control(&self, event: FeedEvent) -> bool {
        self.control
            .as_ref()
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }
}

#[async_trait]
impl InputAdapter for OkxCandleCollector {
    fn instrument(&self) -> &InstrumentId {
        &self.config.instrument
    }

    async fn start(&mut self) -> Result<()> {
        if self.supervisor.is_some() {
            return Ok(());
        }

        url::Url::parse(&self.config.ws_url).map_err(|e| {
            AdapterError::Configuration(format!(
                "invalid websocket URL {}: {}",
                self.config.ws_url, e
            ))
        })?;

        info!(
            "Starting OKX candle feed for {} ({})",
            self.config.instrument, self.config.bar
        );

        let (supervisor, tx) = FeedSupervisor::new(
            self.config.clone(),
            self.tracker.clone(),
            self.output.clone(),
        );

        self.control = Some(tx);
        self.supervisor = Some(tokio::spawn(supervisor.run()));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(control) = self.control.take() {
            let _ = control.send(FeedEvent::Stop);
        }

        if let Some(handle) = self.supervisor.take() {
            match handle.await {
                Ok(Ok(())) => info!("OKX candle feed stopped"),
                Ok(Err(e)) => warn!("OKX candle feed had already ended: {}", e),
                Err(e) => error!("OKX feed supervisor failed: {}", e),
            }
        }

        if !self.tracker.is_feed_unavailable() {
            self.tracker.set_state(ConnectionState::Disconnected);
        }
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.tracker.state()
    }

    fn check_health(&self) -> FeedHealth {
        if self.tracker.is_stale() {
            warn!(
                "OKX feed silent for {}ms, forcing reconnect",
                self.tracker.silence().as_millis()
            );
            self.send_control(FeedEvent::Stale);
        }
        self.tracker.snapshot()
    }

    fn health(&self) -> FeedHealth {
        self.tracker.snapshot()
    }

    async fn reconnect(&self) -> Result<()> {
        if self.send_control(FeedEvent::ForceReconnect) {
            Ok(())
        } else {
            Err(AdapterError::NotConnected)
        }
    }
}

/// Single owner of the connection lifecycle
struct FeedSupervisor {
    config: FeedConfig,
    policy: ReconnectPolicy,
    tracker: Arc<ConnectionTracker>,
    output: mpsc::Sender<Candle>,
    events_tx: mpsc::UnboundedSender<FeedEvent>,
    events_rx: mpsc::UnboundedReceiver<FeedEvent>,
    sink: SharedSink,
    reader: Option<JoinHandle<()>>,
    keepalive: Option<ScheduledTask>,
    reconnect_timer: Option<ScheduledTask>,
    failures: u32,
    /// Bumped per successful connection so stale read-loop events are ignored
    session: u64,
    /// Bumped per scheduled reconnect so a superseded timer cannot trigger one
    timer_generation: u64,
}

impl FeedSupervisor {
    fn new(
        config: FeedConfig,
        tracker: Arc<ConnectionTracker>,
        output: mpsc::Sender<Candle>,
    ) -> (Self, mpsc::UnboundedSender<FeedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = Self {
            policy: ReconnectPolicy::from_config(&config),
            config,
            tracker,
            output,
            events_tx: tx.clone(),
            events_rx: rx,
            sink: Arc::new(Mutex::new(None)),
            reader: None,
            keepalive: None,
            reconnect_timer: None,
            failures: 0,
            session: 0,
            timer_generation: 0,
        };
        (supervisor, tx)
    }

    async fn run(mut self) -> Result<()> {
        let result = self.supervise().await;
        self.teardown().await;

        match &result {
            Err(e) if e.is_feed_unavailable() => {
                error!("OKX feed unavailable: {}", e);
                self.tracker.record_error(e.to_string());
                self.tracker.mark_feed_unavailable();
            }
            _ => self.tracker.set_state(ConnectionState::Disconnected),
        }
        result
    }

    async fn supervise(&mut self) -> Result<()> {
        if !self.connect().await? {
            return Ok(());
        }

        while let Some(event) = self.events_rx.recv().await {
            if !self.handle(event).await? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Apply one event. `Ok(false)` ends supervision.
    async fn handle(&mut self, event: FeedEvent) -> Result<bool> {
        match event {
            FeedEvent::Stop => {
                debug!("Stop requested");
                Ok(false)
            }
            FeedEvent::ReconnectDue { generation } => {
                if generation != self.timer_generation {
                    debug!("Ignoring superseded reconnect timer {}", generation);
                    return Ok(true);
                }
                if self.tracker.state() != ConnectionState::Reconnecting {
                    return Ok(true);
                }
                self.reconnect_timer = None;
                self.connect().await
            }
            FeedEvent::ForceReconnect => {
                info!("Manual reconnect requested");
                self.teardown().await;
                self.failures = 0;
                self.connect().await
            }
            FeedEvent::Stale => {
                if self.tracker.state() == ConnectionState::Connected {
                    self.on_failure(AdapterError::ConnectionTimeout {
                        stage: "heartbeat",
                        timeout_ms: self.config.message_timeout_ms,
                    })
                    .await?;
                }
                Ok(true)
            }
            FeedEvent::TransportLost { session, error } => {
                if session == self.session && self.tracker.state() == ConnectionState::Connected {
                    self.on_failure(error).await?;
                }
                Ok(true)
            }
        }
    }

    /// One connection attempt. `Ok(false)` when a stop arrived meanwhile;
    /// `Err` only once the reconnect budget is spent.
    async fn connect(&mut self) -> Result<bool> {
        self.tracker.set_state(ConnectionState::Connecting);

        let outcome = {
            let attempt = establish(&self.config, &self.tracker, &self.sink, &self.output);
            tokio::pin!(attempt);
            loop {
                tokio::select! {
                    result = &mut attempt => break Some(result),
                    event = self.events_rx.recv() => match event {
                        Some(FeedEvent::Stop) | None => break None,
                        Some(other) => debug!("Ignoring {:?} while connecting", other),
                    },
                }
            }
        };

        match outcome {
            None => Ok(false),
            Some(Ok(source)) => {
                self.on_connected(source);
                Ok(true)
            }
            Some(Err(e)) => {
                self.on_failure(e).await?;
                Ok(true)
            }
        }
    }

    fn on_connected(&mut self, source: WsSource) {
        self.failures = 0;
        self.session += 1;
        self.tracker.mark_connected();
        info!(
            "OKX feed connected: {} {}",
            self.config.instrument, self.config.bar
        );

        self.reader = Some(tokio::spawn(read_loop(
            source,
            self.session,
            self.tracker.clone(),
            self.output.clone(),
            self.events_tx.clone(),
        )));

        let sink = self.sink.clone();
        let events = self.events_tx.clone();
        let session = self.session;
        self.keepalive = Some(ScheduledTask::every(
            self.config.keepalive_interval(),
            move || {
                let sink = sink.clone();
                let events = events.clone();
                async move {
                    match send_text(&sink, KEEPALIVE_PING).await {
                        Ok(()) => debug!("Keepalive sent"),
                        Err(error) => {
                            warn!("Keepalive failed: {}", error);
                            let _ = events.send(FeedEvent::TransportLost { session, error });
                        }
                    }
                }
            },
        ));
    }

    async fn on_failure(&mut self, error: AdapterError) -> Result<()> {
        warn!("OKX feed failure: {}", error);
        self.tracker.record_error(error.to_string());
        self.teardown().await;

        let Some(delay) = self.policy.next_delay(self.failures) else {
            return Err(AdapterError::MaxReconnectAttemptsExceeded {
                max_attempts: self.policy.max_attempts,
            });
        };

        self.failures += 1;
        self.tracker.set_reconnect_attempts(self.failures);
        self.tracker.set_state(ConnectionState::Reconnecting);
        info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay, self.failures, self.policy.max_attempts
        );

        self.timer_generation += 1;
        let generation = self.timer_generation;
        let events = self.events_tx.clone();
        self.reconnect_timer = Some(ScheduledTask::once(delay, move || async move {
            let _ = events.send(FeedEvent::ReconnectDue { generation });
        }));
        Ok(())
    }

    /// Cancel timers, stop the reader and close the socket
    async fn teardown(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.cancel().await;
        }
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.cancel().await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            if timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
                debug!("Close handshake timed out");
            }
        }
    }
}

/// Open the socket, subscribe and wait for the acknowledgement
async fn establish(
    config: &FeedConfig,
    tracker: &ConnectionTracker,
    sink: &SharedSink,
    output: &mpsc::Sender<Candle>,
) -> Result<WsSource> {
    info!("Connecting to {}", config.ws_url);

    let (stream, response) =
        match timeout(config.connect_timeout(), connect_async(config.ws_url.as_str())).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                return Err(AdapterError::ConnectionFailed {
                    url: config.ws_url.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(AdapterError::ConnectionTimeout {
                    stage: "connect",
                    timeout_ms: config.connect_timeout_ms,
                })
            }
        };
    debug!("Websocket handshake status {}", response.status());

    let (writer, mut reader) = stream.split();
    *sink.lock().await = Some(writer);

    let subscription = subscription_message(&config.instrument, &config.bar);
    send_text(sink, &subscription).await?;
    debug!("Sent subscription {}", subscription);

    match timeout(
        config.subscribe_timeout(),
        await_subscription(&mut reader, tracker, output),
    )
    .await
    {
        Ok(Ok(())) => Ok(reader),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(AdapterError::ConnectionTimeout {
            stage: "subscribe",
            timeout_ms: config.subscribe_timeout_ms,
        }),
    }
}

async fn await_subscription(
    reader: &mut WsSource,
    tracker: &ConnectionTracker,
    output: &mpsc::Sender<Candle>,
) -> Result<()> {
    while let Some(message) = reader.next().await {
        let message = message?;
        tracker.record_message();

        let text = match message {
            Message::Text(text) => text,
            Message::Close(frame) => {
                return Err(AdapterError::ConnectionClosed {
                    reason: frame.map(|f| f.reason.to_string()),
                })
            }
            _ => continue,
        };

        match decode_frame(&text) {
            Ok(FeedFrame::SubscribeAck { channel, inst_id }) => {
                info!("Subscribed to {} {}", channel, inst_id);
                return Ok(());
            }
            Ok(FeedFrame::Error { code, message }) => {
                return Err(AdapterError::SubscriptionRejected { code, message });
            }
            Ok(FeedFrame::Candles { candles, malformed }) => {
                forward_candles(candles, malformed, tracker, output);
            }
            Ok(other) => debug!("Frame before subscription ack: {:?}", other),
            Err(e) => {
                tracker.record_malformed(1);
                warn!("Dropping malformed frame: {}", e);
            }
        }
    }

    Err(AdapterError::ConnectionClosed { reason: None })
}

/// Read frames until the transport fails, reporting the loss to the
/// supervisor. Never blocks on the candle consumer.
async fn read_loop(
    mut reader: WsSource,
    session: u64,
    tracker: Arc<ConnectionTracker>,
    output: mpsc::Sender<Candle>,
    events: mpsc::UnboundedSender<FeedEvent>,
) {
    let error = loop {
        let message = match reader.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => break AdapterError::WebSocket(e),
            None => {
                break AdapterError::ConnectionClosed {
                    reason: Some("stream ended".to_string()),
                }
            }
        };
        tracker.record_message();

        match process_message(message, &tracker, &output) {
            ReadOutcome::Continue => {}
            ReadOutcome::ConsumerGone => {
                info!("Candle consumer dropped, stopping feed");
                let _ = events.send(FeedEvent::Stop);
                return;
            }
            ReadOutcome::Lost(error) => break error,
        }
    };

    let _ = events.send(FeedEvent::TransportLost { session, error });
}

/// Handle one message on an established connection. A venue error event
/// here is a protocol failure and ends the connection.
fn process_message(
    message: Message,
    tracker: &ConnectionTracker,
    output: &mpsc::Sender<Candle>,
) -> ReadOutcome {
    match message {
        Message::Text(text) => match decode_frame(&text) {
            Ok(FeedFrame::Candles { candles, malformed }) => {
                if forward_candles(candles, malformed, tracker, output) {
                    ReadOutcome::Continue
                } else {
                    ReadOutcome::ConsumerGone
                }
            }
            Ok(FeedFrame::Pong) => {
                debug!("Keepalive acknowledged");
                ReadOutcome::Continue
            }
            Ok(FeedFrame::Error { code, message }) => ReadOutcome::Lost(
                AdapterError::UnexpectedFrame(format!("venue error {}: {}", code, message)),
            ),
            Ok(FeedFrame::SubscribeAck { channel, .. }) => {
                debug!("Repeated subscription ack for {}", channel);
                ReadOutcome::Continue
            }
            Ok(FeedFrame::Event(event)) => {
                info!("Venue event: {}", event);
                ReadOutcome::Continue
            }
            Ok(FeedFrame::Unrecognized) => {
                debug!("Unrecognized frame: {}", text);
                ReadOutcome::Continue
            }
            Err(e) => {
                tracker.record_malformed(1);
                warn!("Dropping malformed frame: {}", e);
                ReadOutcome::Continue
            }
        },
        Message::Close(frame) => ReadOutcome::Lost(AdapterError::ConnectionClosed {
            reason: frame.map(|f| f.reason.to_string()),
        }),
        Message::Ping(_) | Message::Pong(_) => {
            debug!("Transport ping/pong");
            ReadOutcome::Continue
        }
        Message::Binary(_) | Message::Frame(_) => {
            debug!("Ignoring non-text frame");
            ReadOutcome::Continue
        }
    }
}

/// Push decoded candles without waiting. Returns `false` once the consumer
/// is gone.
fn forward_candles(
    candles: Vec<Candle>,
    malformed: usize,
    tracker: &ConnectionTracker,
    output: &mpsc::Sender<Candle>,
) -> bool {
    if malformed > 0 {
        tracker.record_malformed(malformed as u64);
        warn!("Dropped {} malformed candle rows", malformed);
    }

    for candle in candles {
        match output.try_send(candle) {
            Ok(()) => {}
            Err(TrySendError::Full(candle)) => {
                let dropped = tracker.record_dropped_candle();
                warn!(
                    "Candle queue full, dropped update at {} ({} total)",
                    candle.timestamp_ms, dropped
                );
            }
            Err(TrySendError::Closed(_)) => return false,
        }
    }
    true
}

async fn send_text(sink: &SharedSink, text: &str) -> Result<()> {
    let mut guard = sink.lock().await;
    let writer = guard.as_mut().ok_or(AdapterError::NotConnected)?;
    match timeout(SEND_TIMEOUT, writer.send(Message::Text(text.to_string()))).await {
        Ok(result) => result.map_err(AdapterError::from),
        Err(_) => Err(AdapterError::ConnectionTimeout {
            stage: "send",
            timeout_ms: SEND_TIMEOUT.as_millis() as u64,
        }),
    }
}
