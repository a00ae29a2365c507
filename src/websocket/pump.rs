//! Read and write pumps
//!
//! Every connection runs two tasks. The read pump is the only reader of the
//! socket: it enforces the frame size limit and the pong deadline, and feeds
//! parsed requests to the hub. The write pump is the only writer: it drains
//! the client's outbound queue and sends a ping every `ping_period`.
//!
//! The pumps share a [`Shutdown`] signal. Whichever exits first raises it and
//! the other one stops at its next suspension point. The read pump always
//! unregisters the client on exit; the write pump always closes the sink.

use axum::extract::ws::{close_code, Message};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::client::Client;
use super::hub::{HubError, HubHandle};
use super::messages::{parse_request, ParseError, Response};

/// Maximum inbound frame size in bytes
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Time allowed between pongs from the peer
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Time allowed to write a single frame
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Timing and size limits applied by the pumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpConfig {
    pub max_message_size: usize,
    pub pong_wait: Duration,
    pub write_wait: Duration,
    /// Must be shorter than `pong_wait`
    pub ping_period: Duration,
}

impl PumpConfig {
    /// Build a config whose ping period is 9/10 of `pong_wait`
    pub fn new(max_message_size: usize, pong_wait: Duration, write_wait: Duration) -> Self {
        Self {
            max_message_size,
            pong_wait,
            write_wait,
            ping_period: pong_wait * 9 / 10,
        }
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self::new(MAX_MESSAGE_SIZE, PONG_WAIT, WRITE_WAIT)
    }
}

/// Fatal transport conditions that end a pump
#[derive(Debug, Error)]
pub enum PumpError {
    #[error("No pong received within {0:?}")]
    ReadDeadline(Duration),

    #[error("Write did not complete within {0:?}")]
    WriteDeadline(Duration),

    #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer dropped the connection without a closing handshake
    #[error("Connection reset: {0}")]
    Reset(String),

    #[error(transparent)]
    Hub(#[from] HubError),
}

/// Connection-wide stop signal shared by the two pumps
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal has been raised
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles of the two tasks serving one connection
pub struct ClientTasks {
    pub read: JoinHandle<()>,
    pub write: JoinHandle<()>,
}

impl ClientTasks {
    /// Wait for both pumps to finish
    pub async fn join(self) {
        let _ = self.read.await;
        let _ = self.write.await;
    }
}

/// Spawn the read and write pumps for `client`
pub fn spawn_pumps<S, E, W>(
    client: Arc<Client>,
    outbound: mpsc::Receiver<String>,
    hub: HubHandle,
    stream: S,
    sink: W,
    config: PumpConfig,
) -> ClientTasks
where
    S: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
{
    let shutdown = Shutdown::new();

    let write = tokio::spawn(write_pump(
        Arc::clone(&client),
        sink,
        outbound,
        config,
        shutdown.clone(),
    ));
    let read = tokio::spawn(read_pump(client, hub, stream, config, shutdown));

    ClientTasks { read, write }
}

/// Pump frames from the connection to the hub
pub async fn read_pump<S, E>(
    client: Arc<Client>,
    hub: HubHandle,
    mut stream: S,
    config: PumpConfig,
    mut shutdown: Shutdown,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    match read_loop(&client, &hub, &mut stream, &config, &mut shutdown).await {
        Ok(()) => tracing::debug!(client_id = %client.id(), "Read pump finished"),
        Err(e @ PumpError::Reset(_)) => {
            tracing::debug!(client_id = %client.id(), error = %e, "Read pump stopped")
        }
        Err(e) => tracing::info!(client_id = %client.id(), error = %e, "Read pump stopped"),
    }

    hub.unregister(Arc::clone(&client));
    shutdown.trigger();
}

async fn read_loop<S, E>(
    client: &Arc<Client>,
    hub: &HubHandle,
    stream: &mut S,
    config: &PumpConfig,
    shutdown: &mut Shutdown,
) -> Result<(), PumpError>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + config.pong_wait;

    loop {
        let next = tokio::select! {
            _ = shutdown.wait() => return Ok(()),
            next = tokio::time::timeout_at(deadline, stream.next()) => next,
        };

        let message = match next {
            Err(_) => return Err(PumpError::ReadDeadline(config.pong_wait)),
            // Peer went away without a close frame.
            Ok(None) => return Ok(()),
            Ok(Some(Err(e))) => return Err(read_error(e.to_string())),
            Ok(Some(Ok(message))) => message,
        };

        let raw = match message {
            Message::Text(text) => {
                check_size(text.len(), config)?;
                text
            }
            Message::Binary(bytes) => {
                check_size(bytes.len(), config)?;
                match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        client.send(Response::error(ParseError::InvalidUtf8).encode());
                        continue;
                    }
                }
            }
            Message::Pong(_) => {
                deadline = Instant::now() + config.pong_wait;
                continue;
            }
            // Pings are answered by the protocol layer.
            Message::Ping(_) => continue,
            Message::Close(Some(frame)) if is_unexpected_close(frame.code) => {
                tracing::info!(
                    client_id = %client.id(),
                    code = frame.code,
                    reason = %frame.reason,
                    "Client closed with unexpected code"
                );
                return Ok(());
            }
            Message::Close(_) => {
                tracing::debug!(client_id = %client.id(), "Client requested close");
                return Ok(());
            }
        };

        let frame = normalize_frame(&raw);
        if frame.is_empty() {
            continue;
        }

        tracing::debug!(client_id = %client.id(), frame = %frame, "Received message");

        match parse_request(&frame) {
            Ok(request) => hub.submit(Arc::clone(client), request).await?,
            Err(e) => {
                tracing::debug!(client_id = %client.id(), error = %e, "Invalid client message");
                client.send(Response::error(&e).encode());
            }
        }
    }
}

/// Pump queued payloads and pings from the client to the connection
pub async fn write_pump<W>(
    client: Arc<Client>,
    mut sink: W,
    mut outbound: mpsc::Receiver<String>,
    config: PumpConfig,
    mut shutdown: Shutdown,
) where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    // `interval_at` panics on a zero period.
    let period = config.ping_period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    match write_loop(&mut sink, &mut outbound, &mut ticker, &config, &mut shutdown).await {
        Ok(()) => tracing::debug!(client_id = %client.id(), "Write pump finished"),
        Err(e) => tracing::info!(client_id = %client.id(), error = %e, "Write pump stopped"),
    }

    shutdown.trigger();
    // Already-closed sinks report an error here; the connection is gone either way.
    let _ = tokio::time::timeout(config.write_wait, sink.close()).await;
}

async fn write_loop<W>(
    sink: &mut W,
    outbound: &mut mpsc::Receiver<String>,
    ticker: &mut tokio::time::Interval,
    config: &PumpConfig,
    shutdown: &mut Shutdown,
) -> Result<(), PumpError>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    loop {
        tokio::select! {
            _ = shutdown.wait() => return Ok(()),
            item = outbound.recv() => match item {
                Some(text) => write_frame(sink, Message::Text(text), config.write_wait).await?,
                None => {
                    // Client closed and queue drained.
                    write_frame(sink, Message::Close(None), config.write_wait).await?;
                    return Ok(());
                }
            },
            _ = ticker.tick() => write_frame(sink, Message::Ping(Vec::new()), config.write_wait).await?,
        }
    }
}

async fn write_frame<W>(sink: &mut W, message: Message, wait: Duration) -> Result<(), PumpError>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    match tokio::time::timeout(wait, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(PumpError::Transport(e.to_string())),
        Err(_) => Err(PumpError::WriteDeadline(wait)),
    }
}

/// Close codes other than a normal close or the peer going away
fn is_unexpected_close(code: u16) -> bool {
    code != close_code::NORMAL && code != close_code::AWAY
}

fn read_error(detail: String) -> PumpError {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("without closing handshake") || lower.contains("connection reset") {
        PumpError::Reset(detail)
    } else {
        PumpError::Transport(detail)
    }
}

fn check_size(size: usize, config: &PumpConfig) -> Result<(), PumpError> {
    if size > config.max_message_size {
        return Err(PumpError::FrameTooLarge {
            size,
            limit: config.max_message_size,
        });
    }
    Ok(())
}

/// Collapse newlines to spaces and trim surrounding whitespace
pub fn normalize_frame(raw: &str) -> String {
    raw.replace('\n', " ").trim().to_string()
}
