//! Connection sessions and their relay tasks.
//!
//! A session moves through validate → upgrade → subscribe → relay.
//! While relaying, three duties run concurrently under one
//! cancellation scope: the reader (client → bus, with the liveness
//! deadline), the writer (the only task allowed to touch the sink
//! half; drains the outbound queue and sends liveness probes), and a
//! drain task per subscription (bus → outbound queue). The first duty
//! to stop tears the whole session down.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use sockbus_bus::{Bus, ReleaseHandle, Subscription};
use sockbus_core::{ClientFrame, Message, TopicSet};
use sockbus_settings::SocketSettings;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval, timeout, timeout_at, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A connect request was missing required parameters. Surfaced as a
/// 400 before any upgrade or backend call happens.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientInputError {
    #[error("username cannot be empty")]
    MissingUsername,
    #[error("topics cannot be empty")]
    MissingTopics,
}

/// Validated connection parameters.
#[derive(Clone, Debug)]
pub struct SessionRequest {
    pub username: String,
    pub topics: TopicSet,
}

impl SessionRequest {
    /// Validate the `username` and `topics` query parameters.
    pub fn from_query(
        username: Option<&str>,
        topics: Option<&str>,
    ) -> Result<Self, ClientInputError> {
        let username = username.unwrap_or("").trim();
        if username.is_empty() {
            return Err(ClientInputError::MissingUsername);
        }
        let topics = TopicSet::parse(topics.unwrap_or(""))
            .map_err(|_| ClientInputError::MissingTopics)?;
        Ok(Self {
            username: username.to_string(),
            topics,
        })
    }
}

/// Tunnels WebSocket connections onto the shared bus driver. One
/// instance serves every connection; per-connection state lives in
/// the session it spawns.
pub struct SocketGateway {
    bus: Arc<dyn Bus>,
    settings: SocketSettings,
}

impl SocketGateway {
    pub fn new(bus: Arc<dyn Bus>, settings: SocketSettings) -> Self {
        Self { bus, settings }
    }

    /// Drive one upgraded connection to completion. Subscribes to the
    /// requested topics, relays until a terminal condition, then tears
    /// everything down in order.
    pub async fn run_session(&self, socket: WebSocket, request: SessionRequest) {
        let subscription = match self.bus.subscribe(&request.topics).await {
            Ok(sub) => sub,
            Err(e) => {
                // Too late for an HTTP status now that the upgrade
                // happened; close the transport instead.
                tracing::warn!(
                    username = %request.username,
                    topics = %request.topics,
                    error = %e,
                    kind = e.error_kind(),
                    "subscribe failed, closing connection"
                );
                let mut socket = socket;
                let _ = socket.send(WsMessage::Close(None)).await;
                return;
            }
        };

        tracing::info!(
            username = %request.username,
            topics = %request.topics,
            "session active"
        );
        self.relay(socket, &request, vec![subscription]).await;
        tracing::info!(username = %request.username, "session closed");
    }

    async fn relay(&self, socket: WebSocket, request: &SessionRequest, subs: Vec<Subscription>) {
        let (ws_tx, ws_rx) = socket.split();
        let session = Session::new(request, &subs);
        let (out_tx, out_rx) = mpsc::channel::<WsMessage>(self.settings.send_queue);

        let mut tasks = JoinSet::new();
        tasks.spawn(write_loop(
            ws_tx,
            out_rx,
            self.settings.clone(),
            session.token.clone(),
            session.username.clone(),
        ));
        for sub in subs {
            tasks.spawn(drain_loop(sub, out_tx.clone(), session.token.clone()));
        }
        drop(out_tx);
        tasks.spawn(read_loop(
            ws_rx,
            Arc::clone(&self.bus),
            self.settings.clone(),
            session.token.clone(),
            session.username.clone(),
        ));

        // Whichever duty stops first (read error, write error, or
        // liveness expiry) begins teardown; the rest are told to stop
        // rather than left running.
        tasks.join_next().await;
        session.shutdown();
        while tasks.join_next().await.is_some() {}
    }
}

/// Per-connection state: the cancellation scope every relay task is
/// tied to, plus release handles for the session's subscriptions.
struct Session {
    username: String,
    token: CancellationToken,
    releases: Vec<ReleaseHandle>,
}

impl Session {
    fn new(request: &SessionRequest, subs: &[Subscription]) -> Self {
        Self {
            username: request.username.clone(),
            token: CancellationToken::new(),
            releases: subs.iter().map(Subscription::release_handle).collect(),
        }
    }

    /// Stop every relay task and release every subscription. Safe to
    /// call any number of times; a second teardown trigger must not
    /// double-release anything.
    fn shutdown(&self) {
        self.token.cancel();
        for release in &self.releases {
            release.release();
        }
        tracing::debug!(username = %self.username, "session torn down");
    }
}

/// Reader duty: blocking receive loop on the transport under the
/// liveness deadline. Malformed input never terminates the session;
/// only a transport error, deadline expiry, a close frame, or
/// cancellation does.
async fn read_loop(
    mut ws_rx: SplitStream<WebSocket>,
    bus: Arc<dyn Bus>,
    settings: SocketSettings,
    token: CancellationToken,
    username: String,
) {
    let pong_wait = settings.pong_wait();
    let mut deadline = Instant::now() + pong_wait;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = timeout_at(deadline, ws_rx.next()) => {
                let frame = match next {
                    Err(_) => {
                        tracing::warn!(username = %username, "liveness deadline elapsed");
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        tracing::debug!(username = %username, error = %e, "transport read error");
                        break;
                    }
                    Ok(Some(Ok(frame))) => frame,
                };
                match frame {
                    WsMessage::Pong(_) => {
                        deadline = Instant::now() + pong_wait;
                        tracing::trace!(username = %username, "pong received");
                    }
                    // axum answers pings with pongs on its own.
                    WsMessage::Ping(_) => {}
                    WsMessage::Close(_) => break,
                    WsMessage::Text(text) => {
                        publish_frame(bus.as_ref(), &username, text.as_bytes(), &settings).await;
                    }
                    WsMessage::Binary(data) => {
                        publish_frame(bus.as_ref(), &username, &data, &settings).await;
                    }
                }
            }
        }
    }
}

/// Decode and publish one inbound frame. Every failure mode here is
/// non-fatal: oversized and malformed frames are dropped, publish
/// errors are recorded as delivery failures.
async fn publish_frame(bus: &dyn Bus, username: &str, raw: &[u8], settings: &SocketSettings) {
    if raw.len() > settings.read_limit_bytes {
        tracing::warn!(
            username = %username,
            len = raw.len(),
            limit = settings.read_limit_bytes,
            "frame exceeds read limit, dropped"
        );
        return;
    }
    let frame = match ClientFrame::decode(raw) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(username = %username, error = %e, "malformed client frame dropped");
            return;
        }
    };
    tracing::debug!(username = %username, topic = %frame.topic, "message received from client");
    if let Err(e) = bus
        .publish(&frame.topic, Bytes::from(frame.body.into_bytes()))
        .await
    {
        // Best-effort delivery: no acknowledgment channel exists back
        // to the client, so this is observed and dropped.
        tracing::warn!(
            username = %username,
            topic = %frame.topic,
            error = %e,
            kind = e.error_kind(),
            "delivery failed"
        );
    }
}

/// Writer duty: the single serialization point for the transport's
/// sink half. Drains the outbound queue and owns the liveness prober;
/// nothing else may write to the connection.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, WsMessage>,
    mut out_rx: mpsc::Receiver<WsMessage>,
    settings: SocketSettings,
    token: CancellationToken,
    username: String,
) {
    let mut ping = interval(settings.ping_interval());
    ping.tick().await; // consume the immediate first tick
    let write_wait = settings.write_wait();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            maybe = out_rx.recv() => match maybe {
                Some(frame) => {
                    if send_with_deadline(&mut ws_tx, frame, write_wait, &username).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = ping.tick() => {
                if send_with_deadline(&mut ws_tx, WsMessage::Ping(Bytes::new()), write_wait, &username)
                    .await
                    .is_err()
                {
                    break;
                }
                tracing::trace!(username = %username, "ping sent");
            }
        }
    }

    // Best-effort close frame; dropping both halves closes the stream.
    let _ = ws_tx.send(WsMessage::Close(None)).await;
}

async fn send_with_deadline(
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
    frame: WsMessage,
    write_wait: Duration,
    username: &str,
) -> Result<(), ()> {
    match timeout(write_wait, ws_tx.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::debug!(username = %username, error = %e, "transport write error");
            Err(())
        }
        Err(_) => {
            tracing::warn!(username = %username, "write deadline elapsed");
            Err(())
        }
    }
}

/// Drain duty: forward each delivered message into the outbound
/// queue. Ends when the subscription channel closes, the writer goes
/// away, or the session is cancelled.
async fn drain_loop(
    mut sub: Subscription,
    out_tx: mpsc::Sender<WsMessage>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            maybe = sub.recv() => match maybe {
                Some(msg) => {
                    tracing::debug!(topic = %msg.topic, "message received from bus");
                    if out_tx.send(outbound_frame(msg)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

/// The client receives exactly the published payload, no envelope.
/// UTF-8 payloads go out as text frames, anything else as binary.
fn outbound_frame(msg: Message) -> WsMessage {
    match Utf8Bytes::try_from(msg.payload.clone()) {
        Ok(text) => WsMessage::Text(text),
        Err(_) => WsMessage::Binary(msg.payload),
    }
}
