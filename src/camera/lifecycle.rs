//! Camera socket lifecycle.
//!
//! `StreamSession` owns the state machine (Idle → Connecting → Streaming →
//! Closing → Idle), the stream counters and the ingest pipeline. Socket IO
//! runs in a separate task per connection and talks to the session only
//! through channels, so all session state is mutated from the one task that
//! drives it (the UI loop or a test).

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, trace, warn};

use crate::protocol::{ClientCommand, DeviceNotice};

use super::frame::{FrameBuffer, Surface};
use super::ingest::Ingest;
use super::pacer::{self, Phase};
use super::stats::{StatsSnapshot, StreamStats};
use super::{Affordances, ConnectionState};

/// Messages from the session to its socket task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// What a socket task reports back
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Opened,
    Frame(Vec<u8>),
    Text(String),
    Closed,
    Error(String),
}

/// A socket event tagged with the connection it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEvent {
    pub conn: u64,
    pub event: SocketEvent,
}

/// Opens camera sockets. Implementations must report every connection's end
/// with exactly one `Closed` or `Error` event.
pub trait Connector {
    fn open(
        &self,
        conn: u64,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> mpsc::UnboundedSender<Outbound>;
}

/// WebSocket connector for `ws(s)://<host>/ws/camera`
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl Connector for WsConnector {
    fn open(
        &self,
        conn: u64,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> mpsc::UnboundedSender<Outbound> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(self.url.clone(), conn, events, outbound_rx));
        outbound_tx
    }
}

async fn run_socket(
    url: String,
    conn: u64,
    events: mpsc::UnboundedSender<LinkEvent>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let emit = |event: SocketEvent| {
        let _ = events.send(LinkEvent { conn, event });
    };

    debug!(conn, %url, "opening camera socket");
    let ws_stream = tokio::select! {
        res = connect_async(url.as_str()) => match res {
            Ok((ws, _)) => ws,
            Err(e) => {
                emit(SocketEvent::Error(format!("connect failed: {}", e)));
                return;
            }
        },
        _ = close_requested(&mut outbound) => {
            debug!(conn, "closed before the socket opened");
            emit(SocketEvent::Closed);
            return;
        }
    };
    emit(SocketEvent::Opened);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(Ok(WsMessage::Binary(data))) => emit(SocketEvent::Frame(data)),
                Some(Ok(WsMessage::Text(text))) => emit(SocketEvent::Text(text)),
                Some(Ok(WsMessage::Close(_))) | None => {
                    emit(SocketEvent::Closed);
                    return;
                }
                // Ping/pong is answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(SocketEvent::Error(e.to_string()));
                    return;
                }
            },
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = ws_sender.send(WsMessage::Text(text)).await {
                        emit(SocketEvent::Error(format!("send failed: {}", e)));
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = ws_sender.send(WsMessage::Close(None)).await;
                    let _ = ws_sender.close().await;
                    emit(SocketEvent::Closed);
                    return;
                }
            }
        }
    }
}

/// Resolves once the session asks for closure (or goes away)
async fn close_requested(outbound: &mut mpsc::UnboundedReceiver<Outbound>) {
    loop {
        match outbound.recv().await {
            // Nothing is sent before the socket is open; drop it if it is
            Some(Outbound::Text(_)) => continue,
            Some(Outbound::Close) | None => return,
        }
    }
}

struct Link {
    conn: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
}

pub struct StreamSession<S: Surface, C: Connector = WsConnector> {
    connector: C,
    interval: Duration,
    state: ConnectionState,
    phase_tx: watch::Sender<Phase>,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
    events_rx: mpsc::UnboundedReceiver<LinkEvent>,
    link: Option<Link>,
    next_conn: u64,
    stats: StreamStats,
    ingest: Ingest<S>,
    last_error: Option<String>,
}

impl<S: Surface, C: Connector> StreamSession<S, C> {
    pub fn new(connector: C, surface: S, interval: Duration) -> Self {
        let (phase_tx, _) = watch::channel(Phase::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            interval,
            state: ConnectionState::Idle,
            phase_tx,
            events_tx,
            events_rx,
            link: None,
            next_conn: 0,
            stats: StreamStats::new(Instant::now()),
            ingest: Ingest::new(surface),
            last_error: None,
        }
    }

    /// Open a socket unless one is already connecting or streaming.
    /// Returns whether a connection attempt was started.
    pub fn start(&mut self) -> bool {
        if self.state.is_active() {
            debug!(state = ?self.state, "start ignored, stream already active");
            return false;
        }

        // A socket still closing from a previous stop is detached; its late
        // events no longer match the current connection id.
        if let Some(old) = self.link.take() {
            let _ = old.outbound.send(Outbound::Close);
        }

        self.next_conn += 1;
        let conn = self.next_conn;
        let outbound = self.connector.open(conn, self.events_tx.clone());
        self.link = Some(Link { conn, outbound });
        self.last_error = None;
        self.set_state(ConnectionState::Connecting);
        info!(conn, "connecting to camera");
        true
    }

    /// Request closure. Idempotent; does nothing when idle or already closing.
    pub fn stop(&mut self) {
        if !self.state.is_active() {
            return;
        }
        self.set_state(ConnectionState::Closing);
        self.stats.reset(Instant::now());
        self.ingest.release();
        if let Some(link) = &self.link {
            info!(conn = link.conn, "closing camera stream");
            let _ = link.outbound.send(Outbound::Close);
        }
    }

    /// Send a ping command; only meaningful while streaming
    pub fn ping(&mut self) -> bool {
        if self.state != ConnectionState::Streaming {
            return false;
        }
        match &self.link {
            Some(link) => link.outbound.send(Outbound::Text(ClientCommand::Ping.to_json())).is_ok(),
            None => false,
        }
    }

    /// Apply every event already queued, without waiting.
    /// Returns the device notices seen along the way.
    pub fn pump(&mut self) -> Vec<DeviceNotice> {
        let mut notices = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(notice) = self.handle_event_at(event, Instant::now()) {
                notices.push(notice);
            }
        }
        notices
    }

    /// Wait for the next socket event and apply it
    pub async fn step(&mut self) -> Option<DeviceNotice> {
        let event = self.events_rx.recv().await?;
        self.handle_event_at(event, Instant::now())
    }

    pub fn handle_event_at(&mut self, event: LinkEvent, now: Instant) -> Option<DeviceNotice> {
        if self.current_conn() != Some(event.conn) {
            trace!(conn = event.conn, "ignoring event from a detached socket");
            return None;
        }

        match event.event {
            SocketEvent::Opened => match self.state {
                ConnectionState::Connecting => {
                    self.set_state(ConnectionState::Streaming);
                    self.stats.reset(now);
                    let phase = self.phase_tx.subscribe();
                    let interval = self.interval;
                    if let Some(link) = &self.link {
                        info!(conn = link.conn, "camera stream open");
                        pacer::spawn(link.conn, interval, phase, link.outbound.clone());
                    }
                }
                ConnectionState::Closing => trace!("socket opened after stop, ignoring"),
                other => warn!(state = ?other, "unexpected socket open"),
            },
            SocketEvent::Frame(payload) => {
                if self.state == ConnectionState::Streaming {
                    self.ingest.on_binary(&payload, &mut self.stats, now);
                } else {
                    trace!(state = ?self.state, bytes = payload.len(), "frame outside streaming dropped");
                }
            }
            SocketEvent::Text(text) => return self.ingest.on_text(&text),
            SocketEvent::Closed => self.disconnect(None, now),
            SocketEvent::Error(reason) => self.disconnect(Some(reason), now),
        }
        None
    }

    fn disconnect(&mut self, reason: Option<String>, now: Instant) {
        // The pacer sees the phase change on its next tick
        self.link = None;
        self.set_state(ConnectionState::Idle);
        self.stats.reset(now);
        self.ingest.release();
        match &reason {
            Some(reason) => warn!(%reason, "camera socket failed"),
            None => info!("camera socket closed"),
        }
        self.last_error = reason;
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "camera state");
        }
        self.state = next;
        let conn = self.current_conn().unwrap_or(0);
        self.phase_tx.send_replace(Phase { state: next, conn });
    }

    fn current_conn(&self) -> Option<u64> {
        self.link.as_ref().map(|l| l.conn)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn affordances(&self) -> Affordances {
        self.state.affordances()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fresh counters; rolls the window when it is due
    pub fn stats(&mut self) -> StatsSnapshot {
        self.stats_at(Instant::now())
    }

    pub fn stats_at(&mut self, now: Instant) -> StatsSnapshot {
        self.stats.snapshot(now)
    }

    pub fn frames(&self) -> &FrameBuffer<S> {
        self.ingest.frames()
    }

    pub fn frames_mut(&mut self) -> &mut FrameBuffer<S> {
        self.ingest.frames_mut()
    }

    pub fn ingest(&self) -> &Ingest<S> {
        &self.ingest
    }
}
