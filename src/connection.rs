//! Tokio driver for the session state machine.
//!
//! DESIGN
//! ======
//! One spawned task owns the [`Session`], at most one WebSocket (or pending
//! handshake) and at most one timer. It waits in a `select!` on:
//! - caller commands from [`SessionHandle`]
//! - the connection (handshake result or next inbound frame)
//! - the pending timer
//!
//! Every wakeup is turned into a transition on the state machine, and the
//! returned effects are applied in order. Opening a new connection always
//! drops the previous handle first.
//!
//! Notifications go to a [`SessionHandler`]. An unbounded channel of
//! [`SessionEvent`]s is the usual handler.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Sleep, sleep, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::consts::{ABNORMAL_CLOSE_CODE, NO_STATUS_CLOSE_CODE};
use crate::job::Transport;
use crate::session::{Effect, Session, SessionEvent, SessionOptions, SessionState, Timer};

/// Upper bound on the closing handshake after an intentional stop.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Handshake = Pin<Box<dyn Future<Output = Result<WsStream, WsError>> + Send>>;

// =============================================================================
// HANDLER
// =============================================================================

/// Lifecycle callbacks. Every method defaults to doing nothing.
pub trait SessionHandler: Send + 'static {
    fn on_connecting(&mut self, _retry: u32) {}
    fn on_waiting(&mut self, _retry: u32) {}
    fn on_connected(&mut self) {}
    fn on_disconnected(&mut self) {}
    fn on_message(&mut self, _text: String) {}
    fn on_error(&mut self, _code: u16, _reason: &str) {}

    /// Route one notification to the matching callback.
    fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connecting { retry } => self.on_connecting(retry),
            SessionEvent::Waiting { retry } => self.on_waiting(retry),
            SessionEvent::Connected => self.on_connected(),
            SessionEvent::Disconnected => self.on_disconnected(),
            SessionEvent::Message(text) => self.on_message(text),
            SessionEvent::Error { code, reason } => self.on_error(code, &reason),
        }
    }
}

impl SessionHandler for mpsc::UnboundedSender<SessionEvent> {
    fn on_event(&mut self, event: SessionEvent) {
        let _ = self.send(event);
    }
}

// =============================================================================
// HANDLE
// =============================================================================

enum Command {
    Start(String),
    Stop,
    Toggle(String, oneshot::Sender<bool>),
    Send(String),
}

/// Cheap, cloneable control surface for a running session task.
///
/// Dropping the last handle stops the session and ends the task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn start(&self, address: impl Into<String>) {
        let _ = self.commands.send(Command::Start(address.into()));
    }

    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    /// Start when disconnected, stop otherwise. Resolves to whether an
    /// attempt was just initiated.
    pub async fn toggle(&self, address: impl Into<String>) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Toggle(address.into(), tx)).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Transmit if connected; dropped silently otherwise.
    pub fn send(&self, payload: impl Into<String>) {
        let _ = self.commands.send(Command::Send(payload.into()));
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the session reaches `target`. `false` if the task ended.
    pub async fn wait_for(&self, target: SessionState) -> bool {
        let mut state = self.state.clone();
        state.wait_for(|s| *s == target).await.is_ok()
    }
}

impl Transport for SessionHandle {
    fn send(&self, payload: String) {
        SessionHandle::send(self, payload);
    }
}

/// Spawn the session task on the current tokio runtime.
pub fn spawn<H: SessionHandler>(options: SessionOptions, handler: H) -> SessionHandle {
    let (commands, rx) = mpsc::unbounded_channel();
    let (state_tx, state) = watch::channel(SessionState::Disconnected);
    let driver = Driver {
        session: Session::new(options),
        handler,
        conn: Conn::Idle,
        timer: None,
        state_tx,
    };
    tokio::spawn(driver.run(rx));
    SessionHandle { commands, state }
}

// =============================================================================
// DRIVER
// =============================================================================

enum Conn {
    Idle,
    Handshake(Handshake),
    Open(WsStream),
}

enum ConnEvent {
    Handshake(Result<WsStream, WsError>),
    Inbound(Option<Result<Message, WsError>>),
}

struct Driver<H> {
    session: Session,
    handler: H,
    conn: Conn,
    timer: Option<(Timer, Pin<Box<Sleep>>)>,
    state_tx: watch::Sender<SessionState>,
}

impl<H: SessionHandler> Driver<H> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let effects = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.command(command).await,
                    None => break,
                },
                event = next_conn_event(&mut self.conn) => self.conn_event(event),
                timer = next_timer(&mut self.timer) => {
                    self.timer = None;
                    self.session.timer_fired(timer)
                }
            };
            self.apply(effects).await;
        }

        let effects = self.session.stop();
        self.apply(effects).await;
        debug!("session: driver finished");
    }

    async fn command(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Start(address) => self.session.start(&address),
            Command::Stop => self.session.stop(),
            Command::Toggle(address, reply) => {
                let (started, effects) = self.session.toggle(&address);
                let _ = reply.send(started);
                effects
            }
            Command::Send(payload) => self.send(payload).await,
        }
    }

    async fn send(&mut self, payload: String) -> Vec<Effect> {
        if !self.session.can_send() {
            debug!("session: not connected, dropping outbound message");
            return Vec::new();
        }
        let Conn::Open(ws) = &mut self.conn else {
            return Vec::new();
        };
        match ws.send(Message::Text(payload.into())).await {
            Ok(()) => Vec::new(),
            Err(e) => {
                self.conn = Conn::Idle;
                self.session.connection_closed(ABNORMAL_CLOSE_CODE, &e.to_string())
            }
        }
    }

    fn conn_event(&mut self, event: ConnEvent) -> Vec<Effect> {
        match event {
            ConnEvent::Handshake(Ok(ws)) => {
                self.conn = Conn::Open(ws);
                self.session.handshake_succeeded()
            }
            ConnEvent::Handshake(Err(e)) => {
                self.conn = Conn::Idle;
                self.session.connection_closed(ABNORMAL_CLOSE_CODE, &e.to_string())
            }
            ConnEvent::Inbound(Some(Ok(Message::Text(text)))) => {
                self.session.message_received(text.as_str().to_owned())
            }
            ConnEvent::Inbound(Some(Ok(Message::Close(frame)))) => {
                let (code, reason) = frame.map_or((NO_STATUS_CLOSE_CODE, String::new()), |f| {
                    (u16::from(f.code), f.reason.as_str().to_owned())
                });
                self.conn = Conn::Idle;
                self.session.connection_closed(code, &reason)
            }
            // Pings are answered by tungstenite; binary frames are not part of the protocol.
            ConnEvent::Inbound(Some(Ok(_))) => Vec::new(),
            ConnEvent::Inbound(Some(Err(e))) => {
                self.conn = Conn::Idle;
                self.session.connection_closed(ABNORMAL_CLOSE_CODE, &e.to_string())
            }
            ConnEvent::Inbound(None) => {
                self.conn = Conn::Idle;
                self.session.connection_closed(ABNORMAL_CLOSE_CODE, "connection ended")
            }
        }
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Open(address) => match client_request(&address) {
                    Ok(request) => {
                        // The handshake future is lazy: the old socket is gone before it is polled.
                        self.conn = Conn::Handshake(Box::pin(async move {
                            connect_async(request).await.map(|(ws, _)| ws)
                        }));
                    }
                    Err(reason) => queue.extend(self.session.open_failed(&reason)),
                },
                Effect::Close => {
                    if let Conn::Open(ws) = std::mem::replace(&mut self.conn, Conn::Idle) {
                        close_gracefully(ws).await;
                    }
                    queue.extend(self.session.connection_closed(1000, "closed by client"));
                }
                Effect::Abort => self.conn = Conn::Idle,
                Effect::ArmTimer(timer, after) => self.timer = Some((timer, Box::pin(sleep(after)))),
                Effect::CancelTimer => self.timer = None,
                Effect::ScheduleRetry => {
                    tokio::task::yield_now().await;
                    queue.extend(self.session.retry());
                }
                Effect::Notify(event) => self.handler.on_event(event),
            }
        }
        self.state_tx.send_replace(self.session.state());
    }
}

/// Upgrade request for `address`. Only `ws` and `wss` URLs are accepted;
/// anything else could never complete a handshake.
fn client_request(address: &str) -> Result<Request, String> {
    let request = address.into_client_request().map_err(|e| e.to_string())?;
    match request.uri().scheme_str() {
        Some("ws" | "wss") => Ok(request),
        other => Err(format!("unsupported URL scheme: {}", other.unwrap_or("none"))),
    }
}

async fn next_conn_event(conn: &mut Conn) -> ConnEvent {
    match conn {
        Conn::Idle => std::future::pending().await,
        Conn::Handshake(handshake) => ConnEvent::Handshake(handshake.as_mut().await),
        Conn::Open(ws) => ConnEvent::Inbound(ws.next().await),
    }
}

async fn next_timer(timer: &mut Option<(Timer, Pin<Box<Sleep>>)>) -> Timer {
    match timer {
        Some((kind, delay)) => {
            delay.as_mut().await;
            *kind
        }
        None => std::future::pending().await,
    }
}

async fn close_gracefully(mut ws: WsStream) {
    let closing = async {
        ws.close(None).await?;
        while let Some(frame) = ws.next().await {
            frame?;
        }
        Ok::<(), WsError>(())
    };
    match timeout(CLOSE_TIMEOUT, closing).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "session: close handshake failed"),
        Err(_) => debug!("session: close handshake timed out"),
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
