//! Session manager state machine.
//!
//! DESIGN
//! ======
//! Transitions are plain methods on [`Session`] that mutate its named fields
//! and return the [`Effect`]s the caller must carry out. The state machine
//! never touches a socket or a clock itself; `connection` owns all I/O and
//! feeds results back in (`handshake_succeeded`, `connection_closed`,
//! `timer_fired`, ...).
//!
//! LIFECYCLE
//! =========
//! `Disconnected -> Connecting -> Connected -> Disconnected ...`
//!
//! While waiting between retries the state is already `Connecting` but no
//! connection exists yet (`has_connection == false`).
//!
//! ERROR HANDLING
//! ==============
//! Transport failures are retried up to `retries` times (negative means
//! forever). A malformed address fails before any connection exists and is
//! never retried. Close events arriving while already disconnected are
//! ignored so a failure reported twice notifies once.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::consts::{ABNORMAL_CLOSE_CODE, NORMAL_CLOSE_CODES, WAITING_NOTICE_THRESHOLD_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Connection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// How long an unanswered attempt may stay open before it is aborted.
    pub connect_timeout: Duration,
    /// Pause between a failure and the next attempt.
    pub wait_before_reconnect: Duration,
    /// Retry limit; negative means unlimited.
    pub retries: i32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            wait_before_reconnect: Duration::from_secs(1),
            retries: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    ConnectTimeout,
    Reconnect,
}

/// Lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connecting { retry: u32 },
    Waiting { retry: u32 },
    Connected,
    Disconnected,
    Message(String),
    /// Abnormal closure. `code` is the WebSocket close code.
    Error { code: u16, reason: String },
}

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a fresh connection to the address.
    Open(String),
    /// Close the live connection gracefully, then report the closure.
    Close,
    /// Drop the live connection immediately. The closure is already handled.
    Abort,
    /// Arm `Timer`, replacing whatever timer was pending.
    ArmTimer(Timer, Duration),
    CancelTimer,
    /// Call [`Session::retry`] on the next tick.
    ScheduleRetry,
    Notify(SessionEvent),
}

/// One outbound session: state, retry bookkeeping and the pending timer.
#[derive(Debug, Clone)]
pub struct Session {
    options: SessionOptions,
    state: SessionState,
    retry_count: u32,
    stopping: bool,
    address: Option<String>,
    pending_timer: Option<Timer>,
    has_connection: bool,
}

impl Session {
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            state: SessionState::Disconnected,
            retry_count: 0,
            stopping: false,
            address: None,
            pending_timer: None,
            has_connection: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Only a connected session transmits; everything else is dropped.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.state == SessionState::Connected
    }

    // =========================================================================
    // CALLER OPERATIONS
    // =========================================================================

    /// Begin connecting to `address`. No-op unless disconnected.
    #[must_use]
    pub fn start(&mut self, address: &str) -> Vec<Effect> {
        if self.state != SessionState::Disconnected {
            debug!(state = ?self.state, "session: start ignored");
            return Vec::new();
        }
        self.address = Some(address.to_owned());
        self.retry_count = 0;
        self.stopping = false;
        self.connect()
    }

    /// Abort intentionally. No retry follows.
    #[must_use]
    pub fn stop(&mut self) -> Vec<Effect> {
        if self.state == SessionState::Disconnected {
            return Vec::new();
        }
        info!("session: stopping");
        self.stopping = true;
        let mut effects = self.cancel_timer();
        if self.has_connection {
            effects.push(Effect::Close);
        } else {
            self.state = SessionState::Disconnected;
            effects.push(Effect::Notify(SessionEvent::Disconnected));
        }
        effects
    }

    /// Start when disconnected, stop otherwise. The flag tells whether an
    /// attempt was just initiated.
    #[must_use]
    pub fn toggle(&mut self, address: &str) -> (bool, Vec<Effect>) {
        if self.state == SessionState::Disconnected {
            (true, self.start(address))
        } else {
            (false, self.stop())
        }
    }

    // =========================================================================
    // DRIVER FEEDBACK
    // =========================================================================

    #[must_use]
    pub fn handshake_succeeded(&mut self) -> Vec<Effect> {
        if self.state != SessionState::Connecting || !self.has_connection || self.stopping {
            return Vec::new();
        }
        let mut effects = self.cancel_timer();
        self.state = SessionState::Connected;
        self.retry_count = 0;
        info!(address = self.address.as_deref().unwrap_or_default(), "session: connected");
        effects.push(Effect::Notify(SessionEvent::Connected));
        effects
    }

    /// The live connection closed or failed.
    #[must_use]
    pub fn connection_closed(&mut self, code: u16, reason: &str) -> Vec<Effect> {
        if self.state == SessionState::Disconnected || !self.has_connection {
            return Vec::new();
        }
        self.has_connection = false;
        self.state = SessionState::Disconnected;
        let mut effects = self.cancel_timer();

        if self.stopping {
            info!(code, "session: disconnected");
            effects.push(Effect::Notify(SessionEvent::Disconnected));
            return effects;
        }

        if NORMAL_CLOSE_CODES.contains(&code) {
            info!(code, "session: connection closed by peer");
        } else {
            warn!(code, reason, "session: connection lost");
            effects.push(Effect::Notify(SessionEvent::Error {
                code,
                reason: reason.to_owned(),
            }));
        }
        effects.push(Effect::ScheduleRetry);
        effects
    }

    /// The connection could not even be constructed (malformed address).
    #[must_use]
    pub fn open_failed(&mut self, reason: &str) -> Vec<Effect> {
        if !self.has_connection {
            return Vec::new();
        }
        warn!(reason, "session: cannot open connection");
        self.has_connection = false;
        self.state = SessionState::Disconnected;
        let mut effects = self.cancel_timer();
        effects.push(Effect::Notify(SessionEvent::Disconnected));
        effects
    }

    /// Follow-up to [`Effect::ScheduleRetry`].
    #[must_use]
    pub fn retry(&mut self) -> Vec<Effect> {
        if self.state != SessionState::Disconnected || self.stopping {
            return Vec::new();
        }
        let exhausted = u32::try_from(self.options.retries).is_ok_and(|limit| self.retry_count >= limit);
        if exhausted {
            info!(retries = self.retry_count, "session: giving up");
            return vec![Effect::Notify(SessionEvent::Disconnected)];
        }

        self.retry_count += 1;
        self.state = SessionState::Connecting;
        let wait = self.options.wait_before_reconnect;
        let mut effects = Vec::new();
        if wait >= Duration::from_millis(WAITING_NOTICE_THRESHOLD_MS) {
            info!(retry = self.retry_count, wait = ?wait, "session: waiting to reconnect");
            effects.push(Effect::Notify(SessionEvent::Waiting { retry: self.retry_count }));
        }
        self.pending_timer = Some(Timer::Reconnect);
        effects.push(Effect::ArmTimer(Timer::Reconnect, wait));
        effects
    }

    /// A timer armed by [`Effect::ArmTimer`] elapsed. Stale timers are ignored.
    #[must_use]
    pub fn timer_fired(&mut self, timer: Timer) -> Vec<Effect> {
        if self.pending_timer != Some(timer) {
            return Vec::new();
        }
        self.pending_timer = None;
        match timer {
            Timer::ConnectTimeout => {
                if self.state != SessionState::Connecting || !self.has_connection {
                    return Vec::new();
                }
                warn!(timeout = ?self.options.connect_timeout, "session: connect timeout");
                let mut effects = vec![Effect::Abort];
                effects.extend(self.connection_closed(ABNORMAL_CLOSE_CODE, "connect timeout"));
                effects
            }
            Timer::Reconnect => {
                if self.state != SessionState::Connecting || self.has_connection || self.stopping {
                    return Vec::new();
                }
                self.connect()
            }
        }
    }

    /// Inbound text. Delivered only while connected.
    #[must_use]
    pub fn message_received(&self, text: String) -> Vec<Effect> {
        if self.state != SessionState::Connected {
            return Vec::new();
        }
        vec![Effect::Notify(SessionEvent::Message(text))]
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn connect(&mut self) -> Vec<Effect> {
        let address = self.address.clone().unwrap_or_default();
        self.state = SessionState::Connecting;
        self.has_connection = true;
        self.pending_timer = Some(Timer::ConnectTimeout);
        info!(retry = self.retry_count, %address, "session: connecting");
        vec![
            Effect::Notify(SessionEvent::Connecting { retry: self.retry_count }),
            Effect::ArmTimer(Timer::ConnectTimeout, self.options.connect_timeout),
            Effect::Open(address),
        ]
    }

    fn cancel_timer(&mut self) -> Vec<Effect> {
        match self.pending_timer.take() {
            Some(_) => vec![Effect::CancelTimer],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
