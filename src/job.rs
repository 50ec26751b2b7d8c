//! Job coordinator: outbound job control and the local job shadow.
//!
//! The shadow state is only ever moved by inbound worker messages, apart
//! from the reset on every connection change. Submitting or canceling sends
//! a message and waits for the worker to say what happened.
//!
//! A job submitted before the connection dropped cannot be followed across
//! the reconnect: the shadow resets and the job is reported as
//! [`JobOutcome::Lost`].

use tracing::{debug, info, warn};
use uuid::Uuid;
use wire::{Inbound, Outbound, PlotRequest, QueuePosition};

use crate::config::{ClientId, ConfigError, PaperFormat, Speed};
use crate::session::SessionEvent;
use crate::svg::Rendered;

/// Outbound text channel. [`crate::connection::SessionHandle`] is the real one.
pub trait Transport {
    /// Fire and forget. Dropped if the transport is not connected.
    fn send(&self, payload: String);
}

/// Local belief about this client's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    NotSubmitted,
    /// Number of jobs ahead; `0` is next to draw.
    Queued(u32),
    Drawing,
}

/// How the last job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    Canceled,
    /// The connection changed while the job was in flight.
    Lost,
}

/// What an inbound message changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    WorkerError(String),
    QueueLength(u64),
    State(JobState),
    Finished(JobOutcome),
}

pub struct JobCoordinator<T> {
    transport: T,
    client: Result<ClientId, ConfigError>,
    state: JobState,
    /// Set by a sent `plot`, cleared when the job finishes or is lost.
    in_flight: bool,
    queue_length: Option<u64>,
    last_outcome: Option<JobOutcome>,
    last_error: Option<String>,
}

impl<T: Transport> JobCoordinator<T> {
    pub fn new(transport: T, client_id: &str) -> Self {
        Self {
            transport,
            client: ClientId::parse(client_id),
            state: JobState::NotSubmitted,
            in_flight: false,
            queue_length: None,
            last_outcome: None,
            last_error: None,
        }
    }

    pub fn set_client_id(&mut self, client_id: &str) {
        self.client = ClientId::parse(client_id);
    }

    #[must_use]
    pub fn client_id(&self) -> Option<&ClientId> {
        self.client.as_ref().ok()
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    #[must_use]
    pub fn queue_length(&self) -> Option<u64> {
        self.queue_length
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<JobOutcome> {
        self.last_outcome
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Send a `plot` message for `rendered`. Returns whether anything was sent.
    ///
    /// No-op while a job is in flight or when the client id is invalid.
    pub fn submit(&mut self, rendered: &Rendered, format: PaperFormat, speed: Speed) -> bool {
        if self.state != JobState::NotSubmitted {
            debug!(state = ?self.state, "job: submit ignored, job in flight");
            return false;
        }
        let client = match &self.client {
            Ok(client) => client.as_str().to_owned(),
            Err(e) => {
                warn!(error = %e, "job: submit ignored");
                return false;
            }
        };
        let size = format.size();
        let request = PlotRequest {
            client,
            id: Uuid::new_v4().simple().to_string(),
            document: rendered.document.clone(),
            stats: rendered.stats.into(),
            timestamp: rendered.timestamp.clone(),
            digest: rendered.digest.clone(),
            speed: speed.get(),
            format: format.name().to_owned(),
            size: [size.width, size.height],
        };
        info!(id = %request.id, %format, speed = request.speed, count = request.stats.count, "job: submit");
        let sent = self.send(&Outbound::Plot(request));
        self.in_flight |= sent;
        sent
    }

    /// Ask the worker to cancel this client's job.
    pub fn cancel(&mut self) -> bool {
        let client = match &self.client {
            Ok(client) => client.as_str().to_owned(),
            Err(e) => {
                warn!(error = %e, "job: cancel ignored");
                return false;
            }
        };
        info!(%client, "job: cancel");
        self.send(&Outbound::Cancel { client })
    }

    /// Submit when idle, cancel otherwise.
    pub fn plot_or_cancel(&mut self, rendered: &Rendered, format: PaperFormat, speed: Speed) -> bool {
        if self.state == JobState::NotSubmitted {
            self.submit(rendered, format, speed)
        } else {
            self.cancel()
        }
    }

    fn send(&self, message: &Outbound) -> bool {
        match wire::encode_outbound(message) {
            Ok(payload) => {
                self.transport.send(payload);
                true
            }
            Err(e) => {
                warn!(error = %e, "job: cannot encode message");
                false
            }
        }
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Apply one inbound text message. Undecodable input is logged and ignored.
    pub fn handle_message(&mut self, text: &str) -> Option<JobEvent> {
        let message = match wire::decode_inbound(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "job: ignoring inbound message");
                return None;
            }
        };
        match message {
            Inbound::Error { msg } => {
                warn!(%msg, "job: plotter says");
                self.last_error = Some(msg.clone());
                Some(JobEvent::WorkerError(msg))
            }
            Inbound::QueueLength { length } => {
                self.queue_length = Some(length);
                Some(JobEvent::QueueLength(length))
            }
            Inbound::QueuePosition { position } => {
                let Some(position) = QueuePosition::from_raw(position) else {
                    warn!(position, "job: ignoring invalid queue position");
                    return None;
                };
                self.state = match position {
                    QueuePosition::Drawing => JobState::Drawing,
                    QueuePosition::Waiting(ahead) => JobState::Queued(ahead),
                };
                debug!(state = ?self.state, "job: position");
                Some(JobEvent::State(self.state))
            }
            Inbound::JobDone => Some(self.finish(JobOutcome::Done)),
            Inbound::JobCanceled => Some(self.finish(JobOutcome::Canceled)),
        }
    }

    /// Apply one session notification. Messages go to
    /// [`JobCoordinator::handle_message`]; connecting or disconnecting resets
    /// the shadow, finishing an in-flight job as [`JobOutcome::Lost`].
    pub fn handle_session_event(&mut self, event: &SessionEvent) -> Option<JobEvent> {
        match event {
            SessionEvent::Message(text) => self.handle_message(text),
            SessionEvent::Connected | SessionEvent::Disconnected => {
                let lost = self.in_flight;
                self.handle_disconnect();
                if lost {
                    warn!("job: connection changed with a job in flight");
                    Some(self.finish(JobOutcome::Lost))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Connection lost: nothing the worker said about our job still holds.
    pub fn handle_disconnect(&mut self) {
        self.state = JobState::NotSubmitted;
        self.in_flight = false;
        self.queue_length = None;
    }

    fn finish(&mut self, outcome: JobOutcome) -> JobEvent {
        info!(?outcome, "job: finished");
        self.state = JobState::NotSubmitted;
        self.in_flight = false;
        self.last_outcome = Some(outcome);
        JobEvent::Finished(outcome)
    }

    /// Short human-readable status for the current shadow state.
    #[must_use]
    pub fn status_line(&self) -> String {
        match (self.state, self.last_outcome) {
            (JobState::Queued(0), _) => "Ready to draw, load paper and pen!".to_owned(),
            (JobState::Queued(ahead), _) => format!("{ahead} before you..."),
            (JobState::Drawing, _) => "Drawing...".to_owned(),
            (JobState::NotSubmitted, Some(JobOutcome::Done)) => "Done".to_owned(),
            (JobState::NotSubmitted, Some(JobOutcome::Canceled)) => "Canceled".to_owned(),
            (JobState::NotSubmitted, Some(JobOutcome::Lost)) => "Connection lost, job state unknown".to_owned(),
            (JobState::NotSubmitted, None) => "-".to_owned(),
        }
    }
}

#[cfg(test)]
#[path = "job_test.rs"]
mod tests;
