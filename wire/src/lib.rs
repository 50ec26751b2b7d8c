//! Job protocol spoken between plotter clients and the plotter worker.
//!
//! This crate owns the wire representation used by both sides of the
//! connection. Messages travel as JSON text frames tagged by a `type` field;
//! unknown fields are ignored so the worker can grow its messages without
//! breaking older clients.

use serde::{Deserialize, Serialize};

/// Error returned by the encode/decode functions.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The message could not be rendered as JSON.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    /// The text is not valid JSON or carries an unknown `type`.
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Drawing statistics attached to a plot job.
///
/// Field names on the wire follow the worker's established vocabulary
/// (`oob_count`, `travel`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    /// Number of segments in the document.
    pub count: u64,
    /// Segments with at least one endpoint outside the reference viewbox.
    #[serde(rename = "oob_count")]
    pub out_of_bounds_count: u64,
    /// Segments shorter than the minimum drawable length.
    pub short_count: u64,
    /// Ink plus blank travel.
    #[serde(rename = "travel")]
    pub travel_total: f64,
    /// Pen-down travel.
    pub travel_ink: f64,
    /// Pen-up travel.
    pub travel_blank: f64,
}

/// Job submission payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotRequest {
    /// User-chosen client identifier.
    pub client: String,
    /// Unique id of this submission.
    pub id: String,
    /// Serialized vector document.
    pub document: String,
    pub stats: JobStats,
    /// Capture timestamp embedded in the document header.
    pub timestamp: String,
    /// Hex digest of the document body.
    pub digest: String,
    /// Drawing speed as a percentage of nominal speed (10-100).
    pub speed: u8,
    /// Paper preset name, e.g. `"A3 Landscape"`.
    pub format: String,
    /// Paper size in millimeters, `[width, height]`.
    pub size: [f64; 2],
}

/// Client to worker messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Submit a job.
    Plot(PlotRequest),
    /// Cancel the sender's queued or running job.
    Cancel { client: String },
}

/// Worker to client messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Worker-reported problem. Shown to the user, not fatal.
    Error { msg: String },
    /// Total queue depth.
    QueueLength { length: u64 },
    /// This client's position; see [`QueuePosition::from_raw`].
    QueuePosition { position: i64 },
    JobDone,
    JobCanceled,
}

/// Interpreted `queue_position` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueuePosition {
    /// The job is being drawn right now (`-1` on the wire).
    Drawing,
    /// Number of jobs ahead; `0` means next to draw.
    Waiting(u32),
}

impl QueuePosition {
    /// Map the raw wire integer. Values below `-1` or beyond `u32` are
    /// meaningless and yield `None`.
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            -1 => Some(Self::Drawing),
            n => u32::try_from(n).ok().map(Self::Waiting),
        }
    }

    /// Convert back into the wire integer.
    #[must_use]
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Drawing => -1,
            Self::Waiting(n) => i64::from(n),
        }
    }
}

/// Encode a client message as JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails (non-finite stats).
pub fn encode_outbound(message: &Outbound) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(CodecError::Encode)
}

/// Decode a client message. Used on the worker side.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON or an unknown `type`.
pub fn decode_outbound(text: &str) -> Result<Outbound, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}

/// Encode a worker message as JSON text. Used on the worker side.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_inbound(message: &Inbound) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(CodecError::Encode)
}

/// Decode a worker message.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON or an unknown `type`.
pub fn decode_inbound(text: &str) -> Result<Inbound, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
