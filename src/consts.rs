//! Shared numeric constants for the plotter client.

// ── Geometry ────────────────────────────────────────────────────

/// Decimal places kept on coordinates. Rounding avoids float jitter that
/// would otherwise split strokes at shared endpoints.
pub const PRECISION: u8 = 3;

/// Shortest segment the pen mechanism draws reliably, in mm.
pub const MIN_LINE_LENGTH_MM: f64 = 0.1;

/// Fraction of the paper left blank around the drawing (scale = 1 - margin).
pub const MARGIN: f64 = 0.05;

// ── Session ─────────────────────────────────────────────────────

/// Close codes that count as a normal shutdown (no error notification).
pub const NORMAL_CLOSE_CODES: [u16; 2] = [1000, 1001];

/// Close code reported for transport failures without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Close code reported when a close frame carried no status.
pub const NO_STATUS_CLOSE_CODE: u16 = 1005;

/// Waits shorter than this reconnect silently (no waiting notification).
pub const WAITING_NOTICE_THRESHOLD_MS: u64 = 1_000;

// ── Jobs ────────────────────────────────────────────────────────

pub const MIN_SPEED: u8 = 10;
pub const MAX_SPEED: u8 = 100;
