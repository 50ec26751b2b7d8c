//! Client configuration: paper presets, identity, speed, and the
//! environment-driven loader.
//!
//! Every loader has a `from_lookup` form taking a key -> value closure;
//! `from_env` is that form over `std::env::var`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::consts::{MAX_SPEED, MIN_SPEED};
use crate::geometry::Size;
use crate::session::SessionOptions;

const DEFAULT_SERVER_URL: &str = "wss://plotter.eu.ngrok.io";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_WAIT_BEFORE_RECONNECT_MS: u64 = 10_000;
const DEFAULT_RETRIES: i32 = -1;

const CLIENT_ID_MIN_LEN: usize = 3;
const CLIENT_ID_MAX_LEN: usize = 10;
const RANDOM_CLIENT_ID_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown paper format: {0}")]
    UnknownFormat(String),
    #[error("client id must be 3-10 letters, digits or underscores: {0:?}")]
    InvalidClientId(String),
    #[error("speed must be an integer between 10 and 100: {0}")]
    SpeedOutOfRange(String),
}

// =============================================================================
// PAPER FORMAT
// =============================================================================

/// Paper presets the plotter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperFormat {
    #[default]
    A3Landscape,
    A3Portrait,
    A4Landscape,
    A4Portrait,
}

impl PaperFormat {
    pub const ALL: [PaperFormat; 4] = [
        PaperFormat::A3Landscape,
        PaperFormat::A3Portrait,
        PaperFormat::A4Landscape,
        PaperFormat::A4Portrait,
    ];

    /// Preset name as sent in the `format` field.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::A3Landscape => "A3 Landscape",
            Self::A3Portrait => "A3 Portrait",
            Self::A4Landscape => "A4 Landscape",
            Self::A4Portrait => "A4 Portrait",
        }
    }

    /// Physical size in millimeters.
    #[must_use]
    pub fn size(self) -> Size {
        match self {
            Self::A3Landscape => Size::new(420.0, 297.0),
            Self::A3Portrait => Size::new(297.0, 420.0),
            Self::A4Landscape => Size::new(297.0, 210.0),
            Self::A4Portrait => Size::new(210.0, 297.0),
        }
    }
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaperFormat {
    type Err = ConfigError;

    /// Case-insensitive; `-` and `_` may stand in for the space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c })
            .collect();
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ConfigError::UnknownFormat(s.to_owned()))
    }
}

// =============================================================================
// CLIENT ID
// =============================================================================

/// Validated client identifier: 3-10 ASCII word characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidClientId`] for the wrong length or any
    /// character outside `[A-Za-z0-9_]`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let valid = (CLIENT_ID_MIN_LEN..=CLIENT_ID_MAX_LEN).contains(&raw.len())
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(ConfigError::InvalidClientId(raw.to_owned()))
        }
    }

    /// Four random uppercase letters.
    #[must_use]
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self(
            (0..RANDOM_CLIENT_ID_LEN)
                .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
                .collect(),
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClientId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// SPEED
// =============================================================================

/// Drawing speed as a percentage of nominal, always within 10-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed(u8);

impl Default for Speed {
    fn default() -> Self {
        Self(MAX_SPEED)
    }
}

impl Speed {
    /// Clamp into range.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(i64::from(MIN_SPEED), i64::from(MAX_SPEED));
        Self(u8::try_from(clamped).unwrap_or(MAX_SPEED))
    }

    /// Forgiving parse: non-numeric input means full speed, numbers clamp.
    #[must_use]
    pub fn lenient(raw: &str) -> Self {
        raw.trim().parse::<i64>().map_or_else(|_| Self::default(), Self::clamped)
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl FromStr for Speed {
    type Err = ConfigError;

    /// Strict parse: must be an integer within range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u8>() {
            Ok(value) if (MIN_SPEED..=MAX_SPEED).contains(&value) => Ok(Self(value)),
            _ => Err(ConfigError::SpeedOutOfRange(s.to_owned())),
        }
    }
}

// =============================================================================
// LOADER
// =============================================================================

/// Everything the client needs to connect and submit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotterConfig {
    pub server_url: String,
    /// Raw identifier; validated when a job is submitted.
    pub client_id: String,
    pub format: PaperFormat,
    pub speed: Speed,
    pub session: SessionOptions,
}

impl PlotterConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset keys fall back to defaults; unparseable values are logged and
    /// fall back too.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("TG_PLOT_FORMAT") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "config: using default paper format");
                PaperFormat::default()
            }),
            None => PaperFormat::default(),
        };
        Self {
            server_url: lookup("TG_PLOT_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_owned()),
            client_id: lookup("TG_PLOT_CLIENT_ID").unwrap_or_else(|| ClientId::random().to_string()),
            format,
            speed: lookup("TG_PLOT_SPEED").map_or_else(Speed::default, |raw| Speed::lenient(&raw)),
            session: session_options_from_lookup(&lookup),
        }
    }
}

/// Session policy for the command-line client: patient and unlimited.
#[must_use]
pub fn session_options_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SessionOptions {
    let connect_timeout_ms = lookup_parse(&lookup, "TG_PLOT_CONNECT_TIMEOUT_MS", DEFAULT_CONNECT_TIMEOUT_MS);
    let wait_ms = lookup_parse(&lookup, "TG_PLOT_WAIT_BEFORE_RECONNECT_MS", DEFAULT_WAIT_BEFORE_RECONNECT_MS);
    SessionOptions {
        connect_timeout: Duration::from_millis(connect_timeout_ms),
        wait_before_reconnect: Duration::from_millis(wait_ms),
        retries: lookup_parse(&lookup, "TG_PLOT_RETRIES", DEFAULT_RETRIES),
    }
}

fn lookup_parse<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    lookup(key).and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
