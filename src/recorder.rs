//! Recorder: the client-side facade a drawing routine talks to.
//!
//! The host feeds segments in through [`Recorder::add_line`] and is queried
//! for its current drawing area through [`Viewport`]. Everything else
//! (stats, paper fitting, the serialized document) is derived here.

use serde_json::Value;
use tracing::warn;

use crate::config::PaperFormat;
use crate::geometry::{InputError, Line, Viewbox, fit_scale, parse_line, round_line};
use crate::stats::{LineStats, StatsAccumulator};
use crate::svg::{Fit, Rendered, SvgOptions, serialize};

/// Source of the host's drawing area, in client pixels.
pub trait Viewport {
    fn viewbox(&self) -> Option<Viewbox>;
}

/// A fixed area, or none at all.
impl Viewport for Option<Viewbox> {
    fn viewbox(&self) -> Option<Viewbox> {
        *self
    }
}

/// Result of offering a segment to the recorder.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Recorded,
    /// Recording is paused; the segment was dropped.
    NotRecording,
    Rejected(InputError),
}

pub struct Recorder<V> {
    viewport: V,
    stats: StatsAccumulator,
    recording: bool,
    format: PaperFormat,
    options: SvgOptions,
}

impl<V: Viewport> Recorder<V> {
    /// Recording starts enabled.
    pub fn new(viewport: V, format: PaperFormat) -> Self {
        Self::with_options(viewport, format, SvgOptions::default())
    }

    pub fn with_options(viewport: V, format: PaperFormat, options: SvgOptions) -> Self {
        let mut recorder = Self {
            viewport,
            stats: StatsAccumulator::new().with_min_line_length(options.min_line_length),
            recording: true,
            format,
            options,
        };
        recorder.sync_reference();
        recorder.stats.update();
        recorder
    }

    /// The inbound callback: one segment in client pixels.
    pub fn add_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) -> LineOutcome {
        if !self.recording {
            return LineOutcome::NotRecording;
        }
        match Line::checked(x0, y0, x1, y1) {
            Ok(line) => self.record_line(line),
            Err(e) => {
                warn!(error = %e, "recorder: rejected segment");
                LineOutcome::Rejected(e)
            }
        }
    }

    /// Like [`Recorder::add_line`] for a segment in any accepted JSON shape.
    pub fn add_value(&mut self, value: &Value) -> LineOutcome {
        if !self.recording {
            return LineOutcome::NotRecording;
        }
        match parse_line(value) {
            Ok(line) => self.record_line(line),
            Err(e) => {
                warn!(error = %e, "recorder: rejected segment");
                LineOutcome::Rejected(e)
            }
        }
    }

    fn record_line(&mut self, line: Line) -> LineOutcome {
        self.stats.add_line(round_line(line, self.options.precision));
        LineOutcome::Recorded
    }

    /// Drop every recorded segment. The recording switch is unchanged.
    pub fn clear(&mut self) {
        self.stats.reset();
        self.sync_reference();
    }

    pub fn record(&mut self, on: bool) {
        self.recording = on;
    }

    pub fn stop(&mut self) {
        self.recording = false;
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    #[must_use]
    pub fn lines(&self) -> &[Line] {
        self.stats.lines()
    }

    /// Stats against the current viewport and paper. Rebuilds only when
    /// either changed since the last call.
    pub fn stats(&mut self) -> LineStats {
        self.sync_reference();
        self.stats.update()
    }

    #[must_use]
    pub fn format(&self) -> PaperFormat {
        self.format
    }

    pub fn set_format(&mut self, format: PaperFormat) {
        self.format = format;
    }

    /// Pixels to millimeters for the current viewport and paper; `1.0`
    /// without a viewport.
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        self.viewport.viewbox().map_or(1.0, |viewbox| {
            fit_scale(&viewbox, self.format.size(), self.options.margin).sx
        })
    }

    /// Serialize the recorded lines onto the selected paper. `None` when
    /// nothing was recorded.
    ///
    /// Without a viewport the drawing is fitted by its own bounding box.
    #[must_use]
    pub fn render(&self, timestamp: &str) -> Option<Rendered> {
        if self.lines().is_empty() {
            return None;
        }
        let fit = self.viewport.viewbox().map_or(Fit::BoundingBox, Fit::Viewbox);
        Some(serialize(self.lines(), fit, self.format.size(), &self.options, timestamp))
    }

    /// Stop recording and render what was recorded.
    pub fn plot(&mut self, timestamp: &str) -> Option<Rendered> {
        self.stop();
        self.render(timestamp)
    }

    fn sync_reference(&mut self) {
        let viewbox = self.viewport.viewbox();
        self.stats.set_viewbox(viewbox);
        self.stats.set_scale(Some(self.scale_factor()));
    }
}

#[cfg(test)]
#[path = "recorder_test.rs"]
mod tests;
