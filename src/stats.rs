//! Incremental line statistics.
//!
//! DESIGN
//! ======
//! New segments fold into the running totals in O(1). The out-of-bounds and
//! short counts depend on a reference frame (viewbox, scale) that changes far
//! less often than segments arrive, so a frame change only marks the
//! accumulator dirty; the next [`StatsAccumulator::update`] replays the stored
//! log once.
//!
//! `travel_total` is never accumulated on its own. It is derived from the ink
//! and blank sums whenever a record is read, so the two can never drift.

use serde::Serialize;
use tracing::warn;

use crate::consts::MIN_LINE_LENGTH_MM;
use crate::geometry::{Line, Point, Viewbox};

/// Derived statistics over a line sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LineStats {
    /// Segments folded in since the last reset.
    pub count: u64,
    /// Segments with an endpoint outside the reference viewbox.
    pub out_of_bounds_count: u64,
    /// Segments whose scaled length is below the drawable minimum.
    pub short_count: u64,
    pub travel_ink: f64,
    pub travel_blank: f64,
    pub travel_total: f64,
}

impl From<LineStats> for wire::JobStats {
    fn from(stats: LineStats) -> Self {
        Self {
            count: stats.count,
            out_of_bounds_count: stats.out_of_bounds_count,
            short_count: stats.short_count,
            travel_total: stats.travel_total,
            travel_ink: stats.travel_ink,
            travel_blank: stats.travel_blank,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    count: u64,
    out_of_bounds: u64,
    short: u64,
    ink: f64,
    blank: f64,
}

/// Running statistics plus the full line log they were built from.
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    lines: Vec<Line>,
    totals: Totals,
    previous_end: Option<Point>,
    viewbox: Option<Viewbox>,
    scale: Option<f64>,
    min_line_length: f64,
    dirty: bool,
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsAccumulator {
    /// Accumulator without a reference frame: no bounds or short checks,
    /// travel in source units.
    #[must_use]
    pub fn new() -> Self {
        Self::with_reference(None, None)
    }

    #[must_use]
    pub fn with_reference(viewbox: Option<Viewbox>, scale: Option<f64>) -> Self {
        Self {
            lines: Vec::new(),
            totals: Totals::default(),
            previous_end: None,
            viewbox,
            scale,
            min_line_length: MIN_LINE_LENGTH_MM,
            dirty: false,
        }
    }

    /// Override the drawable minimum (mm). Applies from the next fold on.
    #[must_use]
    pub fn with_min_line_length(mut self, min_line_length: f64) -> Self {
        self.min_line_length = min_line_length;
        self
    }

    /// Store `line` and fold it into the totals. Returns whether it was
    /// stored; a segment with a non-finite coordinate is logged and dropped.
    pub fn add_line(&mut self, line: Line) -> bool {
        if let Err(e) = line.validate() {
            warn!(error = %e, "stats: rejected segment");
            return false;
        }
        self.lines.push(line);
        self.fold(line);
        true
    }

    fn fold(&mut self, line: Line) {
        let mut blank = self.previous_end.map_or(0.0, |p| p.distance(line.start));
        let mut ink = line.length();
        if let Some(scale) = self.scale {
            blank *= scale;
            ink *= scale;
        }

        self.totals.count += 1;
        self.totals.ink += ink;
        self.totals.blank += blank;
        self.previous_end = Some(line.end);

        if let Some(viewbox) = self.viewbox {
            if !viewbox.contains(line.start) || !viewbox.contains(line.end) {
                self.totals.out_of_bounds += 1;
            }
        }
        if self.scale.is_some() && ink < self.min_line_length {
            self.totals.short += 1;
        }
    }

    /// Change the reference viewbox. Marks dirty only on a value change.
    pub fn set_viewbox(&mut self, viewbox: Option<Viewbox>) {
        if self.viewbox != viewbox {
            self.viewbox = viewbox;
            self.dirty = true;
        }
    }

    /// Change the reference scale. Marks dirty only on a value change.
    pub fn set_scale(&mut self, scale: Option<f64>) {
        if self.scale != scale {
            self.scale = scale;
            self.dirty = true;
        }
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuild from the stored log if the reference frame changed, then
    /// return the current record.
    pub fn update(&mut self) -> LineStats {
        if self.dirty {
            self.totals = Totals::default();
            self.previous_end = None;
            let lines = std::mem::take(&mut self.lines);
            for line in &lines {
                self.fold(*line);
            }
            self.lines = lines;
            self.dirty = false;
        }
        self.get()
    }

    /// Current record without rebuilding.
    #[must_use]
    pub fn get(&self) -> LineStats {
        LineStats {
            count: self.totals.count,
            out_of_bounds_count: self.totals.out_of_bounds,
            short_count: self.totals.short,
            travel_ink: self.totals.ink,
            travel_blank: self.totals.blank,
            travel_total: self.totals.ink + self.totals.blank,
        }
    }

    /// The stored line log, in drawing order.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Drop the log and zero the totals. The reference frame is kept.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.totals = Totals::default();
        self.previous_end = None;
        self.dirty = false;
    }
}

/// One-shot statistics over `lines`.
#[must_use]
pub fn line_stats(lines: &[Line], viewbox: Option<Viewbox>, scale: Option<f64>) -> LineStats {
    let mut acc = StatsAccumulator::with_reference(viewbox, scale);
    for line in lines.iter().filter(|line| line.validate().is_ok()) {
        acc.fold(*line);
    }
    acc.get()
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
