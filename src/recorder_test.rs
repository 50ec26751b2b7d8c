#![allow(clippy::float_cmp)]

use super::*;
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct SharedViewport(Rc<Cell<Option<Viewbox>>>);

impl Viewport for SharedViewport {
    fn viewbox(&self) -> Option<Viewbox> {
        self.0.get()
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn square(size: f64) -> Option<Viewbox> {
    Some(Viewbox::new(0.0, 0.0, size, size))
}

// --- recording switch ---

#[test]
fn records_by_default() {
    let mut rec = Recorder::new(None, PaperFormat::default());
    assert!(rec.is_recording());
    assert_eq!(rec.add_line(0.0, 0.0, 1.0, 1.0), LineOutcome::Recorded);
    assert_eq!(rec.lines().len(), 1);
}

#[test]
fn paused_recorder_drops_segments() {
    let mut rec = Recorder::new(None, PaperFormat::default());
    rec.stop();
    assert_eq!(rec.add_line(0.0, 0.0, 1.0, 1.0), LineOutcome::NotRecording);
    assert!(rec.lines().is_empty());

    rec.record(true);
    assert_eq!(rec.add_line(0.0, 0.0, 1.0, 1.0), LineOutcome::Recorded);
    rec.record(false);
    assert!(!rec.is_recording());
}

#[test]
fn non_finite_segment_is_rejected() {
    let mut rec = Recorder::new(None, PaperFormat::default());
    let outcome = rec.add_line(0.0, f64::NAN, 1.0, 1.0);
    assert!(matches!(outcome, LineOutcome::Rejected(InputError::NonFinite { index: 1, .. })));
    assert!(rec.lines().is_empty());
}

#[test]
fn segments_are_rounded_on_entry() {
    let mut rec = Recorder::new(None, PaperFormat::default());
    rec.add_line(0.123_45, 1.0, 2.0, 3.987_65);
    assert_eq!(rec.lines()[0], Line::from_coords(0.123, 1.0, 2.0, 3.988));
}

#[test]
fn json_segments_in_any_shape() {
    let mut rec = Recorder::new(None, PaperFormat::default());
    assert_eq!(rec.add_value(&json!([0, 0, 1, 1])), LineOutcome::Recorded);
    assert_eq!(rec.add_value(&json!({"start": [1, 1], "end": {"x": 2, "y": 2}})), LineOutcome::Recorded);
    assert!(matches!(rec.add_value(&json!("nope")), LineOutcome::Rejected(InputError::Shape(_))));
    assert_eq!(rec.lines().len(), 2);
}

#[test]
fn clear_keeps_recording_switch() {
    let mut rec = Recorder::new(None, PaperFormat::default());
    rec.add_line(0.0, 0.0, 1.0, 1.0);
    rec.stop();
    rec.clear();
    assert!(rec.lines().is_empty());
    assert!(!rec.is_recording());
    assert_eq!(rec.stats(), LineStats::default());
}

// --- scale / stats ---

#[test]
fn scale_factor_without_viewport_is_one() {
    let rec = Recorder::new(None, PaperFormat::default());
    assert_eq!(rec.scale_factor(), 1.0);
}

#[test]
fn scale_factor_fits_viewport_onto_paper() {
    let rec = Recorder::new(square(100.0), PaperFormat::A3Landscape);
    // min(420 / 100, 297 / 100) * 0.95
    assert!(approx(rec.scale_factor(), 2.97 * 0.95));
}

#[test]
fn stats_are_in_paper_millimeters() {
    let mut rec = Recorder::new(square(100.0), PaperFormat::A4Portrait);
    rec.add_line(0.0, 0.0, 10.0, 0.0);
    let stats = rec.stats();
    assert_eq!(stats.count, 1);
    assert!(approx(stats.travel_ink, 10.0 * 2.1 * 0.95));
}

#[test]
fn format_change_rescales_without_duplicating_lines() {
    let mut rec = Recorder::new(square(100.0), PaperFormat::A4Portrait);
    rec.add_line(0.0, 0.0, 10.0, 0.0);
    rec.add_line(10.0, 0.0, 10.0, 10.0);
    rec.stats();

    rec.set_format(PaperFormat::A3Landscape);
    let stats = rec.stats();
    assert_eq!(stats.count, 2);
    assert_eq!(rec.lines().len(), 2);
    assert!(approx(stats.travel_ink, 20.0 * 2.97 * 0.95));
    assert_eq!(stats.travel_total, stats.travel_ink + stats.travel_blank);
}

#[test]
fn viewport_change_recounts_out_of_bounds() {
    let viewport = SharedViewport::default();
    viewport.0.set(square(100.0));
    let mut rec = Recorder::new(viewport.clone(), PaperFormat::default());
    rec.add_line(90.0, 10.0, 110.0, 10.0);
    assert_eq!(rec.stats().out_of_bounds_count, 1);

    viewport.0.set(Some(Viewbox::new(0.0, 0.0, 200.0, 100.0)));
    assert_eq!(rec.stats().out_of_bounds_count, 0);
}

// --- render ---

#[test]
fn render_of_empty_log_is_none() {
    let rec = Recorder::new(square(10.0), PaperFormat::default());
    assert!(rec.render("T").is_none());
}

#[test]
fn render_fits_viewport_onto_selected_paper() {
    let mut rec = Recorder::new(square(100.0), PaperFormat::A4Landscape);
    rec.add_line(0.0, 0.0, 100.0, 100.0);
    let out = rec.render("20240101_000000.000_UTC+0").expect("lines were recorded");
    assert!(out.document.contains(r#"width="297mm""#));
    assert!(out.document.contains(r#"height="210mm""#));
    assert_eq!(out.stats.count, 1);
    assert_eq!(out.digest.len(), 64);
    assert_eq!(out.timestamp, "20240101_000000.000_UTC+0");
}

#[test]
fn render_without_viewport_fits_bounding_box() {
    let mut rec = Recorder::new(None, PaperFormat::A3Landscape);
    rec.add_line(1000.0, 1000.0, 1100.0, 1000.0);
    let out = rec.render("T").expect("lines were recorded");
    // 100 px wide fills 95% of 420 mm
    assert!(approx(out.stats.travel_ink, 399.0));
}

#[test]
fn plot_stops_recording_and_renders() {
    let mut rec = Recorder::new(square(10.0), PaperFormat::default());
    rec.add_line(1.0, 1.0, 9.0, 9.0);
    assert!(rec.plot("T").is_some());
    assert!(!rec.is_recording());
}
