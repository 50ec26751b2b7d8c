#![allow(clippy::float_cmp)]

use super::*;
use time::UtcOffset;

fn l(x0: f64, y0: f64, x1: f64, y1: f64) -> Line {
    Line::from_coords(x0, y0, x1, y1)
}

fn no_margin() -> SvgOptions {
    SvgOptions {
        margin: 0.0,
        ..SvgOptions::default()
    }
}

fn path_of(document: &str) -> &str {
    let start = document.find("<path d=\"").expect("path element") + "<path d=\"".len();
    let end = document[start..].find('"').expect("closing quote");
    &document[start..start + end]
}

// =============================================================================
// serialize
// =============================================================================

#[test]
fn fits_viewbox_centered_on_paper() {
    let lines = [l(0.0, 0.0, 100.0, 0.0), l(100.0, 0.0, 100.0, 100.0)];
    let vb = Viewbox::new(0.0, 0.0, 100.0, 100.0);
    let out = serialize(&lines, Fit::Viewbox(vb), Size::new(100.0, 100.0), &no_margin(), "T");

    assert_eq!(path_of(&out.document), "M -50 -50 L 50 -50 50 50");
    assert_eq!(out.stats.count, 2);
    assert_eq!(out.stats.travel_ink, 200.0);
    assert_eq!(out.stats.travel_blank, 0.0);
    assert!(out.document.contains(r#"tg:count="2" tg:travel="200" tg:travel_ink="200" tg:travel_blank="0""#));
}

#[test]
fn paper_attributes_and_centered_viewbox() {
    let out = serialize(&[], Fit::None, Size::new(420.0, 297.0), &SvgOptions::default(), "T");
    assert!(out.document.contains(r#"width="420mm""#));
    assert!(out.document.contains(r#"height="297mm""#));
    assert!(out.document.contains(r#"viewBox="-210 -148.5 420 297""#));
    assert!(out.document.contains(r#"stroke="black" fill="none" stroke-linecap="round""#));
    assert_eq!(path_of(&out.document), "");
    assert_eq!(out.stats.count, 0);
}

#[test]
fn clips_to_scaled_viewbox_not_paper() {
    // Paper is twice as wide as the source, so the right half of the line
    // would still be on paper but lies outside the scaled source region.
    let lines = [l(50.0, 50.0, 150.0, 50.0)];
    let vb = Viewbox::new(0.0, 0.0, 100.0, 100.0);
    let out = serialize(&lines, Fit::Viewbox(vb), Size::new(200.0, 100.0), &no_margin(), "T");
    assert_eq!(path_of(&out.document), "M 0 0 L 50 0");
}

#[test]
fn clipping_can_be_disabled() {
    let lines = [l(50.0, 50.0, 150.0, 50.0)];
    let vb = Viewbox::new(0.0, 0.0, 100.0, 100.0);
    let options = SvgOptions {
        clipping: false,
        ..no_margin()
    };
    let out = serialize(&lines, Fit::Viewbox(vb), Size::new(200.0, 100.0), &options, "T");
    assert_eq!(path_of(&out.document), "M 0 0 L 100 0");
}

#[test]
fn bounding_box_fit_uses_line_extent() {
    let lines = [l(10.0, 10.0, 30.0, 10.0), l(30.0, 10.0, 30.0, 50.0)];
    let out = serialize(&lines, Fit::BoundingBox, Size::new(100.0, 100.0), &no_margin(), "T");
    assert_eq!(path_of(&out.document), "M -25 -50 L 25 -50 25 50");
}

#[test]
fn disconnected_segments_start_new_subpaths() {
    let lines = [l(0.0, 0.0, 1.0, 0.0), l(2.0, 0.0, 3.0, 0.0)];
    let out = serialize(&lines, Fit::None, Size::new(10.0, 10.0), &SvgOptions::default(), "T");
    assert_eq!(path_of(&out.document), "M 0 0 L 1 0 M 2 0 L 3 0");
    assert_eq!(out.stats.travel_blank, 1.0);
}

#[test]
fn negative_zero_renders_as_zero() {
    let lines = [l(-0.0, 1.0, 2.0, -0.0)];
    let out = serialize(&lines, Fit::None, Size::new(10.0, 10.0), &SvgOptions::default(), "T");
    assert_eq!(path_of(&out.document), "M 0 1 L 2 0");
}

#[test]
fn coordinates_are_rounded_to_precision() {
    let lines = [l(0.123_45, 0.0, 1.0, 1.0)];
    let out = serialize(&lines, Fit::None, Size::new(10.0, 10.0), &SvgOptions::default(), "T");
    assert_eq!(path_of(&out.document), "M 0.123 0 L 1 1");
}

#[test]
fn short_segments_are_merged() {
    let lines = [
        l(0.0, 0.0, 0.5, 0.0),
        l(0.5, 0.0, 1.0, 0.0),
        l(1.0, 0.0, 1.5, 0.0),
        l(1.5, 0.0, 2.0, 0.0),
    ];
    let options = SvgOptions {
        min_line_length: 1.0,
        ..SvgOptions::default()
    };
    let out = serialize(&lines, Fit::None, Size::new(10.0, 10.0), &options, "T");
    assert_eq!(path_of(&out.document), "M 0 0 L 1 0 2 0");
    assert_eq!(out.stats.count, 2);
}

// =============================================================================
// header / digest
// =============================================================================

#[test]
fn header_names_producer_and_timestamp() {
    let out = serialize(&[], Fit::None, Size::new(10.0, 10.0), &SvgOptions::default(), "20240101_000000.000_UTC+0");
    let first = out.document.lines().next().expect("header");
    assert_eq!(
        first,
        format!("<!-- Created with tg-plot (v{VERSION}) at 20240101_000000.000_UTC+0 -->")
    );
    assert_eq!(out.timestamp, "20240101_000000.000_UTC+0");
}

#[test]
fn digest_covers_body_after_second_line() {
    let lines = [l(0.0, 0.0, 3.0, 4.0)];
    let out = serialize(&lines, Fit::None, Size::new(10.0, 10.0), &SvgOptions::default(), "T");
    let mut parts = out.document.splitn(3, '\n');
    parts.next();
    let digest_line = parts.next().expect("digest line");
    let body = parts.next().expect("body");

    assert_eq!(digest_line, format!("<!-- SHA-256 (after this line): {} -->", out.digest));
    assert_eq!(sha256_hex(body), out.digest);
    assert_eq!(out.digest.len(), 64);
    assert!(out.digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn digest_is_stable_across_timestamps() {
    let lines = [l(0.0, 0.0, 3.0, 4.0), l(3.0, 4.0, 6.0, 0.0)];
    let a = serialize(&lines, Fit::BoundingBox, Size::new(297.0, 210.0), &SvgOptions::default(), "A");
    let b = serialize(&lines, Fit::BoundingBox, Size::new(297.0, 210.0), &SvgOptions::default(), "B");
    assert_ne!(a.document, b.document);
    assert_eq!(a.digest, b.digest);
}

#[test]
fn digest_changes_with_content() {
    let a = serialize(&[l(0.0, 0.0, 1.0, 0.0)], Fit::None, Size::new(10.0, 10.0), &SvgOptions::default(), "T");
    let b = serialize(&[l(0.0, 0.0, 2.0, 0.0)], Fit::None, Size::new(10.0, 10.0), &SvgOptions::default(), "T");
    assert_ne!(a.digest, b.digest);
}

#[test]
fn known_sha256_vector() {
    assert_eq!(
        sha256_hex("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn file_name_uses_digest_prefix() {
    let out = serialize(&[], Fit::None, Size::new(10.0, 10.0), &SvgOptions::default(), "20240101_000000.000_UTC+0");
    assert_eq!(out.file_name(), format!("20240101_000000.000_UTC+0_{}.svg", &out.digest[..5]));
}

// =============================================================================
// timestamp
// =============================================================================

#[test]
fn timestamp_format_utc() {
    let at = OffsetDateTime::from_unix_timestamp(1_700_000_000)
        .expect("valid")
        .replace_millisecond(45)
        .expect("valid");
    assert_eq!(timestamp(at), "20231114_221320.045_UTC+0");
}

#[test]
fn timestamp_format_with_offset() {
    let at = OffsetDateTime::from_unix_timestamp(1_700_000_000)
        .expect("valid")
        .to_offset(UtcOffset::from_hms(2, 0, 0).expect("valid"));
    assert_eq!(timestamp(at), "20231115_001320.000_UTC+2");
}
