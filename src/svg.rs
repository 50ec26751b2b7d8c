//! Image serializer: turn a recorded line log into a print-ready SVG.
//!
//! PIPELINE
//! ========
//! fit to paper -> round -> clip to the scaled viewbox -> merge short
//! segments -> stats -> path data -> document -> digest + header.
//!
//! The digest covers the document body only. The header comment carrying the
//! timestamp is prepended afterwards, so identical drawings hash identically
//! whenever they were captured.

use std::fmt::{self, Write};

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::clip::clip_all;
use crate::consts::{MARGIN, MIN_LINE_LENGTH_MM, PRECISION};
use crate::geometry::{Line, Point, Size, Viewbox, apply_scale, bounding_box, fit_scale, merge_short, round_line, scale_viewbox};
use crate::stats::{LineStats, line_stats};

/// Producer version written into the header comment.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How source coordinates are mapped onto the paper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fit {
    /// Coordinates are already in paper millimeters.
    None,
    /// Fit this source region (client pixels) onto the paper.
    Viewbox(Viewbox),
    /// Fit the bounding box of the lines themselves.
    BoundingBox,
}

/// Serializer switches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgOptions {
    /// Decimal places kept on coordinates; `None` keeps full precision.
    pub precision: Option<u8>,
    /// Clip to the scaled source viewbox (not the paper).
    pub clipping: bool,
    /// Minimum segment length in mm; `0` disables merging.
    pub min_line_length: f64,
    /// Blank fraction around the drawing.
    pub margin: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            precision: Some(PRECISION),
            clipping: true,
            min_line_length: MIN_LINE_LENGTH_MM,
            margin: MARGIN,
        }
    }
}

/// A serialized document together with what was computed on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub document: String,
    /// Stats over the final (scaled, clipped, merged) lines.
    pub stats: LineStats,
    pub timestamp: String,
    /// Lowercase hex SHA-256 of the document body.
    pub digest: String,
}

impl Rendered {
    /// Suggested file name: `<timestamp>_<digest prefix>.svg`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let prefix = self.digest.get(..5).unwrap_or(&self.digest);
        format!("{}_{prefix}.svg", self.timestamp)
    }
}

/// Serialize `lines` onto paper of size `target`.
#[must_use]
pub fn serialize(lines: &[Line], fit: Fit, target: Size, options: &SvgOptions, timestamp: &str) -> Rendered {
    let source = match fit {
        Fit::None => None,
        Fit::Viewbox(viewbox) => Some(viewbox),
        Fit::BoundingBox => bounding_box(lines).filter(|vb| vb.width > 0.0 || vb.height > 0.0),
    };

    let mut out = match source {
        Some(viewbox) => apply_scale(lines, fit_scale(&viewbox, target, options.margin)),
        None => lines.to_vec(),
    };
    out = out
        .into_iter()
        .map(|line| round_line(line, options.precision))
        .collect();

    if options.clipping {
        if let Some(viewbox) = source {
            let bounds = scale_viewbox(&viewbox, target, options.margin)
                .bounds()
                .rounded(options.precision);
            out = clip_all(&out, &bounds);
        }
    }
    if options.min_line_length > 0.0 {
        out = merge_short(&out, options.min_line_length);
    }

    let stats = line_stats(&out, None, None);
    let body = document_body(&path_data(&out), target, &stats);
    let digest = sha256_hex(&body);
    let document = format!(
        "<!-- Created with tg-plot (v{VERSION}) at {timestamp} -->\n<!-- SHA-256 (after this line): {digest} -->\n{body}"
    );

    Rendered {
        document,
        stats,
        timestamp: timestamp.to_owned(),
        digest,
    }
}

/// Path `d` attribute. A segment continuing from the previous end extends the
/// current subpath; any other segment starts a new one with `M`.
#[must_use]
pub fn path_data(lines: &[Line]) -> String {
    let mut d = String::new();
    let mut current: Option<Point> = None;
    for line in lines {
        if current == Some(line.start) {
            let _ = write!(d, "{} {} ", Num(line.end.x), Num(line.end.y));
        } else {
            let _ = write!(
                d,
                "M {} {} L {} {} ",
                Num(line.start.x),
                Num(line.start.y),
                Num(line.end.x),
                Num(line.end.y)
            );
        }
        current = Some(line.end);
    }
    d.truncate(d.trim_end().len());
    d
}

fn document_body(d: &str, target: Size, stats: &LineStats) -> String {
    let count = stats.count;
    let travel = stats.travel_total.trunc();
    let ink = stats.travel_ink.trunc();
    let blank = travel - ink;
    let (w, h) = (target.width, target.height);
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg"
     xmlns:tg="https://sketch.process.studio/turtle-graphics"
     tg:count="{count}" tg:travel="{travel}" tg:travel_ink="{ink}" tg:travel_blank="{blank}"
     width="{w}mm"
     height="{h}mm"
     viewBox="{vx} {vy} {w} {h}"
     stroke="black" fill="none" stroke-linecap="round">
    <path d="{d}" />
</svg>"#,
        travel = Num(travel),
        ink = Num(ink),
        blank = Num(blank),
        w = Num(w),
        h = Num(h),
        vx = Num(-w / 2.0),
        vy = Num(-h / 2.0),
    )
}

/// Shortest round-trip decimal, with negative zero printed as `0`.
struct Num(f64);

impl fmt::Display for Num {
    // Exact zero test: only `0.0` and `-0.0` get the bare `0`.
    #[allow(clippy::float_cmp)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            f.write_str("0")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

/// Capture timestamp, `YYYYMMDD_HHMMSS.mmm_UTC±H`.
#[must_use]
pub fn timestamp(at: OffsetDateTime) -> String {
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}.{:03}_UTC{:+}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.millisecond(),
        at.offset().whole_hours(),
    )
}

/// Timestamp for "now", in UTC.
#[must_use]
pub fn now_timestamp() -> String {
    timestamp(OffsetDateTime::now_utc())
}

#[cfg(test)]
#[path = "svg_test.rs"]
mod tests;
