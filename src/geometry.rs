//! Points, segments, and the pure transforms that fit a drawing onto paper.
//!
//! Everything here is stateless. Source coordinates are client pixels;
//! after [`apply_scale`] they are millimeters in a frame centered on the
//! paper.

use serde_json::Value;

/// Rejected input at the geometry boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    /// A coordinate was NaN or infinite.
    #[error("coordinate {index} is not finite ({value})")]
    NonFinite { index: usize, value: f64 },
    /// The value does not have any accepted segment or point shape.
    #[error("unrecognized shape: {0}")]
    Shape(String),
}

/// A point in client pixels or paper millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A straight segment, in drawing order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    #[must_use]
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn from_coords(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(Point::new(x0, y0), Point::new(x1, y1))
    }

    /// Build a segment, rejecting non-finite coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::NonFinite`] naming the first bad coordinate.
    pub fn checked(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, InputError> {
        let line = Self::from_coords(x0, y0, x1, y1);
        line.validate()?;
        Ok(line)
    }

    /// Fails with [`InputError::NonFinite`] for the first NaN or infinite
    /// coordinate, in `x0, y0, x1, y1` order.
    pub fn validate(&self) -> Result<(), InputError> {
        for (index, value) in self.coords().into_iter().enumerate() {
            if !value.is_finite() {
                return Err(InputError::NonFinite { index, value });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    #[must_use]
    pub fn coords(&self) -> [f64; 4] {
        [self.start.x, self.start.y, self.end.x, self.end.y]
    }

    /// Apply `f` to both endpoints.
    #[must_use]
    pub fn map(self, f: impl Fn(Point) -> Point) -> Self {
        Self::new(f(self.start), f(self.end))
    }
}

/// Physical size in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned region `(x, y, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewbox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewbox {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Corner form used by the clipper.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect {
            xmin: self.x,
            ymin: self.y,
            xmax: self.x + self.width,
            ymax: self.y + self.height,
        }
    }

    /// Edges count as inside.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let r = self.bounds();
        p.x >= r.xmin && p.x <= r.xmax && p.y >= r.ymin && p.y <= r.ymax
    }
}

/// Axis-aligned rectangle in corner form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Rect {
    #[must_use]
    pub fn rounded(self, precision: Option<u8>) -> Self {
        Self {
            xmin: round_opt(self.xmin, precision),
            ymin: round_opt(self.ymin, precision),
            xmax: round_opt(self.xmax, precision),
            ymax: round_opt(self.ymax, precision),
        }
    }
}

/// Uniform scale plus the center it is applied around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleArgs {
    pub sx: f64,
    pub sy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl ScaleArgs {
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.sx * (p.x - self.cx), self.sy * (p.y - self.cy))
    }
}

/// Fit `viewbox` into `target` keeping its aspect ratio, shrunk by `margin`.
///
/// Both axes get the same factor; the viewbox center maps to the origin.
#[must_use]
pub fn fit_scale(viewbox: &Viewbox, target: Size, margin: f64) -> ScaleArgs {
    let scale = (target.width / viewbox.width).min(target.height / viewbox.height) * (1.0 - margin);
    let center = viewbox.center();
    ScaleArgs {
        sx: scale,
        sy: scale,
        cx: center.x,
        cy: center.y,
    }
}

/// Map every endpoint `(x, y)` to `(sx * (x - cx), sy * (y - cy))`.
#[must_use]
pub fn apply_scale(lines: &[Line], args: ScaleArgs) -> Vec<Line> {
    lines.iter().map(|line| line.map(|p| args.apply(p))).collect()
}

/// The viewbox itself after [`fit_scale`], i.e. the drawable region on paper.
#[must_use]
pub fn scale_viewbox(viewbox: &Viewbox, target: Size, margin: f64) -> Viewbox {
    let args = fit_scale(viewbox, target, margin);
    let top_left = args.apply(Point::new(viewbox.x, viewbox.y));
    let bottom_right = args.apply(Point::new(viewbox.x + viewbox.width, viewbox.y + viewbox.height));
    Viewbox::new(
        top_left.x,
        top_left.y,
        bottom_right.x - top_left.x,
        bottom_right.y - top_left.y,
    )
}

/// Smallest viewbox containing every endpoint, `None` for no lines.
#[must_use]
pub fn bounding_box(lines: &[Line]) -> Option<Viewbox> {
    let first = lines.first()?;
    let mut r = Rect {
        xmin: first.start.x,
        ymin: first.start.y,
        xmax: first.start.x,
        ymax: first.start.y,
    };
    for p in lines.iter().flat_map(|line| [line.start, line.end]) {
        r.xmin = r.xmin.min(p.x);
        r.ymin = r.ymin.min(p.y);
        r.xmax = r.xmax.max(p.x);
        r.ymax = r.ymax.max(p.y);
    }
    Some(Viewbox::new(r.xmin, r.ymin, r.xmax - r.xmin, r.ymax - r.ymin))
}

/// Round to `precision` decimals. Whole numbers pass through untouched.
#[must_use]
// Exact test: a zero fraction means there is nothing to round.
#[allow(clippy::float_cmp)]
pub fn round_to(value: f64, precision: u8) -> f64 {
    if value.fract() == 0.0 {
        return value;
    }
    let factor = 10_f64.powi(i32::from(precision));
    ((value + f64::EPSILON) * factor).round() / factor
}

fn round_opt(value: f64, precision: Option<u8>) -> f64 {
    precision.map_or(value, |p| round_to(value, p))
}

/// Round both endpoints; `None` disables rounding.
#[must_use]
pub fn round_line(line: Line, precision: Option<u8>) -> Line {
    line.map(|p| Point::new(round_opt(p.x, precision), round_opt(p.y, precision)))
}

/// Merge runs of short segments so every emitted segment is at least
/// `min_length` long.
///
/// Length accumulates along a stroke from its running start point. Once it
/// reaches `min_length` one segment from that start to the current end is
/// emitted. A segment whose start differs from the previous end begins a new
/// stroke and discards whatever had accumulated.
#[must_use]
pub fn merge_short(lines: &[Line], min_length: f64) -> Vec<Line> {
    let Some(first) = lines.first() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut start = first.start;
    let mut end: Option<Point> = None;
    let mut accumulated = 0.0;

    for line in lines {
        if end != Some(line.start) {
            start = line.start;
            accumulated = 0.0;
        }
        accumulated += line.length();
        end = Some(line.end);

        if accumulated >= min_length {
            out.push(Line::new(start, line.end));
            start = line.end;
            accumulated = 0.0;
        }
    }
    out
}

// =============================================================================
// BOUNDARY NORMALIZATION
// =============================================================================

/// Normalize a JSON segment into a [`Line`].
///
/// Accepted shapes:
/// - `[x0, y0, x1, y1]`
/// - `[p0, p1]` where each point is `[x, y]` or `{"x": .., "y": ..}`
/// - `{"x0": .., "y0": .., "x1": .., "y1": ..}`
/// - `{"start": p0, "end": p1}`
///
/// # Errors
///
/// Returns [`InputError::Shape`] for anything else, and
/// [`InputError::NonFinite`] for coordinates that overflow to infinity.
pub fn parse_line(value: &Value) -> Result<Line, InputError> {
    let [x0, y0, x1, y1] = match value {
        Value::Array(items) if items.len() == 4 => [
            number(&items[0])?,
            number(&items[1])?,
            number(&items[2])?,
            number(&items[3])?,
        ],
        Value::Array(items) if items.len() == 2 => {
            let a = parse_point(&items[0])?;
            let b = parse_point(&items[1])?;
            [a.x, a.y, b.x, b.y]
        }
        Value::Object(map) if map.contains_key("x0") => [
            number(field(map, "x0")?)?,
            number(field(map, "y0")?)?,
            number(field(map, "x1")?)?,
            number(field(map, "y1")?)?,
        ],
        Value::Object(map) if map.contains_key("start") => {
            let a = parse_point(field(map, "start")?)?;
            let b = parse_point(field(map, "end")?)?;
            [a.x, a.y, b.x, b.y]
        }
        other => return Err(InputError::Shape(format!("expected a segment, got {other}"))),
    };
    Line::checked(x0, y0, x1, y1)
}

fn parse_point(value: &Value) -> Result<Point, InputError> {
    match value {
        Value::Array(items) if items.len() == 2 => Ok(Point::new(number(&items[0])?, number(&items[1])?)),
        Value::Object(map) => Ok(Point::new(number(field(map, "x")?)?, number(field(map, "y")?)?)),
        other => Err(InputError::Shape(format!("expected a point, got {other}"))),
    }
}

fn field<'a>(map: &'a serde_json::Map<String, Value>, key: &str) -> Result<&'a Value, InputError> {
    map.get(key)
        .ok_or_else(|| InputError::Shape(format!("missing field `{key}`")))
}

fn number(value: &Value) -> Result<f64, InputError> {
    value
        .as_f64()
        .ok_or_else(|| InputError::Shape(format!("expected a number, got {value}")))
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod tests;
