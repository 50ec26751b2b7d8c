//! Cohen–Sutherland segment clipping against an axis-aligned rectangle.
//!
//! Outcode bits name the violated boundary: "top" is `y > ymax`, "bottom"
//! is `y < ymin`.
//!
//! When an outside endpoint violates two boundaries the intersection is taken
//! in the fixed order top, bottom, right, left so results are deterministic.

use crate::geometry::{Line, Point, Rect};

const INSIDE: u8 = 0b0000;
const LEFT: u8 = 0b0001;
const RIGHT: u8 = 0b0010;
const BOTTOM: u8 = 0b0100;
const TOP: u8 = 0b1000;

fn outcode(p: Point, r: &Rect) -> u8 {
    let mut code = INSIDE;
    if p.x < r.xmin {
        code |= LEFT;
    } else if p.x > r.xmax {
        code |= RIGHT;
    }
    if p.y < r.ymin {
        code |= BOTTOM;
    } else if p.y > r.ymax {
        code |= TOP;
    }
    code
}

/// Clip `line` to `rect`. Returns `None` when nothing of it is inside.
#[must_use]
pub fn clip(line: Line, rect: &Rect) -> Option<Line> {
    let Line { start: mut p0, end: mut p1 } = line;
    let mut code0 = outcode(p0, rect);
    let mut code1 = outcode(p1, rect);

    loop {
        if code0 | code1 == INSIDE {
            return Some(Line::new(p0, p1));
        }
        if code0 & code1 != INSIDE {
            return None;
        }

        // At least one endpoint is outside; move it onto the nearest violated edge.
        let code_out = code0.max(code1);
        let p = if code_out & TOP != 0 {
            Point::new(p0.x + (p1.x - p0.x) * (rect.ymax - p0.y) / (p1.y - p0.y), rect.ymax)
        } else if code_out & BOTTOM != 0 {
            Point::new(p0.x + (p1.x - p0.x) * (rect.ymin - p0.y) / (p1.y - p0.y), rect.ymin)
        } else if code_out & RIGHT != 0 {
            Point::new(rect.xmax, p0.y + (p1.y - p0.y) * (rect.xmax - p0.x) / (p1.x - p0.x))
        } else {
            Point::new(rect.xmin, p0.y + (p1.y - p0.y) * (rect.xmin - p0.x) / (p1.x - p0.x))
        };

        if code_out == code0 {
            p0 = p;
            code0 = outcode(p0, rect);
        } else {
            p1 = p;
            code1 = outcode(p1, rect);
        }
    }
}

/// Clip every segment, dropping the rejected ones. Order is preserved.
#[must_use]
pub fn clip_all(lines: &[Line], rect: &Rect) -> Vec<Line> {
    lines.iter().filter_map(|line| clip(*line, rect)).collect()
}

#[cfg(test)]
#[path = "clip_test.rs"]
mod tests;
