//! Exact geometric predicates on integer coordinates.
//!
//! Every predicate here is computed in integer arithmetic with 128-bit
//! intermediate products, so results are exact over the whole `i64`
//! coordinate range. The single place floating point appears is
//! [`intersect_point`], which rounds a rational intersection to the nearest
//! integer grid point (ties away from zero).

use crate::primitives::{Path64, Point64};

/// Result of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Points turn counter-clockwise (positive cross product).
    CounterClockwise,
    /// Points turn clockwise (negative cross product).
    Clockwise,
    /// Points are exactly collinear.
    Collinear,
}

/// Result of a point-in-polygon test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointInPolygonResult {
    /// The point is strictly inside the polygon.
    Inside,
    /// The point is strictly outside the polygon.
    Outside,
    /// The point lies on the polygon boundary.
    OnEdge,
}

/// Computes the cross product of vectors `(b - a)` and `(c - a)`.
///
/// This equals twice the signed area of triangle `abc`. The widening to
/// 128 bits makes the result exact for any `i64` inputs.
#[inline]
pub fn cross_product(a: Point64, b: Point64, c: Point64) -> i128 {
    let abx = (b.x - a.x) as i128;
    let aby = (b.y - a.y) as i128;
    let acx = (c.x - a.x) as i128;
    let acy = (c.y - a.y) as i128;
    abx * acy - aby * acx
}

/// Computes the dot product of vectors `(b - a)` and `(c - b)`.
///
/// Negative when the path `a -> b -> c` reverses direction by more than 90
/// degrees; for collinear points this distinguishes a spike (negative) from
/// a straight continuation (positive).
#[inline]
pub fn dot_product(a: Point64, b: Point64, c: Point64) -> i128 {
    let abx = (b.x - a.x) as i128;
    let aby = (b.y - a.y) as i128;
    let bcx = (c.x - b.x) as i128;
    let bcy = (c.y - b.y) as i128;
    abx * bcx + aby * bcy
}

/// Computes the orientation of three points.
#[inline]
pub fn orientation(a: Point64, b: Point64, c: Point64) -> Orientation {
    match cross_product(a, b, c) {
        d if d > 0 => Orientation::CounterClockwise,
        d if d < 0 => Orientation::Clockwise,
        _ => Orientation::Collinear,
    }
}

/// Computes the signed area of a path using the shoelace formula.
///
/// Positive for counter-clockwise winding in conventional math axes.
/// Accumulation is exact in 128 bits; only the final halving is floating
/// point, so areas up to 2^52 are themselves exact.
pub fn signed_area(path: &[Point64]) -> f64 {
    if path.len() < 3 {
        return 0.0;
    }
    let mut area: i128 = 0;
    let mut prev = path[path.len() - 1];
    for &pt in path {
        area += (prev.y as i128 + pt.y as i128) * (prev.x as i128 - pt.x as i128);
        prev = pt;
    }
    area as f64 * 0.5
}

/// Returns true when the path has positive (counter-clockwise) area.
#[inline]
pub fn is_positive(path: &[Point64]) -> bool {
    signed_area(path) >= 0.0
}

/// Tests whether two segments cross properly (each strictly straddles the
/// other's carrier line). Shared endpoints and mere touching do not count.
pub fn segments_cross(seg1a: Point64, seg1b: Point64, seg2a: Point64, seg2b: Point64) -> bool {
    let d1a = cross_product(seg1a, seg1b, seg2a);
    let d1b = cross_product(seg1a, seg1b, seg2b);
    if d1a == 0 || d1b == 0 || (d1a > 0) == (d1b > 0) {
        return false;
    }
    let d2a = cross_product(seg2a, seg2b, seg1a);
    let d2b = cross_product(seg2a, seg2b, seg1b);
    d2a != 0 && d2b != 0 && (d2a > 0) != (d2b > 0)
}

/// Computes where the carrier lines of two segments intersect, rounded to
/// the nearest grid point with ties away from zero.
///
/// One exception: the Y of a crossing interpolated along the distinctly
/// more horizontal carrier can land on a half-unit tie in either direction,
/// so that Y rounds ties to even to stay reproducible across platforms.
///
/// Returns `None` when the segments are parallel. When the intersection
/// parameter falls outside the first segment it is clamped to that
/// segment's nearer endpoint.
pub fn intersect_point(
    ln1a: Point64,
    ln1b: Point64,
    ln2a: Point64,
    ln2b: Point64,
) -> Option<Point64> {
    let dy1 = (ln1b.y - ln1a.y) as f64;
    let dx1 = (ln1b.x - ln1a.x) as f64;
    let dy2 = (ln2b.y - ln2a.y) as f64;
    let dx2 = (ln2b.x - ln2a.x) as f64;
    let det = dy1 * dx2 - dy2 * dx1;
    if det == 0.0 {
        return None;
    }
    let t = ((ln1a.x - ln2a.x) as f64 * dy2 - (ln1a.y - ln2a.y) as f64 * dx2) / det;
    if t <= 0.0 {
        Some(ln1a)
    } else if t >= 1.0 {
        Some(ln1b)
    } else {
        let x = (ln1a.x as f64 + t * dx1).round();
        let fy = ln1a.y as f64 + t * dy1;
        // interpolation runs along the first carrier; only when it is the
        // more horizontal of the two does its Y tie-break need pinning
        let y = if dx1.abs() * dy2.abs() > dx2.abs() * dy1.abs() {
            fy.round_ties_even()
        } else {
            fy.round()
        };
        Some(Point64::new(x as i64, y as i64))
    }
}

/// Tests whether `val` lies strictly between `end1` and `end2`.
///
/// Degenerate ranges (`end1 == end2`) contain nothing, which keeps the
/// axis-aligned uses below honest.
#[inline]
pub fn value_between(val: i64, end1: i64, end2: i64) -> bool {
    ((val != end1) == (val != end2)) && ((val > end1) == (val < end2))
}

/// Tests whether `val` lies on or between `end1` and `end2`.
#[inline]
pub fn value_equal_or_between(val: i64, end1: i64, end2: i64) -> bool {
    val == end1 || val == end2 || ((val > end1) == (val < end2))
}

/// Tests whether `pt` lies strictly inside the axis-aligned box spanned by
/// the two corners, comparing each coordinate against both corners.
#[inline]
pub fn point_between(pt: Point64, corner1: Point64, corner2: Point64) -> bool {
    value_between(pt.x, corner1.x, corner2.x) && value_between(pt.y, corner1.y, corner2.y)
}

/// Like [`point_between`] but inclusive of the corners.
#[inline]
pub fn point_equal_or_between(pt: Point64, corner1: Point64, corner2: Point64) -> bool {
    value_equal_or_between(pt.x, corner1.x, corner2.x)
        && value_equal_or_between(pt.y, corner1.y, corner2.y)
}

/// Tests whether two collinear segments overlap over more than a point.
///
/// Precondition: all four points lie on one carrier line.
pub fn collinear_segs_overlap(
    seg1a: Point64,
    seg1b: Point64,
    seg2a: Point64,
    seg2b: Point64,
) -> bool {
    if seg1a.x == seg1b.x {
        if seg2a.x != seg1a.x || seg2a.x != seg2b.x {
            return false;
        }
    } else if seg1a.x < seg1b.x {
        if seg2a.x < seg2b.x {
            if seg2a.x >= seg1b.x || seg2b.x <= seg1a.x {
                return false;
            }
        } else if seg2b.x >= seg1b.x || seg2a.x <= seg1a.x {
            return false;
        }
    } else if seg2a.x < seg2b.x {
        if seg2a.x >= seg1a.x || seg2b.x <= seg1b.x {
            return false;
        }
    } else if seg2b.x >= seg1a.x || seg2a.x <= seg1b.x {
        return false;
    }

    if seg1a.y == seg1b.y {
        if seg2a.y != seg1a.y || seg2a.y != seg2b.y {
            return false;
        }
    } else if seg1a.y < seg1b.y {
        if seg2a.y < seg2b.y {
            if seg2a.y >= seg1b.y || seg2b.y <= seg1a.y {
                return false;
            }
        } else if seg2b.y >= seg1b.y || seg2a.y <= seg1a.y {
            return false;
        }
    } else if seg2a.y < seg2b.y {
        if seg2a.y >= seg1a.y || seg2b.y <= seg1b.y {
            return false;
        }
    } else if seg2b.y >= seg1a.y || seg2a.y <= seg1b.y {
        return false;
    }
    true
}

/// Squared euclidean distance between two points, exact in 128 bits.
#[inline]
pub fn distance_sqr(a: Point64, b: Point64) -> i128 {
    let dx = (a.x - b.x) as i128;
    let dy = (a.y - b.y) as i128;
    dx * dx + dy * dy
}

/// Squared perpendicular distance from `pt` to the line through `line1`
/// and `line2`.
pub fn distance_from_line_sqrd(pt: Point64, line1: Point64, line2: Point64) -> f64 {
    let a = (line1.y - line2.y) as f64;
    let b = (line2.x - line1.x) as f64;
    let c = a * line1.x as f64 + b * line1.y as f64;
    let q = a * pt.x as f64 + b * pt.y as f64 - c;
    (q * q) / (a * a + b * b)
}

/// Tests a point against a closed path using winding parity with exact
/// on-edge detection.
pub fn point_in_polygon(pt: Point64, path: &Path64) -> PointInPolygonResult {
    if path.len() < 3 {
        return PointInPolygonResult::Outside;
    }
    let mut inside = false;
    let mut prev = path[path.len() - 1];
    for &curr in path {
        if (curr.y > pt.y) != (prev.y > pt.y) {
            let d = cross_product(prev, curr, pt);
            if d == 0 {
                return PointInPolygonResult::OnEdge;
            }
            if (d > 0) == (prev.y > curr.y) {
                inside = !inside;
            }
        } else if pt.y == curr.y
            && (pt.x == curr.x || (pt.y == prev.y && value_between(pt.x, prev.x, curr.x)))
        {
            return PointInPolygonResult::OnEdge;
        }
        prev = curr;
    }
    if inside {
        PointInPolygonResult::Inside
    } else {
        PointInPolygonResult::Outside
    }
}
