//! Polygon moments, centroids, and containment tests on traced contours.
//!
//! Contour points are the integer boundary pixels produced by contour
//! tracing, treated as a closed polygon (last point connects back to the
//! first). All tests are integer-exact.

use imageproc::point::Point;

/// First-order polygon moments computed via Green's theorem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    /// Signed area term (twice-area summed and halved).
    pub m00: f64,
    /// First moment about the y axis.
    pub m10: f64,
    /// First moment about the x axis.
    pub m01: f64,
}

/// Compute signed polygon moments of a closed contour.
pub fn contour_moments(points: &[Point<i32>]) -> Moments {
    let mut m00 = 0.0f64;
    let mut m10 = 0.0f64;
    let mut m01 = 0.0f64;

    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let (xa, ya) = (a.x as f64, a.y as f64);
        let (xb, yb) = (b.x as f64, b.y as f64);
        let cross = xa * yb - xb * ya;
        m00 += cross;
        m10 += (xa + xb) * cross;
        m01 += (ya + yb) * cross;
    }

    Moments {
        m00: m00 / 2.0,
        m10: m10 / 6.0,
        m01: m01 / 6.0,
    }
}

/// Enclosed polygon area of a closed contour, in square pixels.
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    contour_moments(points).m00.abs()
}

/// Area-weighted centroid of a closed contour, truncated to pixel indices.
///
/// Returns `None` when the zeroth moment is zero (a point, a line, or any
/// other degenerate contour enclosing no area).
pub fn centroid(points: &[Point<i32>]) -> Option<Point<i32>> {
    let m = contour_moments(points);
    if m.m00 == 0.0 {
        return None;
    }
    Some(Point::new(
        (m.m10 / m.m00) as i32,
        (m.m01 / m.m00) as i32,
    ))
}

/// Does `p` lie exactly on the segment `a`–`b`?
fn on_segment(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> bool {
    let cross = (b.x - a.x) as i64 * (p.y - a.y) as i64 - (b.y - a.y) as i64 * (p.x - a.x) as i64;
    if cross != 0 {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Boundary-inclusive point-in-polygon test.
///
/// Returns `true` when `p` is strictly inside the closed polygon or lies
/// exactly on one of its edges or vertices. Interior membership uses the
/// even-odd rule with integer arithmetic.
pub fn point_in_polygon(p: Point<i32>, polygon: &[Point<i32>]) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }

    for i in 0..n {
        if on_segment(p, polygon[i], polygon[(i + 1) % n]) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let dy = (b.y - a.y) as i64;
            let lhs = (p.x - a.x) as i64 * dy;
            let rhs = (b.x - a.x) as i64 * (p.y - a.y) as i64;
            let crosses = if dy > 0 { lhs < rhs } else { lhs > rhs };
            if crosses {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
