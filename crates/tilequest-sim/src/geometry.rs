//! Geometric predicates for collision tests.
//!
//! All functions are pure. Polygons are closed implicitly (the last vertex
//! connects back to the first) and are assumed to be simple.

use tilequest_common::{Rect, Vec2};

/// Guard added to the ray-cast denominator so horizontal edges never divide by zero.
const RAY_EPSILON: f32 = 1e-7;

/// Number of vertices used when approximating an ellipse.
pub const ELLIPSE_SEGMENTS: usize = 16;

/// Ray-casting parity test.
///
/// Points exactly on an edge may land on either side.
#[must_use]
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        let crosses = (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y + RAY_EPSILON) + pi.x;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Signed area of the triangle (p, q, r), doubled.
fn orientation(p: Vec2, q: Vec2, r: Vec2) -> f32 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

/// Whether `q` lies within the bounding box of segment `p`-`r`.
fn on_segment(p: Vec2, q: Vec2, r: Vec2) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Tests whether segment `a`-`b` intersects segment `c`-`d`.
///
/// Collinear overlapping segments and touching endpoints count as intersecting.
#[must_use]
pub fn segments_intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if o1 == 0.0 && on_segment(a, c, b) {
        return true;
    }
    if o2 == 0.0 && on_segment(a, d, b) {
        return true;
    }
    if o3 == 0.0 && on_segment(c, a, d) {
        return true;
    }
    if o4 == 0.0 && on_segment(c, b, d) {
        return true;
    }

    (o1 > 0.0) != (o2 > 0.0) && (o3 > 0.0) != (o4 > 0.0)
}

/// Rectangle versus polygon overlap.
///
/// True when any rectangle corner is inside the polygon, any polygon vertex is
/// inside the rectangle (inclusive), or any pair of edges crosses.
#[must_use]
pub fn rect_intersects_polygon(rect: &Rect, polygon: &[Vec2]) -> bool {
    if polygon.is_empty() {
        return false;
    }

    let corners = rect.corners();
    if corners.iter().any(|&c| point_in_polygon(c, polygon)) {
        return true;
    }

    if polygon.iter().any(|&p| rect.contains_point(p)) {
        return true;
    }

    let rect_edges = [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[3]),
        (corners[3], corners[0]),
    ];
    (0..polygon.len()).any(|i| {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        rect_edges
            .iter()
            .any(|&(r1, r2)| segments_intersect(r1, r2, a, b))
    })
}

/// Open-interval AABB overlap: rectangles that only share an edge do not overlap.
#[must_use]
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Approximates an axis-aligned ellipse inscribed in `bounds` as a polygon.
#[must_use]
pub fn ellipse_polygon(bounds: &Rect) -> Vec<Vec2> {
    let center = bounds.center();
    let rx = bounds.width / 2.0;
    let ry = bounds.height / 2.0;
    (0..ELLIPSE_SEGMENTS)
        .map(|k| {
            let theta = (k as f32 / ELLIPSE_SEGMENTS as f32) * std::f32::consts::TAU;
            Vec2::new(center.x + theta.cos() * rx, center.y + theta.sin() * ry)
        })
        .collect()
}
