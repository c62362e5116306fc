//! Triangle and segment predicates used for graph topology decisions
//!
//! Predicates that decide topology (winding, containment, intersection) take
//! lattice coordinates and evaluate exactly in 64-bit integers. Clamped
//! projections that only produce output positions work in floating point.

use crate::Int3;
use glam::Vec3;

/// Twice the signed area of the triangle in the XZ plane, in lattice units.
/// Negative for clockwise winding when viewed from +Y.
pub fn signed_area_xz(a: Int3, b: Int3, c: Int3) -> i64 {
    let abx = (b.x - a.x) as i64;
    let abz = (b.z - a.z) as i64;
    let acx = (c.x - a.x) as i64;
    let acz = (c.z - a.z) as i64;
    abx * acz - acx * abz
}

/// Checks if the triangle `a,b,c` winds clockwise in the XZ plane
pub fn is_clockwise_xz(a: Int3, b: Int3, c: Int3) -> bool {
    signed_area_xz(a, b, c) < 0
}

/// Checks if the three points are collinear in the XZ plane
pub fn is_colinear_xz(a: Int3, b: Int3, c: Int3) -> bool {
    signed_area_xz(a, b, c) == 0
}

/// Checks if `p` lies inside the clockwise-wound triangle `a,b,c` in XZ space.
/// Edges count as inside.
pub fn triangle_contains_xz(a: Int3, b: Int3, c: Int3, p: Int3) -> bool {
    signed_area_xz(a, b, p) <= 0 && signed_area_xz(b, c, p) <= 0 && signed_area_xz(c, a, p) <= 0
}

/// Checks if the XZ projections of segments `a-b` and `c-d` intersect
pub fn segments_intersect_xz(a: Int3, b: Int3, c: Int3, d: Int3) -> bool {
    let left = |p: Int3, q: Int3, r: Int3| signed_area_xz(p, q, r) <= 0;
    (left(a, b, d) ^ left(a, b, c)) && (left(c, d, a) ^ left(c, d, b))
}

/// Finds the closest point on the triangle `a,b,c` to `p`
pub fn closest_point_on_triangle(a: Vec3, b: Vec3, c: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    // Vertex region A
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    // Vertex region B
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    // Vertex region C
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // Face region
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}
