//! Polygon offsetting via per-vertex miter joins.
//!
//! `offset` shrinks the outer loop inward and grows islands outward by the
//! same distance, matching the contract's "cutter centerline stays offset
//! from all boundaries" rule. Each vertex is pushed along the bisector of
//! its two incident edge normals, scaled by `distance / cos(half-angle)`
//! and clamped to `distance * MITER_LIMIT` the way a miter-joined offset
//! in a 2D CAM kernel clamps sharp corners instead of growing them without
//! bound.

use super::{signed_area, Loop, Point};

/// Clamp factor for miter joins, as named in the offset contract.
pub const MITER_LIMIT: f64 = 2.0;

/// Offset every loop in `loops`: the outer loop (index 0) shrinks inward by
/// `distance`, islands (index 1..) grow outward by `distance`. Returns
/// `None` for a loop whose offset collapsed (area sign flipped, area near
/// zero, or the inset self-intersects) — callers treat that as
/// `OffsetDegenerate` for the whole ring.
pub fn offset(loops: &[Loop], distance: f64) -> Option<Vec<Loop>> {
    let mut out = Vec::with_capacity(loops.len());
    for (i, l) in loops.iter().enumerate() {
        let signed = if i == 0 { distance } else { -distance };
        match offset_polygon(l, signed) {
            Some(inset) => out.push(inset),
            None => return None,
        }
    }
    Some(out)
}

/// Offset a single polygon toward its interior by `distance` (negative
/// grows it). Returns `None` if the result degenerates.
pub fn offset_polygon(loop_: &Loop, distance: f64) -> Option<Loop> {
    if distance == 0.0 {
        return Some(loop_.clone());
    }
    let n = loop_.len();
    if n < 3 {
        return None;
    }
    let area_sign = if signed_area(loop_) >= 0.0 { 1.0 } else { -1.0 };
    let mut result = Vec::with_capacity(n);

    for i in 0..n {
        let prev = loop_[(i + n - 1) % n];
        let cur = loop_[i];
        let next = loop_[(i + 1) % n];

        let e_prev = cur.sub(&prev);
        let e_next = next.sub(&cur);

        let inward_prev = inward_normal(&e_prev, area_sign)?;
        let inward_next = inward_normal(&e_next, area_sign)?;

        let sum = inward_prev.add(&inward_next);
        let bisector = sum.normalized().unwrap_or(inward_prev);

        let cos_half = bisector.dot(&inward_prev).max(1e-6);
        let mut miter_len = distance / cos_half;
        let cap = distance.abs() * MITER_LIMIT;
        if miter_len.abs() > cap {
            miter_len = cap * miter_len.signum();
        }
        result.push(cur.add(&bisector.scale(miter_len)));
    }

    let new_area = signed_area(&result);
    if new_area.abs() < 1e-9 {
        return None;
    }
    let new_sign = if new_area >= 0.0 { 1.0 } else { -1.0 };
    if new_sign != area_sign {
        return None;
    }
    if self_intersects(&result) {
        return None;
    }
    Some(result)
}

/// Inward-pointing unit normal of a directed edge, where "inward" depends
/// on the polygon's own orientation (`area_sign`): for a CCW loop, the
/// right-hand normal `(ey, -ex)` points outward, so inward is its negation;
/// for a CW loop the roles invert.
fn inward_normal(edge: &Point, area_sign: f64) -> Option<Point> {
    let raw = Point::new(edge.y, -edge.x);
    let outward = if area_sign >= 0.0 {
        raw
    } else {
        Point::new(-raw.x, -raw.y)
    };
    let inward = Point::new(-outward.x, -outward.y);
    inward.normalized()
}

/// O(n^2) check for crossings between non-adjacent edges.
fn self_intersects(loop_: &Loop) -> bool {
    let n = loop_.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let a1 = loop_[i];
        let a2 = loop_[(i + 1) % n];
        for j in (i + 1)..n {
            if j == i || (j + 1) % n == i || j == (i + 1) % n {
                continue;
            }
            let b1 = loop_[j];
            let b2 = loop_[(j + 1) % n];
            if segments_intersect(&a1, &a2, &b1, &b2) {
                return true;
            }
        }
    }
    false
}

fn orient(a: &Point, b: &Point, c: &Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_intersect(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> bool {
    let d1 = orient(b1, b2, a1);
    let d2 = orient(b1, b2, a2);
    let d3 = orient(a1, a2, b1);
    let d4 = orient(a1, a2, b2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::area;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Loop {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn inset_rectangle_shrinks_area_predictably() {
        let r = rect(0.0, 0.0, 100.0, 60.0);
        let inset = offset_polygon(&r, 3.0).unwrap();
        assert!((area(&inset) - 94.0 * 54.0).abs() < 1e-6);
    }

    #[test]
    fn inset_past_inradius_is_degenerate() {
        let r = rect(0.0, 0.0, 100.0, 60.0);
        assert!(offset_polygon(&r, 31.0).is_none());
    }

    #[test]
    fn island_grows_when_offset_is_applied_to_loopset() {
        let outer = rect(0.0, 0.0, 100.0, 60.0);
        let island: Loop = rect(30.0, 15.0, 70.0, 45.0).into_iter().rev().collect();
        let out = offset(&[outer, island], 3.0).unwrap();
        assert!((area(&out[1]) - 36.0 * 36.0).abs() < 1e-6);
    }

    #[test]
    fn offset_stack_runs_until_degenerate() {
        let r = rect(0.0, 0.0, 100.0, 60.0);
        let step = 0.45 * 6.0;
        let mut dist = 3.0;
        let mut rings = 0;
        while offset_polygon(&r, dist).is_some() {
            rings += 1;
            dist += step;
        }
        assert_eq!(rings, 10);
    }
}
