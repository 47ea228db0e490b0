//! Step 4: corner smoothing / minimum fillet radius.

use crate::geometry::{tessellate, ArcDirection, Point};

/// Turn angles sharper than this (radians, measured as the interior angle
/// between incident edge vectors pointing away from the corner) are
/// candidates for fillet replacement.
const SHARP_ANGLE_THRESHOLD_RAD: f64 = std::f64::consts::PI - 0.3;

/// Replace interior corners sharper than the threshold with a tangent arc
/// of `corner_radius_min_mm`, when the fillet geometrically fits within
/// the two incident edges. Operates on an open polyline; the first and
/// last points are never modified.
pub fn apply_min_fillet(path: &[Point], corner_radius_min_mm: f64, chord_tol_mm: f64) -> Vec<Point> {
    if corner_radius_min_mm <= 0.0 || path.len() < 3 {
        return path.to_vec();
    }
    let mut out = Vec::with_capacity(path.len());
    out.push(path[0]);
    let n = path.len();
    let mut i = 1;
    while i < n - 1 {
        let prev = *out.last().unwrap();
        let corner = path[i];
        let next = path[i + 1];
        if let Some(fillet) = fillet_corner(&prev, &corner, &next, corner_radius_min_mm, chord_tol_mm) {
            out.extend(fillet);
        } else {
            out.push(corner);
        }
        i += 1;
    }
    out.push(path[n - 1]);
    out
}

fn fillet_corner(
    prev: &Point,
    corner: &Point,
    next: &Point,
    radius: f64,
    chord_tol_mm: f64,
) -> Option<Vec<Point>> {
    let u = prev.sub(corner).normalized()?;
    let v = next.sub(corner).normalized()?;
    let cos_phi = u.dot(&v).clamp(-1.0, 1.0);
    let phi = cos_phi.acos();
    if phi >= SHARP_ANGLE_THRESHOLD_RAD || phi < 1e-6 {
        return None;
    }
    let half = phi / 2.0;
    let tangent_len = radius / half.tan().max(1e-6);
    let edge_in_len = prev.dist(corner);
    let edge_out_len = corner.dist(next);
    if tangent_len >= edge_in_len.min(edge_out_len) {
        return None;
    }

    let p_in = corner.add(&u.scale(tangent_len));
    let p_out = corner.add(&v.scale(tangent_len));
    let bisector = u.add(&v).normalized()?;
    let center_dist = radius / half.sin().max(1e-6);
    let center = corner.add(&bisector.scale(center_dist));

    let cross = u.x * v.y - u.y * v.x;
    let direction = if cross > 0.0 {
        ArcDirection::Clockwise
    } else {
        ArcDirection::CounterClockwise
    };

    let start_angle = (p_in.y - center.y).atan2(p_in.x - center.x);
    let end_angle = (p_out.y - center.y).atan2(p_out.x - center.x);
    let mut arc = tessellate(center, radius, start_angle, end_angle, direction, chord_tol_mm);
    arc[0] = p_in;
    let last = arc.len() - 1;
    arc[last] = p_out;

    let mut out = vec![p_in];
    out.extend(arc.into_iter().skip(1));
    Some(out)
}
