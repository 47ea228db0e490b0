//! Step 6: optional trochoidal relief in tight (low-slowdown) segments.

use crate::geometry::{tessellate, ArcDirection, Point};

/// Default trochoid loop safety valve (§4.B / §9 open question (c)).
pub const DEFAULT_LOOP_CAP: usize = 64;

/// One emitted point plus whether it belongs to a trochoidal substitution.
pub struct TrochoidResult {
    pub points: Vec<Point>,
    pub is_trochoid: Vec<bool>,
    pub arcs_emitted: usize,
}

/// Replace contiguous runs where `slowdown[k] < threshold` with semicircular
/// arc-pair loops perpendicular to the local centerline. Each replaced run
/// is required to terminate exactly at its original endpoint.
pub fn apply(
    points: &[Point],
    slowdown: &[f64],
    threshold: f64,
    radius: f64,
    pitch: f64,
    loop_cap: usize,
    chord_tol_mm: f64,
) -> TrochoidResult {
    assert_eq!(points.len(), slowdown.len());
    let n = points.len();
    let mut out_points = Vec::with_capacity(n);
    let mut out_flags = Vec::with_capacity(n);
    let mut arcs_emitted = 0usize;

    if n == 0 {
        return TrochoidResult {
            points: out_points,
            is_trochoid: out_flags,
            arcs_emitted,
        };
    }

    out_points.push(points[0]);
    out_flags.push(false);

    let mut i = 0;
    while i < n - 1 {
        if slowdown[i] < threshold && slowdown[i + 1] < threshold {
            let mut j = i + 1;
            while j + 1 < n && slowdown[j] < threshold {
                j += 1;
            }
            let start = points[i];
            let end = points[j];
            let (seg_points, seg_flags, arcs) =
                trochoid_segment(&start, &end, radius, pitch, loop_cap, chord_tol_mm);
            out_points.extend(seg_points.into_iter().skip(1));
            out_flags.extend(seg_flags.into_iter().skip(1));
            arcs_emitted += arcs;
            i = j;
        } else {
            out_points.push(points[i + 1]);
            out_flags.push(false);
            i += 1;
        }
    }

    TrochoidResult {
        points: out_points,
        is_trochoid: out_flags,
        arcs_emitted,
    }
}

/// Generate a trochoid centerline from `start` to `end`: a sequence of
/// full circular loops (as CW+CCW semicircle pairs) of `radius`, spaced by
/// `pitch` along the straight chord, capped at `loop_cap` loops. The final
/// point is forced to equal `end` exactly.
fn trochoid_segment(
    start: &Point,
    end: &Point,
    radius: f64,
    pitch: f64,
    loop_cap: usize,
    chord_tol_mm: f64,
) -> (Vec<Point>, Vec<bool>, usize) {
    let chord = end.sub(start);
    let length = chord.len();
    if length < 1e-9 {
        return (vec![*start, *end], vec![false, false], 0);
    }
    let dir = chord.scale(1.0 / length);
    let perp = Point::new(-dir.y, dir.x);

    let n_loops = ((length / pitch.max(1e-6)).floor() as usize).min(loop_cap);

    let mut points = vec![*start];
    let mut flags = vec![false];
    let mut arcs = 0usize;

    for k in 0..n_loops {
        let along = pitch * (k as f64 + 1.0) - pitch / 2.0;
        if along >= length {
            break;
        }
        let center_on_line = start.add(&dir.scale(along));
        let loop_center = center_on_line.add(&perp.scale(radius));

        let p0 = center_on_line;
        let p_half = loop_center.add(&perp.scale(radius));
        let p_full = center_on_line;

        let start_angle = (p0.y - loop_center.y).atan2(p0.x - loop_center.x);
        let mid_angle = (p_half.y - loop_center.y).atan2(p_half.x - loop_center.x);
        let half1 = tessellate(
            loop_center,
            radius,
            start_angle,
            mid_angle,
            ArcDirection::CounterClockwise,
            chord_tol_mm,
        );
        let end_angle = (p_full.y - loop_center.y).atan2(p_full.x - loop_center.x);
        let half2 = tessellate(
            loop_center,
            radius,
            mid_angle,
            end_angle,
            ArcDirection::CounterClockwise,
            chord_tol_mm,
        );

        points.extend(half1.into_iter().skip(1));
        flags.extend(std::iter::repeat(true).take(points.len() - flags.len()));
        points.extend(half2.into_iter().skip(1));
        flags.extend(std::iter::repeat(true).take(points.len() - flags.len()));
        arcs += 2;
    }

    let last = *points.last().unwrap();
    if last.dist(end) > 1e-9 {
        points.push(*end);
        flags.push(false);
    } else {
        *points.last_mut().unwrap() = *end;
    }

    (points, flags, arcs)
}
