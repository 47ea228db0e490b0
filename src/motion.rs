//! Motion time estimation: classic trapezoid and jerk-aware.
//!
//! Both estimators share the same `Toolpath` input and return seconds,
//! mirroring `cam/feedtime_l3.py`'s two-tier estimate (cheap trapezoid for
//! UI hints, jerk-aware simulation for quoted cycle time).

use crate::planner::{Bottleneck, Move, Toolpath};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use std::f64::consts::PI;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("feed must be greater than zero")]
    ZeroOrNegativeFeed,
}

/// `{max_feed_xy, rapid, accel_mm_s2, jerk_mm_s3, corner_tol_mm}`, mm/min
/// for feeds, mm/s^2 / mm/s^3 for accel/jerk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MachineProfile {
    pub max_feed_xy: f64,
    pub rapid: f64,
    pub accel_mm_s2: f64,
    pub jerk_mm_s3: f64,
    pub corner_tol_mm: f64,
}

/// Controller-overhead multiplier applied to the classic trapezoid total.
const TRAPEZOID_OVERHEAD: f64 = 1.10;

/// Classic trapezoid estimate: `sum(distance / (feed/60))`, times
/// `TRAPEZOID_OVERHEAD`. Accuracy is documented as +-15-30%; intended for
/// UI progress hints only.
pub fn estimate_classic(path: &Toolpath) -> Result<f64, MotionError> {
    let mut total = 0.0f64;
    for mv in &path.moves {
        let (dist, feed) = move_distance_and_feed(mv);
        if feed <= 0.0 {
            return Err(MotionError::ZeroOrNegativeFeed);
        }
        if dist <= 0.0 {
            continue;
        }
        total += dist / (feed / 60.0);
    }
    Ok(total * TRAPEZOID_OVERHEAD)
}

/// Result of the jerk-aware pass: total seconds plus the bottleneck tag
/// assigned to each move, in path order.
pub struct JerkEstimate {
    pub total_seconds: f64,
    pub bottlenecks: Vec<Bottleneck>,
}

/// Jerk-aware forward-backward velocity pass. Each move is capped by
/// `min(move_feed_cap, corner_speed_at_joint)`; the corner speed at a joint
/// of total turn angle theta uses `v = sqrt(accel * corner_tol / (1 - cos(theta)))`
/// clamped by the move's own feed cap. Acceleration ramps linearly over
/// `accel/jerk` seconds (S-curve), so the true achievable speed change over
/// a move is limited by both accel and jerk; the tighter constraint is
/// tagged as the bottleneck.
pub fn estimate_jerk_aware(
    path: &Toolpath,
    profile: &MachineProfile,
) -> Result<JerkEstimate, MotionError> {
    let moves = &path.moves;
    let n = moves.len();
    if n == 0 {
        return Ok(JerkEstimate {
            total_seconds: 0.0,
            bottlenecks: vec![],
        });
    }

    let mut feed_caps = Vec::with_capacity(n);
    let mut distances = Vec::with_capacity(n);
    for mv in moves {
        let (dist, feed) = move_distance_and_feed(mv);
        if feed <= 0.0 && dist > 0.0 {
            return Err(MotionError::ZeroOrNegativeFeed);
        }
        feed_caps.push(feed.max(0.0) / 60.0); // mm/s
        distances.push(dist);
    }

    let corner_speeds = corner_speeds(moves, profile);

    // Velocity at each move boundary (0..=n), start and end at rest.
    let mut v = vec![0.0f64; n + 1];
    for i in 1..n {
        v[i] = feed_caps[i - 1].min(feed_caps[i]).min(corner_speeds[i - 1]);
    }
    v[0] = 0.0;
    v[n] = 0.0;

    let mut total = 0.0f64;
    let mut bottlenecks = vec![Bottleneck::None; n];

    for i in 0..n {
        if distances[i] <= 0.0 {
            continue;
        }
        let v_cap = feed_caps[i].max(1e-9);
        let v_enter = v[i].min(v_cap);
        let v_exit = v[i + 1].min(v_cap);
        let (t, bottleneck) = segment_time(
            distances[i],
            v_enter,
            v_exit,
            v_cap,
            profile.accel_mm_s2.max(1e-9),
            profile.jerk_mm_s3.max(1e-9),
        );
        total += t;
        bottlenecks[i] = bottleneck;
    }

    Ok(JerkEstimate {
        total_seconds: total,
        bottlenecks,
    })
}

/// Time to cover `dist` starting at `v_enter`, ending at `v_exit`, capped
/// at `v_cap`, under acceleration `accel` whose ramp is jerk-limited.
/// Uses a symmetric trapezoid/triangle model with the peak velocity solved
/// from the available distance; reports whichever of feed/accel/jerk most
/// constrained the achieved peak.
fn segment_time(
    dist: f64,
    v_enter: f64,
    v_exit: f64,
    v_cap: f64,
    accel: f64,
    jerk: f64,
) -> (f64, Bottleneck) {
    let jerk_ramp_t = accel / jerk;
    // Distance to go from v_enter to v_cap under constant accel (ignoring
    // jerk ramp time itself, which is small relative to typical moves).
    let d_to_cap = (v_cap * v_cap - v_enter * v_enter).abs() / (2.0 * accel);
    let d_from_cap = (v_cap * v_cap - v_exit * v_exit).abs() / (2.0 * accel);

    if d_to_cap + d_from_cap <= dist {
        let cruise_d = dist - d_to_cap - d_from_cap;
        let t_accel = (v_cap - v_enter).abs() / accel;
        let t_decel = (v_cap - v_exit).abs() / accel;
        let t_cruise = cruise_d / v_cap.max(1e-9);
        let bottleneck = if t_accel.max(t_decel) > jerk_ramp_t {
            Bottleneck::FeedCap
        } else {
            Bottleneck::Jerk
        };
        (t_accel + t_cruise + t_decel, bottleneck)
    } else {
        // Triangle profile: solve peak velocity reachable within `dist`.
        let v_peak_sq = accel * dist + (v_enter * v_enter + v_exit * v_exit) / 2.0;
        let v_peak = v_peak_sq.max(0.0).sqrt().min(v_cap);
        let t_accel = (v_peak - v_enter).abs() / accel;
        let t_decel = (v_peak - v_exit).abs() / accel;
        let bottleneck = if t_accel.max(t_decel) < jerk_ramp_t {
            Bottleneck::Jerk
        } else {
            Bottleneck::Accel
        };
        (t_accel + t_decel, bottleneck)
    }
}

/// Corner speed at the boundary between move `i` and move `i+1`, for
/// `i in 0..n-1`; index `i` in the returned vector is the speed at the
/// joint following move `i`.
fn corner_speeds(moves: &[Move], profile: &MachineProfile) -> Vec<f64> {
    let n = moves.len();
    let mut out = vec![f64::INFINITY; n.saturating_sub(1)];
    for i in 0..n.saturating_sub(1) {
        let Some(dir_in) = move_direction(&moves[i]) else {
            continue;
        };
        let Some(dir_out) = move_direction(&moves[i + 1]) else {
            continue;
        };
        let cos_theta = dir_in.dot(&dir_out).clamp(-1.0, 1.0);
        let one_minus_cos = (1.0 - cos_theta).max(1e-6);
        let v = (profile.accel_mm_s2 * profile.corner_tol_mm / one_minus_cos)
            .max(0.0)
            .sqrt();
        out[i] = v;
    }
    out
}

fn move_direction(mv: &Move) -> Option<crate::geometry::Point> {
    use crate::geometry::Point;
    let (from, to) = move_endpoints_xy(mv)?;
    Point::new(to.x - from.x, to.y - from.y).normalized()
}

fn move_endpoints_xy(mv: &Move) -> Option<(crate::geometry::Point, crate::geometry::Point)> {
    use crate::geometry::Point;
    match mv {
        Move::Rapid { from, to, .. } => Some((Point::new(from.x, from.y), Point::new(to.x, to.y))),
        Move::Linear { from, to, .. } => Some((Point::new(from.x, from.y), Point::new(to.x, to.y))),
        Move::ArcCw { from, to, .. } | Move::ArcCcw { from, to, .. } => {
            Some((Point::new(from.x, from.y), Point::new(to.x, to.y)))
        }
    }
}

fn move_distance_and_feed(mv: &Move) -> (f64, f64) {
    match mv {
        Move::Rapid { from, to, f } => (from.dist3(to), *f),
        Move::Linear { from, to, f, .. } => (from.dist3(to), *f),
        Move::ArcCw {
            from,
            to,
            f,
            center_offset,
            ..
        } => (arc_length(from, to, center_offset, true), *f),
        Move::ArcCcw {
            from,
            to,
            f,
            center_offset,
            ..
        } => (arc_length(from, to, center_offset, false), *f),
    }
}

/// Arc length from `from` to `to`, center at `from + center_offset`,
/// swept in the given direction (`clockwise` as seen in the XY plane).
fn arc_length(
    from: &crate::planner::Point3,
    to: &crate::planner::Point3,
    center_offset: &crate::geometry::Point,
    clockwise: bool,
) -> f64 {
    let center_x = from.x + center_offset.x;
    let center_y = from.y + center_offset.y;
    let radius = (center_offset.x.powi(2) + center_offset.y.powi(2)).sqrt();
    if radius < 1e-9 {
        return from.dist3(to);
    }
    let a0 = (from.y - center_y).atan2(from.x - center_x);
    let a1 = (to.y - center_y).atan2(to.x - center_x);
    let two_pi = 2.0 * PI;
    let mut delta = if clockwise { a0 - a1 } else { a1 - a0 };
    while delta < 0.0 {
        delta += two_pi;
    }
    radius * delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::Point3;

    fn linear_path(points: &[(f64, f64)], feed: f64) -> Toolpath {
        let mut moves = vec![];
        for w in points.windows(2) {
            moves.push(Move::Linear {
                from: Point3::new(w[0].0, w[0].1, -1.0),
                to: Point3::new(w[1].0, w[1].1, -1.0),
                f: feed,
                meta: Default::default(),
            });
        }
        Toolpath { moves }
    }

    #[test]
    fn classic_estimate_matches_simple_distance_over_feed() {
        let path = linear_path(&[(0.0, 0.0), (60.0, 0.0)], 600.0);
        let t = estimate_classic(&path).unwrap();
        // 60mm at 600mm/min = 6s, times 1.10 overhead.
        assert!((t - 6.6).abs() < 1e-9);
    }

    #[test]
    fn classic_estimate_rejects_nonpositive_feed() {
        let path = linear_path(&[(0.0, 0.0), (10.0, 0.0)], 0.0);
        assert!(matches!(
            estimate_classic(&path),
            Err(MotionError::ZeroOrNegativeFeed)
        ));
    }

    #[test]
    fn jerk_aware_estimate_is_positive_and_tags_bottlenecks() {
        let path = linear_path(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)], 1200.0);
        let profile = MachineProfile {
            max_feed_xy: 1200.0,
            rapid: 6000.0,
            accel_mm_s2: 500.0,
            jerk_mm_s3: 5000.0,
            corner_tol_mm: 0.05,
        };
        let est = estimate_jerk_aware(&path, &profile).unwrap();
        assert!(est.total_seconds > 0.0);
        assert_eq!(est.bottlenecks.len(), path.moves.len());
    }
}
