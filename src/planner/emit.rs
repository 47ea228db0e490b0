//! Step 7: wrap a 2D polyline into a `Toolpath` of `Move`s.

use crate::geometry::Point;
use crate::planner::types::{Move, MoveMeta, Point3, Toolpath};

pub struct EmitOptions {
    pub safe_z_mm: f64,
    pub z_rough_mm: f64,
    pub feed_xy: f64,
    pub feed_z: f64,
    pub rapid: f64,
    pub lead_r_mm: f64,
    pub chord_tol_mm: f64,
}

/// Emit a cutting toolpath from a 2D centerline plus per-point slowdown and
/// trochoid flags: initial rapid to safe Z, plunge, cutting moves at
/// `feed_xy` scaled by slowdown, final retract.
pub fn emit(points: &[Point], slowdown: &[f64], trochoid: &[bool], opts: &EmitOptions) -> Toolpath {
    assert_eq!(points.len(), slowdown.len());
    assert_eq!(points.len(), trochoid.len());
    let mut moves = Vec::new();
    if points.is_empty() {
        return Toolpath { moves };
    }

    let start = points[0];
    let mut cursor = Point3::new(start.x, start.y, opts.safe_z_mm);
    moves.push(Move::Rapid {
        from: cursor,
        to: cursor,
        f: opts.rapid,
    });

    if opts.lead_r_mm > 0.0 && points.len() > 1 {
        // Lead-in: rapid/plunge to a point offset perpendicular to the
        // starting direction by `lead_r_mm`, then arc tangentially into
        // the pocket's actual start point.
        let dir = points[1].sub(&points[0]).normalized().unwrap_or(Point::new(1.0, 0.0));
        let perp = Point::new(-dir.y, dir.x);
        let lead_center = start.add(&perp.scale(opts.lead_r_mm));
        let lead_start = start.add(&perp.scale(2.0 * opts.lead_r_mm));

        let plunge_xy = Point3::new(lead_start.x, lead_start.y, opts.safe_z_mm);
        moves.push(Move::Rapid {
            from: cursor,
            to: plunge_xy,
            f: opts.rapid,
        });
        cursor = plunge_xy;
        let plunge_bottom = Point3::new(lead_start.x, lead_start.y, opts.z_rough_mm);
        moves.push(Move::Linear {
            from: cursor,
            to: plunge_bottom,
            f: opts.feed_z,
            meta: MoveMeta::default(),
        });
        cursor = plunge_bottom;

        let to3 = Point3::new(start.x, start.y, opts.z_rough_mm);
        moves.push(Move::ArcCcw {
            from: cursor,
            to: to3,
            center_offset: lead_center.sub(&cursor.to_xy()),
            f: opts.feed_xy,
            meta: MoveMeta::default(),
        });
        cursor = to3;
    } else {
        let plunge_xy = Point3::new(start.x, start.y, opts.safe_z_mm);
        moves.push(Move::Rapid {
            from: cursor,
            to: plunge_xy,
            f: opts.rapid,
        });
        cursor = plunge_xy;
        let plunge_bottom = Point3::new(start.x, start.y, opts.z_rough_mm);
        moves.push(Move::Linear {
            from: cursor,
            to: plunge_bottom,
            f: opts.feed_z,
            meta: MoveMeta::default(),
        });
        cursor = plunge_bottom;
    }

    for i in 0..points.len() - 1 {
        let to = Point3::new(points[i + 1].x, points[i + 1].y, opts.z_rough_mm);
        let scale = slowdown[i + 1].max(slowdown[i]);
        let feed = (opts.feed_xy * scale).max(100.0);
        let meta = MoveMeta {
            slowdown: Some(scale),
            trochoid: trochoid[i + 1] || trochoid[i],
            bottleneck: crate::planner::types::Bottleneck::None,
        };
        moves.push(Move::Linear {
            from: cursor,
            to,
            f: feed,
            meta,
        });
        cursor = to;
    }

    let retract = Point3::new(cursor.x, cursor.y, opts.safe_z_mm);
    moves.push(Move::Linear {
        from: cursor,
        to: retract,
        f: opts.feed_z,
        meta: MoveMeta::default(),
    });

    Toolpath { moves }
}

/// Multiply every cutting-move feed by `factor`, clamped to `[0.5, 1.5]`.
pub fn apply_session_override(path: &mut Toolpath, factor: Option<f64>) {
    let Some(raw) = factor else { return };
    let clamped = raw.clamp(0.5, 1.5);
    for mv in &mut path.moves {
        if mv.is_cutting() {
            mv.scale_feed(clamped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_rapid_plunge_cut_retract() {
        let points = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let slowdown = vec![1.0, 1.0];
        let trochoid = vec![false, false];
        let opts = EmitOptions {
            safe_z_mm: 5.0,
            z_rough_mm: -1.0,
            feed_xy: 1000.0,
            feed_z: 300.0,
            rapid: 6000.0,
            lead_r_mm: 0.0,
            chord_tol_mm: 0.1,
        };
        let path = emit(&points, &slowdown, &trochoid, &opts);
        assert!(matches!(path.moves.first(), Some(Move::Rapid { .. })));
        assert!(matches!(path.moves.last(), Some(Move::Linear { to, .. }) if to.z == 5.0));
        assert!(path.is_continuous(1e-6));
    }

    #[test]
    fn session_override_clamps_factor() {
        let points = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let slowdown = vec![1.0, 1.0];
        let trochoid = vec![false, false];
        let opts = EmitOptions {
            safe_z_mm: 5.0,
            z_rough_mm: -1.0,
            feed_xy: 1000.0,
            feed_z: 300.0,
            rapid: 6000.0,
            lead_r_mm: 0.0,
            chord_tol_mm: 0.1,
        };
        let mut path = emit(&points, &slowdown, &trochoid, &opts);
        let before = path
            .moves
            .iter()
            .find(|m| m.is_cutting())
            .unwrap()
            .feed();
        apply_session_override(&mut path, Some(3.0));
        let after = path
            .moves
            .iter()
            .find(|m| m.is_cutting())
            .unwrap()
            .feed();
        assert!((after / before - 1.5).abs() < 1e-9);
    }
}
