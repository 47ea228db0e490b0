//! Adaptive pocket-milling planner: ring stack -> stitch -> smooth ->
//! curvature slowdown -> trochoidal relief -> move emission.

mod emit;
mod ring;
mod smoothing;
mod stitch;
mod trochoid;
mod types;

pub use types::{
    Bottleneck, CapCounts, CurvatureOptions, Move, MoveMeta, PlanRequest, PlanStats, Point3,
    Strategy, Toolpath, TrochoidOptions, Units,
};

use crate::error::{CoreError, CoreResult};
use crate::geometry::{self, default_k_threshold, validate_loop_set};
use crate::motion;

/// Default chord tolerance used for arc tessellation and adaptive
/// resampling throughout the planner.
const CHORD_TOL_MM: f64 = 0.05;

/// Build a toolpath from a fully validated `PlanRequest`. Mirrors the
/// seven-step pipeline: offset stack, ring assembly, strategy dispatch,
/// smoothing, curvature slowdown, trochoidal relief, move emission.
pub fn plan(req: &PlanRequest) -> CoreResult<(Toolpath, PlanStats)> {
    validate_request(req)?;
    validate_loop_set(&req.loops)?;

    let levels = ring::build_stack(&req.loops, req.margin_mm, req.tool_diameter_mm, req.stepover)?;

    let polyline2d = match req.strategy {
        Strategy::Spiral => stitch::stitch_spiral(&levels, req.climb)?,
        Strategy::Lanes => {
            let loops = stitch::lanes_loops(&levels, req.climb);
            loops.into_iter().flatten().collect()
        }
    };

    let smoothed = smoothing::apply_min_fillet(
        &polyline2d,
        req.curvature.corner_radius_min_mm,
        CHORD_TOL_MM,
    );

    let ds_min = req.tool_diameter_mm * req.curvature.target_stepover * 0.25;
    let ds_max = req.tool_diameter_mm * req.curvature.target_stepover;
    let k_threshold = default_k_threshold(req.tool_diameter_mm);
    let resampled = geometry::adaptive_resample(&smoothed, ds_min, ds_max, k_threshold);

    let min_scale = (req.curvature.slowdown_feed_pct / 100.0).clamp(0.05, 1.0);
    let slowdown = geometry::slowdown_factors(&resampled, k_threshold, min_scale);

    let trochoid_threshold = 0.85;
    let (centerline, troch_flags, trochoid_arcs) = if req.trochoid.use_trochoids {
        let radius = req
            .trochoid
            .trochoid_radius_mm
            .unwrap_or(0.375 * req.tool_diameter_mm);
        let pitch = req
            .trochoid
            .trochoid_pitch_mm
            .unwrap_or(req.tool_diameter_mm);
        let result = trochoid::apply(
            &resampled,
            &slowdown,
            trochoid_threshold,
            radius,
            pitch,
            trochoid::DEFAULT_LOOP_CAP,
            CHORD_TOL_MM,
        );
        (result.points, result.is_trochoid, result.arcs_emitted)
    } else {
        (resampled.clone(), vec![false; resampled.len()], 0)
    };

    // Slowdown factors were computed against `resampled`; trochoid
    // substitution may have inserted points, so re-derive slowdown over
    // the final centerline to keep per-move metadata consistent.
    let final_slowdown = if centerline.len() == slowdown.len() {
        slowdown
    } else {
        geometry::slowdown_factors(&centerline, k_threshold, min_scale)
    };

    let emit_opts = emit::EmitOptions {
        safe_z_mm: req.safe_z_mm,
        z_rough_mm: req.z_rough_mm,
        feed_xy: req.feed_xy,
        feed_z: req.feed_z,
        rapid: req.rapid,
        lead_r_mm: req.lead_r_mm,
        chord_tol_mm: CHORD_TOL_MM,
    };
    let mut toolpath = emit::emit(&centerline, &final_slowdown, &troch_flags, &emit_opts);
    emit::apply_session_override(&mut toolpath, req.session_override_factor);

    let stats = compute_stats(req, &toolpath, &levels, trochoid_arcs, &final_slowdown)?;
    Ok((toolpath, stats))
}

fn validate_request(req: &PlanRequest) -> CoreResult<()> {
    if !(0.5..=50.0).contains(&req.tool_diameter_mm) {
        return Err(CoreError::BadParameter(
            "tool_diameter_mm must be in [0.5, 50]".into(),
        ));
    }
    if !(0.1..=0.95).contains(&req.stepover) {
        return Err(CoreError::BadParameter("stepover must be in [0.1, 0.95]".into()));
    }
    if req.stepdown_mm <= 0.0 {
        return Err(CoreError::BadParameter("stepdown_mm must be > 0".into()));
    }
    if req.margin_mm < 0.0 {
        return Err(CoreError::BadParameter("margin_mm must be >= 0".into()));
    }
    if req.smoothing_radius_mm < 0.0 {
        return Err(CoreError::BadParameter("smoothing_radius_mm must be >= 0".into()));
    }
    for (name, v) in [
        ("feed_xy", req.feed_xy),
        ("feed_z", req.feed_z),
        ("rapid", req.rapid),
    ] {
        if v <= 0.0 {
            return Err(CoreError::BadParameter(format!("{name} must be > 0")));
        }
    }
    if req.safe_z_mm <= 0.0 {
        return Err(CoreError::BadParameter("safe_z_mm must be > 0".into()));
    }
    if req.z_rough_mm >= 0.0 {
        return Err(CoreError::BadParameter("z_rough_mm must be < 0".into()));
    }
    if !(0.0..=100.0).contains(&req.curvature.slowdown_feed_pct) {
        return Err(CoreError::BadParameter(
            "slowdown_feed_pct must be in [0, 100]".into(),
        ));
    }
    if let Some(f) = req.session_override_factor {
        if !(0.5..=1.5).contains(&f) {
            return Err(CoreError::BadParameter(
                "session_override_factor must be in [0.5, 1.5]".into(),
            ));
        }
    }
    Ok(())
}

fn compute_stats(
    req: &PlanRequest,
    toolpath: &Toolpath,
    levels: &[ring::RingLevel],
    trochoid_arcs: usize,
    slowdown: &[f64],
) -> CoreResult<PlanStats> {
    let length_mm: f64 = toolpath
        .moves
        .iter()
        .map(|m| m.from_point().dist3(&m.to_point()))
        .sum();
    let area_mm2 = geometry::area(&req.loops[0])
        - req.loops.iter().skip(1).map(geometry::area).sum::<f64>();

    let time_s_classic = motion::estimate_classic(toolpath)
        .map_err(|e| CoreError::BadParameter(e.to_string()))?;
    let (time_s_jerk, caps) = if let Some(profile) = &req.machine_profile {
        let est = motion::estimate_jerk_aware(toolpath, profile)
            .map_err(|e| CoreError::BadParameter(e.to_string()))?;
        (Some(est.total_seconds), CapCounts::tally(&est.bottlenecks))
    } else {
        (None, CapCounts::default())
    };
    let time_s = time_s_jerk.unwrap_or(time_s_classic);

    let stepdown_passes = (req.z_rough_mm.abs() / req.stepdown_mm).ceil().max(1.0);
    let volume_mm3 = area_mm2 * req.z_rough_mm.abs();
    let coverage_pct = if !req.loops.is_empty() {
        let outer_area = geometry::area(&req.loops[0]);
        if outer_area > 0.0 {
            (area_mm2 / outer_area * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    } else {
        0.0
    };
    let _ = stepdown_passes;

    let tight_segments = slowdown.iter().filter(|s| **s < 0.85).count();

    Ok(PlanStats {
        length_mm,
        area_mm2,
        time_s,
        time_s_classic,
        time_s_jerk,
        volume_mm3,
        coverage_pct,
        move_count: toolpath.moves.len(),
        tight_segments,
        trochoid_arcs,
        caps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    fn base_request() -> PlanRequest {
        PlanRequest {
            loops: vec![rect(0.0, 0.0, 100.0, 60.0)],
            units: Units::Mm,
            tool_diameter_mm: 6.0,
            stepover: 0.45,
            stepdown_mm: 2.0,
            margin_mm: 0.0,
            strategy: Strategy::Spiral,
            smoothing_radius_mm: 0.0,
            climb: true,
            feed_xy: 1200.0,
            feed_z: 300.0,
            rapid: 6000.0,
            safe_z_mm: 5.0,
            z_rough_mm: -2.0,
            curvature: CurvatureOptions::default(),
            trochoid: TrochoidOptions::default(),
            machine_profile: None,
            session_override_factor: None,
            lead_r_mm: 0.0,
        }
    }

    #[test]
    fn plans_rectangle_end_to_end() {
        let req = base_request();
        let (path, stats) = plan(&req).unwrap();
        assert!(path.is_continuous(1e-3));
        assert!(matches!(path.moves.first(), Some(Move::Rapid { .. })));
        assert!((stats.area_mm2 - 6000.0).abs() < 1e-6);
        assert!(stats.move_count > 0);
    }

    #[test]
    fn too_small_tool_diameter_is_bad_parameter() {
        let mut req = base_request();
        req.tool_diameter_mm = 0.3;
        assert!(matches!(plan(&req), Err(CoreError::BadParameter(_))));
    }

    #[test]
    fn pocket_too_small_for_tool() {
        let mut req = base_request();
        req.loops = vec![rect(0.0, 0.0, 5.0, 5.0)];
        assert!(matches!(plan(&req), Err(CoreError::PocketTooSmall(_))));
    }

    #[test]
    fn lanes_strategy_produces_valid_toolpath() {
        let mut req = base_request();
        req.strategy = Strategy::Lanes;
        let (path, _) = plan(&req).unwrap();
        assert!(path.is_continuous(1e-3));
    }
}
