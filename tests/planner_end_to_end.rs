//! End-to-end planner scenarios (rectangle pocket, undersized tool, tiny
//! pocket), mirroring the worked examples in the governance contract.

use pocketcore::geometry::Point;
use pocketcore::planner::{self, CurvatureOptions, PlanRequest, Strategy, TrochoidOptions, Units};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
    vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ]
}

fn base_request(loops: Vec<Vec<Point>>) -> PlanRequest {
    PlanRequest {
        loops,
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
        lead_r_mm: 2.0,
    }
}

#[test]
fn rectangle_pocket_produces_expected_area_and_continuous_path() {
    let req = base_request(vec![rect(0.0, 0.0, 100.0, 60.0)]);
    let (toolpath, stats) = planner::plan(&req).expect("plan should succeed");
    assert!((stats.area_mm2 - 6000.0).abs() < 1e-6);
    assert!(toolpath.is_continuous(1e-3));
    assert!(stats.move_count > 0);
    assert!(stats.time_s > 0.0);
}

#[test]
fn undersized_tool_is_rejected() {
    let mut req = base_request(vec![rect(0.0, 0.0, 100.0, 60.0)]);
    req.tool_diameter_mm = 0.3;
    let err = planner::plan(&req).unwrap_err();
    assert!(matches!(err, pocketcore::error::CoreError::BadParameter(_)));
}

#[test]
fn pocket_smaller_than_tool_plus_margin_fails() {
    let req = base_request(vec![rect(0.0, 0.0, 5.0, 5.0)]);
    let err = planner::plan(&req).unwrap_err();
    assert!(matches!(err, pocketcore::error::CoreError::PocketTooSmall(_)));
}

#[test]
fn lanes_strategy_also_produces_continuous_path() {
    let mut req = base_request(vec![rect(0.0, 0.0, 100.0, 60.0)]);
    req.strategy = Strategy::Lanes;
    let (toolpath, stats) = planner::plan(&req).expect("plan should succeed");
    assert!(toolpath.is_continuous(1e-3));
    assert!(stats.area_mm2 > 0.0);
}

#[test]
fn island_strictly_inside_outer_is_honored() {
    let outer = rect(0.0, 0.0, 100.0, 60.0);
    let island = rect(40.0, 20.0, 60.0, 40.0);
    let mut island_cw = island.clone();
    island_cw.reverse(); // islands are CW
    let req = base_request(vec![outer, island_cw]);
    let (toolpath, stats) = planner::plan(&req).expect("plan should succeed");
    assert!(stats.area_mm2 < 6000.0);
    assert!(toolpath.is_continuous(1e-3));

    for mv in toolpath.moves.iter().filter(|m| m.is_cutting()) {
        let p = mv.to_point().to_xy();
        assert!(
            !pocketcore::geometry::point_in_polygon(&p, &island),
            "cutting move at ({}, {}) lies inside the island",
            p.x,
            p.y
        );
    }
}

#[test]
fn session_override_factor_scales_cutting_feed_within_clamp() {
    let mut req = base_request(vec![rect(0.0, 0.0, 100.0, 60.0)]);
    req.session_override_factor = Some(3.0); // clamps to 1.5
    let (toolpath, _stats) = planner::plan(&req).expect("plan should succeed");
    let max_feed = toolpath
        .moves
        .iter()
        .filter(|m| m.is_cutting())
        .map(|m| m.feed())
        .fold(0.0_f64, f64::max);
    assert!(max_feed <= req.feed_xy * 1.5 + 1e-6);
}
