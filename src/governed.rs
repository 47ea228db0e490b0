//! Plan endpoint contract (§6): feasibility, then the planner, then the
//! run-artifact store, behind one library call a CLI or an HTTP handler
//! can both use. The module holds no argv/request-body parsing of its
//! own — that stays in `src/bin/plan.rs`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::feasibility::{self, FeasibilityContext, RiskLevel};
use crate::hashing::sha256_of_obj;
use crate::planner::{self, Move, PlanRequest, PlanStats};
use crate::store::{ArtifactHashes, ArtifactOutputs, Decision, RunArtifact, RunStatus, RunStore, WorkflowLinkage};

/// A point-anchored call-out drawn alongside the toolpath in a viewer —
/// currently just the curvature slowdown zones, one overlay per move whose
/// feed was scaled down for a tight corner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHashes {
    pub request_sha256: String,
    pub moves_sha256: String,
}

/// Response for a plan that ran to completion (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub moves: Vec<Move>,
    pub stats: PlanStats,
    pub overlays: Vec<Overlay>,
    pub run_id: String,
    pub hashes: ResponseHashes,
}

/// Response for a plan feasibility blocked before any moves were produced
/// (§8 scenario 3: "no moves array").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedResponse {
    pub run_id: String,
    pub risk_level: RiskLevel,
    pub feasibility_sha256: String,
    pub blocking_reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Ok(PlanResponse),
    Blocked(BlockedResponse),
}

/// Run feasibility against `request`; if it blocks, persist a `Blocked`
/// artifact and return `PlanOutcome::Blocked` with no moves. Otherwise run
/// the planner, persist an `Ok` artifact, and return the full response.
pub fn plan_governed(
    request: &PlanRequest,
    ctx: &FeasibilityContext,
    store: &RunStore,
    tool_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<PlanOutcome> {
    let run_id = format!("run_{}", uuid::Uuid::new_v4().simple());
    let request_sha256 = sha256_of_obj(request)?;
    let result = feasibility::compute(request, ctx, now);
    let feasibility_sha256 = sha256_of_obj(&result)?;
    let request_summary = serde_json::to_value(request)?;

    if result.blocking {
        let artifact = RunArtifact {
            run_id: run_id.clone(),
            created_at_utc: now,
            mode: "normal".into(),
            tool_id: tool_id.to_string(),
            status: RunStatus::Blocked,
            event_type: "plan".into(),
            request_summary,
            feasibility: result.clone(),
            decision: Decision {
                risk_level: result.risk_level,
                score: Some(result.score),
                block_reason: result.blocking_reasons.first().cloned(),
                warnings: result.warnings.clone(),
                details: serde_json::json!({}),
            },
            hashes: ArtifactHashes {
                feasibility_sha256: feasibility_sha256.clone(),
                toolpaths_sha256: None,
                gcode_sha256: None,
                opplan_sha256: None,
            },
            outputs: ArtifactOutputs::default(),
            attachments: vec![],
            meta: Default::default(),
            linkage: WorkflowLinkage::default(),
            mutable: Default::default(),
        };
        store.put(&artifact)?;
        return Ok(PlanOutcome::Blocked(BlockedResponse {
            run_id,
            risk_level: result.risk_level,
            feasibility_sha256,
            blocking_reasons: result.blocking_reasons,
        }));
    }

    let (toolpath, stats) = planner::plan(request)?;
    let moves_sha256 = sha256_of_obj(&toolpath.moves)?;
    let overlays = build_overlays(&toolpath);

    let artifact = RunArtifact {
        run_id: run_id.clone(),
        created_at_utc: now,
        mode: "normal".into(),
        tool_id: tool_id.to_string(),
        status: RunStatus::Ok,
        event_type: "plan".into(),
        request_summary,
        feasibility: result.clone(),
        decision: Decision {
            risk_level: result.risk_level,
            score: Some(result.score),
            block_reason: None,
            warnings: result.warnings.clone(),
            details: serde_json::json!({}),
        },
        hashes: ArtifactHashes {
            feasibility_sha256,
            toolpaths_sha256: Some(moves_sha256.clone()),
            gcode_sha256: None,
            opplan_sha256: None,
        },
        outputs: ArtifactOutputs::default(),
        attachments: vec![],
        meta: Default::default(),
        linkage: WorkflowLinkage::default(),
        mutable: Default::default(),
    };
    store.put(&artifact)?;

    Ok(PlanOutcome::Ok(PlanResponse {
        moves: toolpath.moves,
        stats,
        overlays,
        run_id,
        hashes: ResponseHashes {
            request_sha256,
            moves_sha256,
        },
    }))
}

fn build_overlays(toolpath: &planner::Toolpath) -> Vec<Overlay> {
    toolpath
        .moves
        .iter()
        .filter_map(|mv| {
            let meta = mv.meta()?;
            let scale = meta.slowdown?;
            if scale >= 0.85 {
                return None;
            }
            let to = mv.to_point();
            Some(Overlay {
                kind: "slowdown".into(),
                x: to.x,
                y: to.y,
                note: Some(format!("feed x{scale:.2}")),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geometry::Point;
    use crate::planner::{CurvatureOptions, Strategy, TrochoidOptions, Units};
    use tempfile::tempdir;

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
            lead_r_mm: 2.0,
        }
    }

    #[test]
    fn ok_plan_round_trips_hashes_and_persists_artifact() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        let req = base_request();
        let outcome = plan_governed(&req, &FeasibilityContext::default(), &store, "t1", Utc::now()).unwrap();
        match outcome {
            PlanOutcome::Ok(resp) => {
                assert!(!resp.moves.is_empty());
                assert_eq!(resp.hashes.moves_sha256.len(), 64);
                assert_eq!(resp.hashes.request_sha256.len(), 64);
                let stored = store.get(&resp.run_id).unwrap().expect("artifact persisted");
                assert_eq!(stored.status, RunStatus::Ok);
            }
            PlanOutcome::Blocked(_) => panic!("expected an Ok outcome"),
        }
    }

    #[test]
    fn blocked_plan_has_no_moves_and_persists_blocked_artifact() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        let req = base_request();
        let ctx = FeasibilityContext {
            svg_has_script: true,
            ..FeasibilityContext::default()
        };
        let outcome = plan_governed(&req, &ctx, &store, "t1", Utc::now()).unwrap();
        match outcome {
            PlanOutcome::Blocked(resp) => {
                let stored = store.get(&resp.run_id).unwrap().expect("artifact persisted");
                assert_eq!(stored.status, RunStatus::Blocked);
            }
            PlanOutcome::Ok(_) => panic!("expected a Blocked outcome"),
        }
    }
}
