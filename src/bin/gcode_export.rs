//! CLI entry point for `pocketcore gcode-export`: loads a previously stored
//! run's toolpath-bearing artifact is not re-derivable from the index alone,
//! so this binary re-runs `planner::plan` on the original request and
//! assembles G-code, writing the hash back onto a fresh artifact linked to
//! the originating run via `parent_plan_run_id`.

use std::env;

use chrono::Utc;
use pocketcore::config::Config;
use pocketcore::gcode::{self, AdaptiveFeedConfig, AdaptiveFeedMode, PostProcessorProfile};
use pocketcore::hashing::sha256_of_text;
use pocketcore::planner::{self, PlanRequest};
use pocketcore::store::{
    ArtifactHashes, ArtifactOutputs, Decision, GcodeOutput, RunArtifact, RunStatus, RunStore, WorkflowLinkage,
};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn generic_profile() -> PostProcessorProfile {
    PostProcessorProfile {
        id: "generic".into(),
        header: vec![],
        footer: vec!["M30".into()],
        adaptive_feed: AdaptiveFeedConfig {
            mode: AdaptiveFeedMode::Comment,
            slowdown_threshold: 0.85,
            inline_min_f: 100.0,
            mcode_start: "M51".into(),
            mcode_end: "M52".into(),
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "pocketcore=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env();
    let parent_run_id = parse_flag(&args, "--run-id")
        .ok_or_else(|| anyhow::anyhow!("--run-id is required"))?;
    let tool_id = parse_flag(&args, "--tool-id").unwrap_or_else(|| "unknown-tool".into());

    let store = RunStore::new(config.store_root.clone(), config.clone())?;
    let parent = store
        .get(&parent_run_id)?
        .ok_or_else(|| anyhow::anyhow!("run {parent_run_id} not found"))?;
    if parent.status != RunStatus::Ok {
        anyhow::bail!("run {parent_run_id} is not OK (status={:?}); refusing to export", parent.status);
    }
    let request: PlanRequest = serde_json::from_value(parent.request_summary.clone())?;

    let (toolpath, _stats) = planner::plan(&request)?;
    let profile = generic_profile();
    let now = Utc::now();
    let text = gcode::assemble(&toolpath, request.units, &profile, now);
    let gcode_sha256 = sha256_of_text(&text);

    let run_id = format!("run_{}", uuid::Uuid::new_v4().simple());
    let artifact = RunArtifact {
        run_id: run_id.clone(),
        created_at_utc: now,
        mode: "normal".into(),
        tool_id,
        status: RunStatus::Ok,
        event_type: "gcode_export".into(),
        request_summary: parent.request_summary.clone(),
        feasibility: parent.feasibility.clone(),
        decision: Decision {
            risk_level: parent.feasibility.risk_level,
            score: Some(parent.feasibility.score),
            block_reason: None,
            warnings: vec![],
            details: serde_json::json!({}),
        },
        hashes: ArtifactHashes {
            feasibility_sha256: parent.hashes.feasibility_sha256.clone(),
            toolpaths_sha256: parent.hashes.toolpaths_sha256.clone(),
            gcode_sha256: Some(gcode_sha256),
            opplan_sha256: None,
        },
        outputs: ArtifactOutputs {
            gcode: Some(GcodeOutput::from_text(text.clone())),
        },
        attachments: vec![],
        meta: Default::default(),
        linkage: WorkflowLinkage {
            parent_plan_run_id: Some(parent_run_id.clone()),
            ..Default::default()
        },
        mutable: Default::default(),
    };
    store.put(&artifact)?;

    println!("run_id={run_id} parent_run_id={parent_run_id} bytes={}", text.len());
    Ok(())
}
