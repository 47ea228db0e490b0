//! CLI entry point for `pocketcore plan`: reads a `PlanRequest` as JSON from
//! a file or stdin, runs the governed feasibility -> plan -> store flow,
//! and prints the §6 response contract as JSON on stdout.

use std::{env, fs, io::Read as _};

use chrono::Utc;
use pocketcore::config::Config;
use pocketcore::feasibility::FeasibilityContext;
use pocketcore::governed::{plan_governed, PlanOutcome};
use pocketcore::planner::PlanRequest;
use pocketcore::store::RunStore;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn read_request(args: &[String]) -> anyhow::Result<PlanRequest> {
    let text = match parse_flag(args, "--request") {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read request file {path}: {e}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| anyhow::anyhow!("read request from stdin: {e}"))?;
            buf
        }
    };
    serde_json::from_str(&text).map_err(|e| anyhow::anyhow!("parse PlanRequest: {e}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "pocketcore=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env();
    let tool_id = parse_flag(&args, "--tool-id").unwrap_or_else(|| "unknown-tool".into());

    let request = read_request(&args)?;
    let store = RunStore::new(config.store_root.clone(), config)?;
    let ctx = FeasibilityContext::default();

    let outcome = plan_governed(&request, &ctx, &store, &tool_id, Utc::now())?;

    match outcome {
        PlanOutcome::Ok(resp) => {
            println!(
                "run_id={} status=OK moves={} length_mm={:.2} time_s={:.2}",
                resp.run_id,
                resp.moves.len(),
                resp.stats.length_mm,
                resp.stats.time_s
            );
            println!("{}", serde_json::to_string(&resp)?);
            Ok(())
        }
        PlanOutcome::Blocked(resp) => {
            eprintln!("BLOCKED: {:?}", resp.blocking_reasons);
            println!("run_id={} status=BLOCKED", resp.run_id);
            println!("{}", serde_json::to_string(&resp)?);
            std::process::exit(1);
        }
    }
}
