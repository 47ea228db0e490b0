//! CLI entry point for `pocketcore delete-run`: soft or hard deletes a run,
//! subject to the same policy and rate-limit checks the store enforces.
//!
//! Exit codes: 0 success, 1 not found / bad input, 2 rate limited,
//! 3 policy denied.

use std::env;

use pocketcore::config::{Config, DeleteMode};
use pocketcore::error::CoreError;
use pocketcore::store::{DeleteRequest, RunStore};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "pocketcore=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env();

    let run_id = match parse_flag(&args, "--run-id") {
        Some(v) => v,
        None => {
            eprintln!("--run-id is required");
            std::process::exit(1);
        }
    };
    let mode = match parse_flag(&args, "--mode") {
        Some(v) if v.eq_ignore_ascii_case("hard") => DeleteMode::Hard,
        Some(v) if v.eq_ignore_ascii_case("soft") => DeleteMode::Soft,
        Some(other) => {
            eprintln!("--mode must be 'soft' or 'hard', got '{other}'");
            std::process::exit(1);
        }
        None => config.delete_default_mode,
    };
    let reason = parse_flag(&args, "--reason").unwrap_or_else(|| "unspecified".into());
    let actor = parse_flag(&args, "--actor").unwrap_or_else(|| "cli".into());
    let request_id = parse_flag(&args, "--request-id").unwrap_or_else(|| format!("req-{}", uuid::Uuid::new_v4()));
    let admin_asserted = has_flag(&args, "--admin");

    let store = RunStore::new(config.store_root.clone(), config)?;
    let result = store.delete_run(&DeleteRequest {
        run_id: run_id.clone(),
        mode,
        reason,
        actor,
        request_id,
        admin_asserted,
    });

    match result {
        Ok(outcome) => {
            println!("run_id={run_id} outcome={outcome:?}");
            Ok(())
        }
        Err(CoreError::NotFound(_)) => {
            eprintln!("run {run_id} not found");
            std::process::exit(1);
        }
        Err(CoreError::BadParameter(msg)) => {
            eprintln!("{msg}");
            std::process::exit(1);
        }
        Err(CoreError::RateLimited(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(CoreError::PolicyDenied(msg)) => {
            eprintln!("{msg}");
            std::process::exit(3);
        }
        Err(e) => Err(e.into()),
    }
}
