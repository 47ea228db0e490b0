//! CLI entry point for `pocketcore verify-store`: rebuilds or checks the
//! run index against on-disk artifact files. Exit 0 on a clean store, exit
//! 2 if integrity problems are found (matching `verify_store.py`'s exit
//! codes in the original implementation).

use std::env;

use pocketcore::config::Config;
use pocketcore::store::RunStore;

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
    let store = RunStore::new(config.store_root.clone(), config)?;

    if has_flag(&args, "--rebuild") {
        let count = store.rebuild_index()?;
        println!("rebuilt index: {count} live entries");
    }

    let report = store.verify_integrity()?;
    println!("checked {} index entries", report.checked);
    if report.ok {
        println!("OK: store index is consistent");
        Ok(())
    } else {
        for problem in &report.problems {
            eprintln!("PROBLEM: {problem}");
        }
        std::process::exit(2);
    }
}
