//! Append-only delete audit log (§4.F, §5 "Audit writes are best-effort").
//!
//! Ported from `original_source/.../audit_export.py` / `cli_audit.py`:
//! one JSON line per delete attempt, never rewritten, fsync-best-effort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Success,
    NotFound,
    RateLimited,
    Forbidden,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: String,
    pub mode: String,
    pub reason: String,
    pub actor: String,
    pub request_id: String,
    pub outcome: DeleteOutcome,
    pub at_utc: DateTime<Utc>,
}

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(store_root: &Path) -> Self {
        Self {
            path: store_root.join("_audit").join("deletes.jsonl"),
        }
    }

    /// Append one line. Failure to write is logged via `tracing` and
    /// swallowed: audit writes never change the outcome of the caller's
    /// operation.
    pub fn append(&self, record: &AuditRecord) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            let line = serde_json::to_string(record)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{line}")?;
            let _ = file.sync_data();
            Ok(())
        })();
        if let Err(e) = result {
            tracing::warn!(error = %e, "audit log write failed");
        }
    }

    pub fn read_all(&self) -> std::io::Result<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let text = std::fs::read_to_string(&self.path)?;
        Ok(text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}

/// Read-only rollup: counts by outcome, for the `verify_store --audit-summary`
/// CLI flag and `audit_export.py`'s reporting use case.
pub fn summarize(records: &[AuditRecord]) -> std::collections::HashMap<DeleteOutcome, usize> {
    let mut counts = std::collections::HashMap::new();
    for r in records {
        *counts.entry(r.outcome).or_insert(0) += 1;
    }
    counts
}
