//! Immutable, content-addressed run-artifact governance store (§4.F).
//!
//! Ported from `original_source/.../store.py`: date-partitioned JSON files
//! on disk, a single lightweight index for queries, append-only advisory
//! link files, and soft/hard delete behind rate limiting and audit logging.
//! A single in-process `Mutex` serializes index read-modify-write the way
//! the original's process-local lock does (no cross-process coordination;
//! see DESIGN.md).

pub mod audit;
pub mod delete;
pub mod index;
pub mod mutable;

pub use audit::{AuditLog, AuditRecord, DeleteOutcome};
pub use delete::{check_policy, PolicyDecision, RateLimiter};
pub use index::{AdvisoryRollup, IndexEntry, IndexFilter, IndexRow, LineageMeta, Tombstone};
pub use mutable::{AdvisoryRef, AdvisoryReview, ExplanationStatus, ManufacturingCandidate, MutableFields};

use crate::attachments::AttachmentRef;
use crate::config::{Config, DeleteMode};
use crate::error::{CoreError, CoreResult};
use crate::feasibility::FeasibilityResult;
use crate::hashing::stable_json_dumps;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

/// Minimum trimmed length for a delete `reason` (§4.F).
const MIN_DELETE_REASON_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Ok,
    Blocked,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub risk_level: crate::feasibility::RiskLevel,
    pub score: Option<u8>,
    pub block_reason: Option<String>,
    pub warnings: Vec<String>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactHashes {
    pub feasibility_sha256: String,
    pub toolpaths_sha256: Option<String>,
    pub gcode_sha256: Option<String>,
    pub opplan_sha256: Option<String>,
}

/// Either inline text (≤200KB) or a path to the on-disk blob, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GcodeOutput {
    Inline(String),
    Path(String),
}

const INLINE_GCODE_LIMIT_BYTES: usize = 200 * 1024;

impl GcodeOutput {
    pub fn from_text(text: String) -> Self {
        if text.len() <= INLINE_GCODE_LIMIT_BYTES {
            GcodeOutput::Inline(text)
        } else {
            GcodeOutput::Path(String::new())
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactOutputs {
    pub gcode: Option<GcodeOutput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowLinkage {
    pub workflow_session_id: Option<String>,
    pub batch_label: Option<String>,
    pub parent_plan_run_id: Option<String>,
    pub parent_batch_plan_artifact_id: Option<String>,
    pub parent_batch_spec_artifact_id: Option<String>,
}

/// The persisted artifact (§3). Immutable after `put`, save for the fields
/// in `MutableFields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    pub run_id: String,
    pub created_at_utc: DateTime<Utc>,
    pub mode: String,
    pub tool_id: String,
    pub status: RunStatus,
    pub event_type: String,
    pub request_summary: serde_json::Value,
    pub feasibility: FeasibilityResult,
    pub decision: Decision,
    pub hashes: ArtifactHashes,
    pub outputs: ArtifactOutputs,
    pub attachments: Vec<AttachmentRef>,
    pub meta: HashMap<String, String>,
    pub linkage: WorkflowLinkage,
    #[serde(default)]
    pub mutable: MutableFields,
}

impl RunArtifact {
    fn partition(&self) -> String {
        self.created_at_utc.format("%Y-%m-%d").to_string()
    }

    fn validate(&self) -> CoreResult<()> {
        if !crate::hashing::is_well_formed_sha256(&self.hashes.feasibility_sha256) {
            return Err(CoreError::BadParameter(
                "hashes.feasibility_sha256 must be 64 hex chars".into(),
            ));
        }
        if self.status == RunStatus::Ok
            && self.hashes.toolpaths_sha256.is_none()
            && self.hashes.gcode_sha256.is_none()
        {
            tracing::warn!(run_id = %self.run_id, "OK artifact has neither toolpaths_sha256 nor gcode_sha256");
        }
        Ok(())
    }

    fn to_index_entry(&self) -> IndexEntry {
        IndexEntry {
            run_id: self.run_id.clone(),
            created_at_utc: self.created_at_utc,
            partition: self.partition(),
            event_type: self.event_type.clone(),
            status: format!("{:?}", self.status).to_uppercase(),
            tool_id: self.tool_id.clone(),
            mode: self.mode.clone(),
            lineage: LineageMeta {
                session_id: self.linkage.workflow_session_id.clone(),
                batch_label: self.linkage.batch_label.clone(),
                parent_plan_run_id: self.linkage.parent_plan_run_id.clone(),
                parent_batch_plan_artifact_id: self.linkage.parent_batch_plan_artifact_id.clone(),
                parent_batch_spec_artifact_id: self.linkage.parent_batch_spec_artifact_id.clone(),
            },
            advisories: AdvisoryRollup {
                count: self.mutable.advisory_inputs.len() as u32,
                kinds: self
                    .mutable
                    .advisory_inputs
                    .iter()
                    .map(|a| a.kind.clone())
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub total: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub run_id: String,
    pub mode: DeleteMode,
    pub reason: String,
    pub actor: String,
    pub request_id: String,
    pub admin_asserted: bool,
}

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub ok: bool,
    pub checked: usize,
    pub problems: Vec<String>,
}

pub struct RunStore {
    root: PathBuf,
    config: Config,
    lock: Mutex<()>,
    rate_limiter: Mutex<RateLimiter>,
    audit: AuditLog,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> CoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let rate_limiter = RateLimiter::new(config.delete_rate_limit_max, config.delete_rate_limit_window_sec);
        let audit = AuditLog::new(&root);
        Ok(Self {
            root,
            config,
            lock: Mutex::new(()),
            rate_limiter: Mutex::new(rate_limiter),
            audit,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("_index.json")
    }

    fn advisory_lookup_path(&self) -> PathBuf {
        self.root.join("_advisory_lookup.json")
    }

    fn artifact_path(&self, partition: &str, run_id: &str) -> PathBuf {
        self.root.join(partition).join(format!("{run_id}.json"))
    }

    fn advisory_link_path(&self, partition: &str, run_id: &str, advisory_id: &str) -> PathBuf {
        self.root
            .join(partition)
            .join(format!("{run_id}_advisory_{advisory_id}.json"))
    }

    fn load_index(&self) -> CoreResult<HashMap<String, IndexRow>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_index(&self, index: &HashMap<String, IndexRow>) -> CoreResult<()> {
        let path = self.index_path();
        let text = stable_json_dumps(index)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load_advisory_lookup(&self) -> CoreResult<HashMap<String, AdvisoryLookupEntry>> {
        let path = self.advisory_lookup_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_advisory_lookup(&self, lookup: &HashMap<String, AdvisoryLookupEntry>) -> CoreResult<()> {
        let path = self.advisory_lookup_path();
        let text = stable_json_dumps(lookup)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Write a brand-new artifact. Refuses to overwrite an existing one.
    pub fn put(&self, artifact: &RunArtifact) -> CoreResult<()> {
        artifact.validate()?;
        let _guard = self.lock.lock().unwrap();
        let partition = artifact.partition();
        let path = self.artifact_path(&partition, &artifact.run_id);
        if path.exists() {
            return Err(CoreError::Immutable(artifact.run_id.clone()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = stable_json_dumps(artifact)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;

        let mut index = self.load_index()?;
        index.insert(artifact.run_id.clone(), IndexRow::Live(artifact.to_index_entry()));
        self.write_index(&index)?;
        Ok(())
    }

    /// Locate a run by id: index lookup first, then a reverse-chronological
    /// partition scan as a fallback for an index that has fallen behind.
    pub fn get(&self, run_id: &str) -> CoreResult<Option<RunArtifact>> {
        let index = self.load_index()?;
        if let Some(row) = index.get(run_id) {
            if row.is_tombstone() {
                return Ok(None);
            }
            if let Some(entry) = row.as_live() {
                if let Some(artifact) = self.read_artifact_file(&entry.partition, run_id)? {
                    return Ok(Some(self.with_advisory_links(artifact)?));
                }
            }
        }
        // Fallback: scan partitions newest-first.
        let mut partitions: Vec<PathBuf> = fs::read_dir(&self.root)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir() && !p.file_name().map(|n| n.to_string_lossy().starts_with('_')).unwrap_or(true))
            .collect();
        partitions.sort();
        partitions.reverse();
        for dir in partitions {
            let partition = dir.file_name().unwrap().to_string_lossy().to_string();
            if let Some(artifact) = self.read_artifact_file(&partition, run_id)? {
                return Ok(Some(self.with_advisory_links(artifact)?));
            }
        }
        Ok(None)
    }

    fn read_artifact_file(&self, partition: &str, run_id: &str) -> CoreResult<Option<RunArtifact>> {
        let path = self.artifact_path(partition, run_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn with_advisory_links(&self, mut artifact: RunArtifact) -> CoreResult<RunArtifact> {
        let partition = artifact.partition();
        let dir = self.root.join(&partition);
        let prefix = format!("{}_advisory_", artifact.run_id);
        if let Ok(entries) = fs::read_dir(&dir) {
            let mut links = Vec::new();
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with(&prefix) && name.ends_with(".json") {
                    let bytes = fs::read(entry.path())?;
                    if let Ok(link) = serde_json::from_slice::<AdvisoryRef>(&bytes) {
                        links.push(link);
                    }
                }
            }
            links.sort_by(|a, b| a.created_at_utc.cmp(&b.created_at_utc));
            artifact.mutable.advisory_inputs = links;
        }
        Ok(artifact)
    }

    /// Overwrite the artifact file in place after mutating only the
    /// narrowly-controlled mutable subset (§3). Callers mutate `artifact`
    /// via `record_decision`/`review_advisory`/etc. before calling this.
    pub fn update_mutable_fields(&self, artifact: &RunArtifact) -> CoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        let partition = artifact.partition();
        let path = self.artifact_path(&partition, &artifact.run_id);
        if !path.exists() {
            return Err(CoreError::NotFound(artifact.run_id.clone()));
        }
        let text = stable_json_dumps(artifact)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;

        let mut index = self.load_index()?;
        index.insert(artifact.run_id.clone(), IndexRow::Live(artifact.to_index_entry()));
        self.write_index(&index)?;
        Ok(())
    }

    /// Append-only advisory attachment. Duplicate `advisory_id` is a no-op
    /// returning the existing ref.
    pub fn attach_advisory(
        &self,
        run_id: &str,
        advisory_id: &str,
        kind: &str,
        sha256: &str,
    ) -> CoreResult<AdvisoryRef> {
        let _guard = self.lock.lock().unwrap();
        let mut lookup = self.load_advisory_lookup()?;
        if let Some(existing) = lookup.get(advisory_id) {
            return Ok(AdvisoryRef {
                advisory_id: advisory_id.to_string(),
                sha256: existing.sha256.clone(),
                kind: existing.kind.clone(),
                created_at_utc: existing.created_at_utc,
            });
        }

        let index = self.load_index()?;
        let entry = index
            .get(run_id)
            .and_then(|r| r.as_live())
            .ok_or_else(|| CoreError::NotFound(run_id.to_string()))?;
        let partition = entry.partition.clone();

        let now = Utc::now();
        let aref = AdvisoryRef {
            advisory_id: advisory_id.to_string(),
            sha256: sha256.to_string(),
            kind: kind.to_string(),
            created_at_utc: now,
        };
        let link_path = self.advisory_link_path(&partition, run_id, advisory_id);
        if let Some(parent) = link_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = stable_json_dumps(&aref)?;
        let tmp = link_path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &link_path)?;

        lookup.insert(
            advisory_id.to_string(),
            AdvisoryLookupEntry {
                run_id: run_id.to_string(),
                sha256: sha256.to_string(),
                kind: kind.to_string(),
                created_at_utc: now,
            },
        );
        self.write_advisory_lookup(&lookup)?;

        let mut index = index;
        if let IndexRow::Live(e) = index.get_mut(run_id).unwrap() {
            e.advisories.count += 1;
            if !e.advisories.kinds.contains(&kind.to_string()) {
                e.advisories.kinds.push(kind.to_string());
            }
        }
        self.write_index(&index)?;

        Ok(aref)
    }

    /// Filter+paginate over the index, sorted `created_at_utc desc, run_id desc`.
    pub fn list_runs_filtered(&self, filter: &IndexFilter, limit: usize, offset: usize) -> CoreResult<Page<IndexEntry>> {
        let index = self.load_index()?;
        let mut matched: Vec<IndexEntry> = index
            .values()
            .filter_map(|r| r.as_live())
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at_utc.cmp(&a.created_at_utc).then(b.run_id.cmp(&a.run_id)));
        let total = matched.len();
        let page: Vec<IndexEntry> = matched.into_iter().skip(offset).take(limit).collect();
        Ok(Page {
            items: page,
            next_cursor: None,
            total: Some(total),
        })
    }

    pub fn count_runs_filtered(&self, filter: &IndexFilter) -> CoreResult<usize> {
        let index = self.load_index()?;
        Ok(index
            .values()
            .filter_map(|r| r.as_live())
            .filter(|e| filter.matches(e))
            .count())
    }

    /// Cursor-paginated recent-runs query. Cursor is `<created_at_utc>|<run_id>`;
    /// "older than cursor" is strict lexicographic on that composite key.
    pub fn query_recent(&self, limit: usize, cursor: Option<&str>) -> CoreResult<Page<IndexEntry>> {
        let index = self.load_index()?;
        let mut all: Vec<IndexEntry> = index.values().filter_map(|r| r.as_live()).cloned().collect();
        all.sort_by(|a, b| b.created_at_utc.cmp(&a.created_at_utc).then(b.run_id.cmp(&a.run_id)));

        let start = match cursor {
            None => 0,
            Some(c) => all
                .iter()
                .position(|e| composite_key(e).as_str() < c)
                .unwrap_or(all.len()),
        };
        let page: Vec<IndexEntry> = all.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = if start + page.len() < all.len() {
            page.last().map(composite_key)
        } else {
            None
        };
        Ok(Page {
            items: page,
            next_cursor,
            total: Some(all.len()),
        })
    }

    /// Rebuild `_index.json` from on-disk artifact files, skipping tombstones,
    /// temp files, and advisory link files.
    pub fn rebuild_index(&self) -> CoreResult<usize> {
        let _guard = self.lock.lock().unwrap();
        let old_index = self.load_index()?;
        let mut new_index: HashMap<String, IndexRow> = HashMap::new();
        for (run_id, row) in old_index.iter() {
            if row.is_tombstone() {
                new_index.insert(run_id.clone(), row.clone());
            }
        }

        let mut partitions: Vec<PathBuf> = fs::read_dir(&self.root)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir() && !p.file_name().map(|n| n.to_string_lossy().starts_with('_')).unwrap_or(true))
            .collect();
        partitions.sort();

        let mut count = 0;
        for dir in partitions {
            for entry in fs::read_dir(&dir)?.flatten() {
                let path = entry.path();
                let name = path.file_name().unwrap().to_string_lossy().to_string();
                if !name.ends_with(".json") || name.ends_with(".tmp") || name.contains("_advisory_") {
                    continue;
                }
                let bytes = fs::read(&path)?;
                if let Ok(artifact) = serde_json::from_slice::<RunArtifact>(&bytes) {
                    if !new_index.contains_key(&artifact.run_id) {
                        new_index.insert(artifact.run_id.clone(), IndexRow::Live(artifact.to_index_entry()));
                        count += 1;
                    }
                }
            }
        }
        self.write_index(&new_index)?;
        Ok(count)
    }

    /// Walk the index and confirm every live entry has a corresponding
    /// artifact file on disk.
    pub fn verify_integrity(&self) -> CoreResult<IntegrityReport> {
        let index = self.load_index()?;
        let mut problems = Vec::new();
        let mut checked = 0;
        for (run_id, row) in index.iter() {
            if row.is_tombstone() {
                continue;
            }
            checked += 1;
            let entry = row.as_live().unwrap();
            let path = self.artifact_path(&entry.partition, run_id);
            if !path.exists() {
                problems.push(format!("index entry {run_id} has no artifact file at {}", path.display()));
                continue;
            }
            match fs::read(&path) {
                Ok(bytes) => {
                    if serde_json::from_slice::<RunArtifact>(&bytes).is_err() {
                        problems.push(format!("artifact file for {run_id} does not parse"));
                    }
                }
                Err(e) => problems.push(format!("failed to read artifact file for {run_id}: {e}")),
            }
        }
        Ok(IntegrityReport {
            ok: problems.is_empty(),
            checked,
            problems,
        })
    }

    /// Soft or hard delete a run, subject to policy and per-actor rate
    /// limiting. Always writes an audit record; audit failures never change
    /// the outcome.
    pub fn delete_run(&self, req: &DeleteRequest) -> CoreResult<DeleteOutcome> {
        if req.reason.trim().len() < MIN_DELETE_REASON_LEN {
            return Err(CoreError::BadParameter(format!(
                "delete reason must be at least {MIN_DELETE_REASON_LEN} characters"
            )));
        }

        let policy = check_policy(&self.config, req.mode, req.admin_asserted);
        if policy == PolicyDecision::Forbidden {
            self.record_audit(req, DeleteOutcome::Forbidden);
            return Err(CoreError::PolicyDenied(format!("{:?} delete denied by policy", req.mode)));
        }

        let within_quota = {
            let mut limiter = self.rate_limiter.lock().unwrap();
            limiter.check_and_record(&req.actor, Instant::now())
        };
        if !within_quota {
            self.record_audit(req, DeleteOutcome::RateLimited);
            return Err(CoreError::RateLimited(format!("actor {} exceeded delete quota", req.actor)));
        }

        let _guard = self.lock.lock().unwrap();
        let mut index = self.load_index()?;
        let entry = match index.get(&req.run_id).and_then(|r| r.as_live()).cloned() {
            Some(e) => e,
            None => {
                drop(_guard);
                self.record_audit(req, DeleteOutcome::NotFound);
                return Err(CoreError::NotFound(req.run_id.clone()));
            }
        };

        match req.mode {
            DeleteMode::Soft => {
                index.insert(
                    req.run_id.clone(),
                    IndexRow::Tombstoned(Tombstone {
                        deleted: true,
                        deleted_at: Utc::now(),
                        reason: req.reason.clone(),
                        actor: req.actor.clone(),
                    }),
                );
                self.write_index(&index)?;
            }
            DeleteMode::Hard => {
                let path = self.artifact_path(&entry.partition, &req.run_id);
                if path.exists() {
                    fs::remove_file(&path)?;
                }
                index.remove(&req.run_id);
                self.write_index(&index)?;
            }
        }
        drop(_guard);
        self.record_audit(req, DeleteOutcome::Success);
        Ok(DeleteOutcome::Success)
    }

    fn record_audit(&self, req: &DeleteRequest, outcome: DeleteOutcome) {
        self.audit.append(&AuditRecord {
            run_id: req.run_id.clone(),
            mode: format!("{:?}", req.mode).to_lowercase(),
            reason: req.reason.clone(),
            actor: req.actor.clone(),
            request_id: req.request_id.clone(),
            outcome,
            at_utc: Utc::now(),
        });
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AdvisoryLookupEntry {
    run_id: String,
    sha256: String,
    kind: String,
    created_at_utc: DateTime<Utc>,
}

fn composite_key(entry: &IndexEntry) -> String {
    format!("{}|{}", entry.created_at_utc.to_rfc3339(), entry.run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feasibility::RiskLevel;
    use tempfile::tempdir;

    fn sample_artifact(run_id: &str, status: RunStatus) -> RunArtifact {
        RunArtifact {
            run_id: run_id.to_string(),
            created_at_utc: Utc::now(),
            mode: "normal".into(),
            tool_id: "t1".into(),
            status,
            event_type: "plan".into(),
            request_summary: serde_json::json!({"tool_diameter_mm": 6.0}),
            feasibility: FeasibilityResult {
                risk_level: RiskLevel::Green,
                score: 100,
                blocking: false,
                warnings: vec![],
                blocking_reasons: vec![],
                engine_version: "1.0.0".into(),
                computed_at_utc: Utc::now(),
            },
            decision: Decision {
                risk_level: RiskLevel::Green,
                score: Some(100),
                block_reason: None,
                warnings: vec![],
                details: serde_json::json!({}),
            },
            hashes: ArtifactHashes {
                feasibility_sha256: crate::hashing::sha256_of_text("fz"),
                toolpaths_sha256: Some(crate::hashing::sha256_of_text("tp")),
                gcode_sha256: None,
                opplan_sha256: None,
            },
            outputs: ArtifactOutputs::default(),
            attachments: vec![],
            meta: HashMap::new(),
            linkage: WorkflowLinkage::default(),
            mutable: MutableFields::default(),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        let artifact = sample_artifact("run-1", RunStatus::Ok);
        store.put(&artifact).unwrap();
        let fetched = store.get("run-1").unwrap().unwrap();
        assert_eq!(fetched.run_id, "run-1");
        assert_eq!(fetched.hashes.feasibility_sha256, artifact.hashes.feasibility_sha256);
    }

    #[test]
    fn second_put_with_same_run_id_is_immutable() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        let artifact = sample_artifact("run-1", RunStatus::Ok);
        store.put(&artifact).unwrap();
        let err = store.put(&artifact).unwrap_err();
        assert!(matches!(err, CoreError::Immutable(_)));
    }

    #[test]
    fn attach_advisory_is_append_only_and_dedups() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        let artifact = sample_artifact("run-1", RunStatus::Ok);
        store.put(&artifact).unwrap();
        let a1 = store.attach_advisory("run-1", "adv-1", "risk_note", "abc").unwrap();
        let a2 = store.attach_advisory("run-1", "adv-1", "risk_note", "different").unwrap();
        assert_eq!(a1.sha256, a2.sha256);
        let fetched = store.get("run-1").unwrap().unwrap();
        assert_eq!(fetched.mutable.advisory_inputs.len(), 1);
    }

    #[test]
    fn list_runs_filtered_sorts_desc_and_paginates() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        for i in 0..5 {
            let mut a = sample_artifact(&format!("run-{i}"), RunStatus::Ok);
            a.created_at_utc = Utc::now() + chrono::Duration::seconds(i);
            store.put(&a).unwrap();
        }
        let page = store.list_runs_filtered(&IndexFilter::default(), 2, 0).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].run_id, "run-4");
        assert_eq!(page.total, Some(5));
    }

    #[test]
    fn soft_delete_hides_run_and_hard_delete_removes_file() {
        let mut config = Config::default();
        config.delete_allow_hard = true;
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), config).unwrap();
        store.put(&sample_artifact("run-1", RunStatus::Ok)).unwrap();
        store.put(&sample_artifact("run-2", RunStatus::Ok)).unwrap();

        store
            .delete_run(&DeleteRequest {
                run_id: "run-1".into(),
                mode: DeleteMode::Soft,
                reason: "cleanup".into(),
                actor: "tester".into(),
                request_id: "req-1".into(),
                admin_asserted: false,
            })
            .unwrap();
        assert!(store.get("run-1").unwrap().is_none());

        store
            .delete_run(&DeleteRequest {
                run_id: "run-2".into(),
                mode: DeleteMode::Hard,
                reason: "cleanup".into(),
                actor: "tester".into(),
                request_id: "req-2".into(),
                admin_asserted: true,
            })
            .unwrap();
        assert!(store.get("run-2").unwrap().is_none());
    }

    #[test]
    fn hard_delete_without_admin_assertion_is_policy_denied() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        store.put(&sample_artifact("run-1", RunStatus::Ok)).unwrap();
        let err = store
            .delete_run(&DeleteRequest {
                run_id: "run-1".into(),
                mode: DeleteMode::Hard,
                reason: "cleanup".into(),
                actor: "tester".into(),
                request_id: "req-1".into(),
                admin_asserted: false,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::PolicyDenied(_)));
    }

    #[test]
    fn delete_rejects_reason_shorter_than_minimum() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        store.put(&sample_artifact("run-1", RunStatus::Ok)).unwrap();
        let err = store
            .delete_run(&DeleteRequest {
                run_id: "run-1".into(),
                mode: DeleteMode::Soft,
                reason: "  hi  ".into(),
                actor: "tester".into(),
                request_id: "req-1".into(),
                admin_asserted: false,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::BadParameter(_)));
        // Rejected before the run is touched at all.
        assert!(store.get("run-1").unwrap().is_some());
    }

    #[test]
    fn rebuild_index_recovers_from_scratch() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        store.put(&sample_artifact("run-1", RunStatus::Ok)).unwrap();
        fs::remove_file(store.index_path()).unwrap();
        let rebuilt = store.rebuild_index().unwrap();
        assert_eq!(rebuilt, 1);
        assert!(store.get("run-1").unwrap().is_some());
    }

    #[test]
    fn verify_integrity_flags_missing_artifact_file() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path(), Config::default()).unwrap();
        let artifact = sample_artifact("run-1", RunStatus::Ok);
        store.put(&artifact).unwrap();
        fs::remove_file(store.artifact_path(&artifact.partition(), "run-1")).unwrap();
        let report = store.verify_integrity().unwrap();
        assert!(!report.ok);
        assert_eq!(report.problems.len(), 1);
    }
}
