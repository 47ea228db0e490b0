//! Run index: lightweight per-run metadata, tombstones, and filter
//! matching (§3 "Index Entry", §4.F `list_runs_filtered`).
//!
//! `normalize_meta` / `validate_meta` port `index_meta.py`'s
//! `normalize_index_meta` / `validate_index_meta`: promote lineage fields
//! into a canonical shape and warn (never hard-fail) on missing
//! parent-linkage invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryRollup {
    pub count: u32,
    pub kinds: Vec<String>,
}

impl Default for AdvisoryRollup {
    fn default() -> Self {
        Self {
            count: 0,
            kinds: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageMeta {
    pub session_id: Option<String>,
    pub batch_label: Option<String>,
    pub parent_plan_run_id: Option<String>,
    pub parent_batch_plan_artifact_id: Option<String>,
    pub parent_batch_spec_artifact_id: Option<String>,
}

impl Default for LineageMeta {
    fn default() -> Self {
        Self {
            session_id: None,
            batch_label: None,
            parent_plan_run_id: None,
            parent_batch_plan_artifact_id: None,
            parent_batch_spec_artifact_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tombstone {
    pub deleted: bool,
    pub deleted_at: DateTime<Utc>,
    pub reason: String,
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexRow {
    Live(IndexEntry),
    Tombstoned(Tombstone),
}

impl IndexRow {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, IndexRow::Tombstoned(_))
    }

    pub fn as_live(&self) -> Option<&IndexEntry> {
        match self {
            IndexRow::Live(e) => Some(e),
            IndexRow::Tombstoned(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub run_id: String,
    pub created_at_utc: DateTime<Utc>,
    pub partition: String,
    pub event_type: String,
    pub status: String,
    pub tool_id: String,
    pub mode: String,
    pub lineage: LineageMeta,
    pub advisories: AdvisoryRollup,
}

/// Promote raw metadata fields into the canonical `LineageMeta` shape,
/// the way `normalize_index_meta` does for free-form `meta` dicts.
pub fn normalize_meta(raw: &HashMap<String, String>) -> LineageMeta {
    LineageMeta {
        session_id: raw.get("session_id").cloned(),
        batch_label: raw.get("batch_label").cloned(),
        parent_plan_run_id: raw.get("parent_plan_run_id").cloned(),
        parent_batch_plan_artifact_id: raw.get("parent_batch_plan_artifact_id").cloned(),
        parent_batch_spec_artifact_id: raw.get("parent_batch_spec_artifact_id").cloned(),
    }
}

/// Warn (never hard-fail) when parent-linkage invariants are missing: a
/// `batch_label` without any parent batch artifact id is suspicious but
/// not rejected.
pub fn validate_meta(meta: &LineageMeta) -> Vec<String> {
    let mut warnings = Vec::new();
    if meta.batch_label.is_some()
        && meta.parent_batch_plan_artifact_id.is_none()
        && meta.parent_batch_spec_artifact_id.is_none()
    {
        warnings.push(format!(
            "batch_label {:?} set without a parent batch artifact id",
            meta.batch_label
        ));
    }
    warnings
}

/// Filter parameters for `list_runs_filtered` (§4.F).
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    pub event_type: Option<String>,
    pub status: Option<String>,
    pub tool_id: Option<String>,
    pub mode: Option<String>,
    pub session_id: Option<String>,
    pub batch_label: Option<String>,
    pub parent_plan_run_id: Option<String>,
    pub parent_batch_plan_artifact_id: Option<String>,
    pub parent_batch_spec_artifact_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl IndexFilter {
    pub fn matches(&self, entry: &IndexEntry) -> bool {
        let opt_eq = |want: &Option<String>, have: &str| want.as_deref().map(|w| w == have).unwrap_or(true);
        let opt_eq_opt = |want: &Option<String>, have: &Option<String>| {
            want.as_deref().map(|w| have.as_deref() == Some(w)).unwrap_or(true)
        };

        opt_eq(&self.event_type, &entry.event_type)
            && opt_eq(&self.status, &entry.status)
            && opt_eq(&self.tool_id, &entry.tool_id)
            && opt_eq(&self.mode, &entry.mode)
            && opt_eq_opt(&self.session_id, &entry.lineage.session_id)
            && opt_eq_opt(&self.batch_label, &entry.lineage.batch_label)
            && opt_eq_opt(&self.parent_plan_run_id, &entry.lineage.parent_plan_run_id)
            && opt_eq_opt(
                &self.parent_batch_plan_artifact_id,
                &entry.lineage.parent_batch_plan_artifact_id,
            )
            && opt_eq_opt(
                &self.parent_batch_spec_artifact_id,
                &entry.lineage.parent_batch_spec_artifact_id,
            )
            && self
                .date_from
                .as_deref()
                .map(|d| entry.partition.as_str() >= d)
                .unwrap_or(true)
            && self
                .date_to
                .as_deref()
                .map(|d| entry.partition.as_str() <= d)
                .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> IndexEntry {
        IndexEntry {
            run_id: "r1".into(),
            created_at_utc: Utc::now(),
            partition: "2026-07-30".into(),
            event_type: "plan".into(),
            status: "OK".into(),
            tool_id: "t1".into(),
            mode: "normal".into(),
            lineage: LineageMeta {
                session_id: Some("s1".into()),
                batch_label: None,
                parent_plan_run_id: None,
                parent_batch_plan_artifact_id: None,
                parent_batch_spec_artifact_id: None,
            },
            advisories: AdvisoryRollup::default(),
        }
    }

    #[test]
    fn filter_matches_on_session_id() {
        let f = IndexFilter {
            session_id: Some("s1".into()),
            ..Default::default()
        };
        assert!(f.matches(&entry()));
        let f2 = IndexFilter {
            session_id: Some("other".into()),
            ..Default::default()
        };
        assert!(!f2.matches(&entry()));
    }

    #[test]
    fn validate_warns_on_batch_without_parent() {
        let mut meta = LineageMeta::default();
        meta.batch_label = Some("b1".into());
        let warnings = validate_meta(&meta);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn date_range_filters_by_partition() {
        let f = IndexFilter {
            date_from: Some("2026-07-31".into()),
            ..Default::default()
        };
        assert!(!f.matches(&entry()));
    }
}
