//! The narrowly controlled mutable subset of a `RunArtifact` (§3, §9):
//! advisory links, explanation status, advisory reviews, manufacturing
//! candidates. Everything else on an artifact is immutable after `put`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationStatus {
    Pending,
    Generated,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryRef {
    pub advisory_id: String,
    pub sha256: String,
    pub kind: String,
    pub created_at_utc: DateTime<Utc>,
}

/// `schemas_variant_review.py`'s rating/notes/promote flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryReview {
    pub advisory_id: String,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    pub promoted: bool,
    pub updated_at_utc: DateTime<Utc>,
    pub updated_by: String,
}

impl AdvisoryReview {
    pub fn validate_rating(rating: Option<u8>) -> Result<(), String> {
        match rating {
            Some(r) if !(1..=5).contains(&r) => Err(format!("rating {r} must be in 1..=5")),
            _ => Ok(()),
        }
    }
}

/// `schemas_manufacturing_ops.py`'s candidate queue: append-only
/// `decision_history`, `decision: None` meaning NEEDS_DECISION.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturingCandidate {
    pub candidate_id: String,
    pub description: String,
    pub decision: Option<crate::feasibility::RiskLevel>,
    pub decided_at_utc: Option<DateTime<Utc>>,
    pub decision_history: Vec<DecisionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: crate::feasibility::RiskLevel,
    pub note: Option<String>,
    pub by: String,
    pub at_utc: DateTime<Utc>,
}

impl ManufacturingCandidate {
    pub fn new(candidate_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            description: description.into(),
            decision: None,
            decided_at_utc: None,
            decision_history: vec![],
        }
    }

    pub fn record_decision(
        &mut self,
        decision: crate::feasibility::RiskLevel,
        note: Option<String>,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.decision_history.push(DecisionRecord {
            decision,
            note,
            by: by.into(),
            at_utc: now,
        });
        self.decision = Some(decision);
        self.decided_at_utc = Some(now);
    }
}

/// The complete mutable sub-struct embedded in a `RunArtifact`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutableFields {
    pub advisory_inputs: Vec<AdvisoryRef>,
    pub explanation_status: Option<ExplanationStatus>,
    pub advisory_reviews: Vec<AdvisoryReview>,
    pub manufacturing_candidates: Vec<ManufacturingCandidate>,
}
