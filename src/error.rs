//! Crate-wide, caller-visible error kinds.
//!
//! Every fallible public operation returns one of these variants (or a
//! module-local error that converts into one at the boundary), matching the
//! kinds enumerated in the governance contract: planner failures carry the
//! `run_id` of the BLOCKED artifact that was written for audit, store errors
//! are surfaced verbatim, and nothing is ever partially persisted.

use thiserror::Error;

/// Caller-visible error surface for the whole crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Loop set is empty, a loop has fewer than 3 points, or containment is
    /// inverted (an island is not strictly inside the outer loop).
    #[error("bad geometry: {0}")]
    BadGeometry(String),

    /// A numeric parameter is out of its documented range, a feed is <= 0,
    /// or an enum value is invalid.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// No feasible offset ring exists for the requested margin/tool/stepover.
    #[error("pocket too small: {0}")]
    PocketTooSmall(String),

    /// A mid-stack offset pass produced no geometry.
    #[error("offset degenerate: {0}")]
    OffsetDegenerate(String),

    /// Ring-pair stitching could not complete.
    #[error("stitch failed at pair {pair_index}: {reason}")]
    StitchFailure {
        /// Index of the ring pair being stitched when the failure occurred.
        pair_index: usize,
        /// Human-readable cause.
        reason: String,
    },

    /// Feasibility evaluated to a blocking risk level (Red/Unknown/Error).
    #[error("safety blocked: {reason} (run_id={run_id})")]
    SafetyBlocked {
        /// The BLOCKED artifact's run id, for audit correlation.
        run_id: String,
        /// Human-readable blocking reason.
        reason: String,
    },

    /// Attempted to overwrite an existing immutable artifact.
    #[error("artifact is immutable: {0}")]
    Immutable(String),

    /// Requested id does not exist (or is soft-deleted).
    #[error("not found: {0}")]
    NotFound(String),

    /// Delete quota exceeded for the actor.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Operation is not permitted by current policy/configuration.
    #[error("policy denied: {0}")]
    PolicyDenied(String),

    /// Stored bytes do not match their declared content hash.
    #[error("integrity mismatch for {sha256}")]
    IntegrityMismatch {
        /// The declared (expected) sha256.
        sha256: String,
    },

    /// Any filesystem error not covered by a more specific variant.
    #[error("io failure: {0}")]
    IoFailure(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
