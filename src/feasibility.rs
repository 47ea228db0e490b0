//! Deterministic feasibility & policy evaluation (§4.D).
//!
//! `compute` is a pure function: identical `PlanRequest` + `FeasibilityContext`
//! always produce a bit-identical `FeasibilityResult` once `computed_at_utc`
//! is excluded, mirroring `cam/feasibility.py`'s rule table.

use crate::geometry;
use crate::hashing::sha256_of_obj;
use crate::planner::PlanRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Green,
    Yellow,
    Red,
    Unknown,
    Error,
}

impl RiskLevel {
    pub fn score(self) -> u8 {
        match self {
            RiskLevel::Green => 100,
            RiskLevel::Yellow => 75,
            RiskLevel::Red => 25,
            RiskLevel::Unknown => 50,
            RiskLevel::Error => 0,
        }
    }
}

/// Context available to feasibility evaluation beyond the raw request:
/// optional machine feed caps and any already-extracted SVG import flags
/// (SVG parsing itself is out of scope; only these booleans matter here).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeasibilityContext {
    pub machine_feed_cap_xy: Option<f64>,
    pub flute_length_hint_mm: Option<f64>,
    pub svg_has_script: bool,
    pub svg_has_image: bool,
    pub svg_has_foreign_object: bool,
    pub svg_has_text: bool,
    /// Downgrade UNKNOWN to non-blocking, per the policy override in §4.D.
    pub unknown_is_nonblocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeasibilityResult {
    pub risk_level: RiskLevel,
    pub score: u8,
    pub blocking: bool,
    pub warnings: Vec<String>,
    pub blocking_reasons: Vec<String>,
    pub engine_version: String,
    pub computed_at_utc: DateTime<Utc>,
}

/// Engine version stamped on every result, bumped when rule semantics change.
pub const ENGINE_VERSION: &str = "1.0.0";

/// `should_block(risk) = risk in {RED, UNKNOWN, ERROR}` by default; a
/// context override may downgrade UNKNOWN to non-blocking.
pub fn should_block(risk: RiskLevel, ctx: &FeasibilityContext) -> bool {
    match risk {
        RiskLevel::Red | RiskLevel::Error => true,
        RiskLevel::Unknown => !ctx.unknown_is_nonblocking,
        RiskLevel::Green | RiskLevel::Yellow => false,
    }
}

/// Evaluate feasibility for `request` under `ctx`. Deterministic aside from
/// the embedded timestamp.
pub fn compute(request: &PlanRequest, ctx: &FeasibilityContext, now: DateTime<Utc>) -> FeasibilityResult {
    let mut warnings = Vec::new();
    let mut blocking_reasons = Vec::new();
    let mut worst = RiskLevel::Green;

    let mut downgrade = |level: RiskLevel, worst: &mut RiskLevel| {
        if level.score() < worst.score() {
            *worst = level;
        }
    };

    if !(0.5..=50.0).contains(&request.tool_diameter_mm) {
        blocking_reasons.push(format!(
            "tool_diameter_mm {} outside [0.5, 50]",
            request.tool_diameter_mm
        ));
        downgrade(RiskLevel::Red, &mut worst);
    }

    if !(0.1..=0.95).contains(&request.stepover) {
        blocking_reasons.push(format!("stepover {} outside [0.1, 0.95]", request.stepover));
        downgrade(RiskLevel::Red, &mut worst);
    }

    if let Some(outer) = request.loops.first() {
        let inradius = geometry::inscribed_radius(outer);
        let required = request.tool_diameter_mm / 2.0 + request.margin_mm;
        if inradius <= required {
            blocking_reasons.push(format!(
                "pocket inscribed radius {inradius:.3}mm does not exceed tool radius + margin {required:.3}mm"
            ));
            downgrade(RiskLevel::Red, &mut worst);
        }
    }

    for (name, feed) in [
        ("feed_xy", request.feed_xy),
        ("feed_z", request.feed_z),
        ("rapid", request.rapid),
    ] {
        if feed <= 0.0 {
            blocking_reasons.push(format!("{name} must be positive"));
            downgrade(RiskLevel::Red, &mut worst);
        }
    }
    if let Some(cap) = ctx.machine_feed_cap_xy {
        if request.feed_xy > cap {
            warnings.push(format!("feed_xy {} exceeds machine cap {cap}", request.feed_xy));
            downgrade(RiskLevel::Yellow, &mut worst);
        }
    }

    if request.stepdown_mm <= 0.0 {
        blocking_reasons.push("stepdown_mm must be positive".into());
        downgrade(RiskLevel::Red, &mut worst);
    } else if let Some(flute) = ctx.flute_length_hint_mm {
        if request.stepdown_mm > flute {
            warnings.push(format!(
                "stepdown_mm {} exceeds flute length hint {flute}",
                request.stepdown_mm
            ));
            downgrade(RiskLevel::Yellow, &mut worst);
        }
    }

    if ctx.svg_has_script || ctx.svg_has_image || ctx.svg_has_foreign_object {
        blocking_reasons.push("SVG import contains <script>, <image> or <foreignObject>".into());
        downgrade(RiskLevel::Red, &mut worst);
    }
    if ctx.svg_has_text {
        warnings.push("SVG import contains <text>; fonts need outlining".into());
        downgrade(RiskLevel::Yellow, &mut worst);
    }

    let blocking = should_block(worst, ctx);

    FeasibilityResult {
        risk_level: worst,
        score: worst.score(),
        blocking,
        warnings,
        blocking_reasons,
        engine_version: ENGINE_VERSION.to_string(),
        computed_at_utc: now,
    }
}

/// SHA-256 over the canonical JSON of `result` with `computed_at_utc`
/// removed, per §4.D.
pub fn feasibility_sha256(result: &FeasibilityResult) -> serde_json::Result<String> {
    #[derive(Serialize)]
    struct Hashable<'a> {
        risk_level: &'a RiskLevel,
        score: u8,
        blocking: bool,
        warnings: &'a [String],
        blocking_reasons: &'a [String],
        engine_version: &'a str,
    }
    sha256_of_obj(&Hashable {
        risk_level: &result.risk_level,
        score: result.score,
        blocking: result.blocking,
        warnings: &result.warnings,
        blocking_reasons: &result.blocking_reasons,
        engine_version: &result.engine_version,
    })
}
