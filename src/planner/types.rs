//! Shared toolpath and request/response types (§3).

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xy(p: Point, z: f64) -> Self {
        Self { x: p.x, y: p.y, z }
    }

    pub fn dist3(&self, other: &Point3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    pub fn to_xy(self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bottleneck {
    FeedCap,
    Accel,
    Jerk,
    None,
}

impl Default for Bottleneck {
    fn default() -> Self {
        Bottleneck::None
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveMeta {
    /// Curvature-driven feed scale in `[min_scale, 1.0]`, if slowdown applies.
    pub slowdown: Option<f64>,
    /// True if this move is part of a trochoidal relief substitution.
    pub trochoid: bool,
    /// Bottleneck tag assigned by the jerk-aware estimator.
    pub bottleneck: Bottleneck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Move {
    Rapid {
        from: Point3,
        to: Point3,
        f: f64,
    },
    Linear {
        from: Point3,
        to: Point3,
        f: f64,
        meta: MoveMeta,
    },
    ArcCw {
        from: Point3,
        to: Point3,
        center_offset: Point,
        f: f64,
        meta: MoveMeta,
    },
    ArcCcw {
        from: Point3,
        to: Point3,
        center_offset: Point,
        f: f64,
        meta: MoveMeta,
    },
}

impl Move {
    pub fn from_point(&self) -> Point3 {
        match self {
            Move::Rapid { from, .. } => *from,
            Move::Linear { from, .. } => *from,
            Move::ArcCw { from, .. } => *from,
            Move::ArcCcw { from, .. } => *from,
        }
    }

    pub fn to_point(&self) -> Point3 {
        match self {
            Move::Rapid { to, .. } => *to,
            Move::Linear { to, .. } => *to,
            Move::ArcCw { to, .. } => *to,
            Move::ArcCcw { to, .. } => *to,
        }
    }

    pub fn is_cutting(&self) -> bool {
        !matches!(self, Move::Rapid { .. })
    }

    pub fn feed(&self) -> f64 {
        match self {
            Move::Rapid { f, .. } => *f,
            Move::Linear { f, .. } => *f,
            Move::ArcCw { f, .. } => *f,
            Move::ArcCcw { f, .. } => *f,
        }
    }

    pub fn meta(&self) -> Option<&MoveMeta> {
        match self {
            Move::Rapid { .. } => None,
            Move::Linear { meta, .. } => Some(meta),
            Move::ArcCw { meta, .. } => Some(meta),
            Move::ArcCcw { meta, .. } => Some(meta),
        }
    }

    pub fn meta_mut(&mut self) -> Option<&mut MoveMeta> {
        match self {
            Move::Rapid { .. } => None,
            Move::Linear { meta, .. } => Some(meta),
            Move::ArcCw { meta, .. } => Some(meta),
            Move::ArcCcw { meta, .. } => Some(meta),
        }
    }

    pub fn scale_feed(&mut self, factor: f64) {
        match self {
            Move::Rapid { .. } => {}
            Move::Linear { f, .. } | Move::ArcCw { f, .. } | Move::ArcCcw { f, .. } => {
                *f *= factor;
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Toolpath {
    pub moves: Vec<Move>,
}

impl Toolpath {
    /// Verifies consecutive moves are geometrically continuous (§3): the
    /// end of one move equals the start of the next, within `tol_mm`.
    pub fn is_continuous(&self, tol_mm: f64) -> bool {
        self.moves
            .windows(2)
            .all(|w| w[0].to_point().dist3(&w[1].from_point()) <= tol_mm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Mm,
    Inch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Spiral,
    Lanes,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurvatureOptions {
    pub corner_radius_min_mm: f64,
    pub target_stepover: f64,
    pub slowdown_feed_pct: f64,
}

impl Default for CurvatureOptions {
    fn default() -> Self {
        Self {
            corner_radius_min_mm: 0.2,
            target_stepover: 0.4,
            slowdown_feed_pct: 85.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrochoidOptions {
    pub use_trochoids: bool,
    pub trochoid_radius_mm: Option<f64>,
    pub trochoid_pitch_mm: Option<f64>,
}

impl Default for TrochoidOptions {
    fn default() -> Self {
        Self {
            use_trochoids: false,
            trochoid_radius_mm: None,
            trochoid_pitch_mm: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub loops: Vec<Vec<Point>>,
    pub units: Units,
    pub tool_diameter_mm: f64,
    pub stepover: f64,
    pub stepdown_mm: f64,
    pub margin_mm: f64,
    pub strategy: Strategy,
    pub smoothing_radius_mm: f64,
    pub climb: bool,
    pub feed_xy: f64,
    pub feed_z: f64,
    pub rapid: f64,
    pub safe_z_mm: f64,
    pub z_rough_mm: f64,
    pub curvature: CurvatureOptions,
    pub trochoid: TrochoidOptions,
    pub machine_profile: Option<crate::motion::MachineProfile>,
    pub session_override_factor: Option<f64>,
    pub lead_r_mm: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanStats {
    pub length_mm: f64,
    pub area_mm2: f64,
    pub time_s: f64,
    pub time_s_classic: f64,
    pub time_s_jerk: Option<f64>,
    pub volume_mm3: f64,
    pub coverage_pct: f64,
    pub move_count: usize,
    pub tight_segments: usize,
    pub trochoid_arcs: usize,
    pub caps: CapCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapCounts {
    pub feed_cap: usize,
    pub accel: usize,
    pub jerk: usize,
    pub none: usize,
}

impl CapCounts {
    pub fn tally(bottlenecks: &[Bottleneck]) -> Self {
        let mut c = CapCounts::default();
        for b in bottlenecks {
            match b {
                Bottleneck::FeedCap => c.feed_cap += 1,
                Bottleneck::Accel => c.accel += 1,
                Bottleneck::Jerk => c.jerk += 1,
                Bottleneck::None => c.none += 1,
            }
        }
        c
    }
}
