//! Polygon offsetting, arc tessellation, area, curvature and resampling.
//!
//! Ported from the formulas in `cam/adaptive_core_l1.py` /
//! `cam/adaptive_core_l2.py` (bodies were not retrievable, so the governing
//! formulas are taken from the written contract rather than transliterated
//! Python), which both reach for `pyclipper` once an island has to be cut
//! out of an offset ring. `offset` itself stays a per-vertex miter-join
//! inset/outset (the per-loop math those files name directly), and `clip`
//! wraps `geo`'s boolean-ops kernel for the island-subtraction step that a
//! per-vertex offset cannot represent on its own — see DESIGN.md.

mod arc;
mod clip;
mod curvature;
mod offset;

pub use arc::{tessellate, ArcDirection};
pub use clip::subtract_islands;
pub use curvature::{adaptive_resample, curvature_at, default_k_threshold, slowdown_factors};
pub use offset::offset;

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// A point in the XY plane, millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn sub(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn scale(&self, s: f64) -> Point {
        Point::new(self.x * s, self.y * s)
    }

    pub fn len(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalized(&self) -> Option<Point> {
        let l = self.len();
        if l < 1e-12 {
            None
        } else {
            Some(self.scale(1.0 / l))
        }
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

/// A simple closed polygon: first point does not repeat the last.
pub type Loop = Vec<Point>;

/// Outer loop (index 0) plus keep-out islands.
pub type LoopSet = Vec<Loop>;

/// Minimum edge length below which geometry is considered degenerate, mm.
pub const EPS_LEN: f64 = 1e-6;

/// Signed area via the shoelace formula. Positive for CCW loops.
pub fn signed_area(loop_: &Loop) -> f64 {
    let n = loop_.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let p = loop_[i];
        let q = loop_[(i + 1) % n];
        sum += p.x * q.y - q.x * p.y;
    }
    sum / 2.0
}

/// Unsigned area.
pub fn area(loop_: &Loop) -> f64 {
    signed_area(loop_).abs()
}

pub fn is_ccw(loop_: &Loop) -> bool {
    signed_area(loop_) > 0.0
}

/// Validate the structural invariants of a `LoopSet` (§3): non-empty,
/// every loop has >= 3 points, outer is CCW, islands are CW and strictly
/// inside the outer loop, islands don't overlap each other.
pub fn validate_loop_set(loops: &LoopSet) -> CoreResult<()> {
    if loops.is_empty() {
        return Err(CoreError::BadGeometry("loop set is empty".into()));
    }
    for (i, l) in loops.iter().enumerate() {
        if l.len() < 3 {
            return Err(CoreError::BadGeometry(format!(
                "loop {i} has fewer than 3 points"
            )));
        }
        for j in 0..l.len() {
            let p = l[j];
            let q = l[(j + 1) % l.len()];
            if p.dist(&q) < EPS_LEN {
                return Err(CoreError::BadGeometry(format!(
                    "loop {i} has a degenerate edge shorter than {EPS_LEN} mm"
                )));
            }
        }
    }
    if !is_ccw(&loops[0]) {
        return Err(CoreError::BadGeometry("outer loop must be CCW".into()));
    }
    for (i, island) in loops.iter().enumerate().skip(1) {
        if is_ccw(island) {
            return Err(CoreError::BadGeometry(format!(
                "island {i} must be CW"
            )));
        }
        for p in island {
            if !point_in_polygon(p, &loops[0]) {
                return Err(CoreError::BadGeometry(format!(
                    "island {i} is not strictly inside the outer loop"
                )));
            }
        }
    }
    for i in 1..loops.len() {
        for j in (i + 1)..loops.len() {
            if islands_overlap(&loops[i], &loops[j]) {
                return Err(CoreError::BadGeometry(format!(
                    "island {i} overlaps island {j}"
                )));
            }
        }
    }
    Ok(())
}

/// Even-odd ray-casting point-in-polygon test.
pub fn point_in_polygon(p: &Point, loop_: &Loop) -> bool {
    let n = loop_.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = loop_[i];
        let pj = loop_[j];
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn islands_overlap(a: &Loop, b: &Loop) -> bool {
    a.iter().any(|p| point_in_polygon(p, b)) || b.iter().any(|p| point_in_polygon(p, a))
}

/// Minimum distance from `p` to any edge of `loop_`.
pub fn min_distance_to_boundary(p: &Point, loop_: &Loop) -> f64 {
    let n = loop_.len();
    let mut best = f64::INFINITY;
    for i in 0..n {
        let a = loop_[i];
        let b = loop_[(i + 1) % n];
        best = best.min(point_segment_distance(p, &a, &b));
    }
    best
}

fn point_segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let ab = b.sub(a);
    let len2 = ab.dot(&ab);
    if len2 < 1e-18 {
        return p.dist(a);
    }
    let t = ((p.sub(a)).dot(&ab) / len2).clamp(0.0, 1.0);
    let proj = a.add(&ab.scale(t));
    p.dist(&proj)
}

/// Approximate inscribed radius of a loop: the minimum, over a coarse
/// sampling of interior-ish points (here, the centroid plus vertices),
/// of distance to the boundary. For convex polygons centered roughly at
/// their centroid this matches the true inradius closely enough to bound
/// offset feasibility (§8 "offset correctness" is stated as an
/// approximation for convex shapes).
pub fn inscribed_radius(loop_: &Loop) -> f64 {
    let centroid = centroid_of(loop_);
    min_distance_to_boundary(&centroid, loop_)
}

fn centroid_of(loop_: &Loop) -> Point {
    let n = loop_.len() as f64;
    let sx: f64 = loop_.iter().map(|p| p.x).sum();
    let sy: f64 = loop_.iter().map(|p| p.y).sum();
    Point::new(sx / n, sy / n)
}
