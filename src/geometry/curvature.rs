//! Curvature, adaptive resampling and curvature-driven slowdown factors.

use super::{Point, EPS_LEN};

/// Menger curvature at index `i` of a polyline: `4 * triangle_area / (|AB|*|BC|*|AC|)`.
/// Zero at endpoints or when any incident edge is shorter than `EPS_LEN`.
pub fn curvature_at(pts: &[Point], i: usize) -> f64 {
    if i == 0 || i + 1 >= pts.len() {
        return 0.0;
    }
    let a = pts[i - 1];
    let b = pts[i];
    let c = pts[i + 1];
    let ab = a.dist(&b);
    let bc = b.dist(&c);
    let ac = a.dist(&c);
    if ab < EPS_LEN || bc < EPS_LEN || ac < EPS_LEN {
        return 0.0;
    }
    let twice_area = ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs();
    4.0 * (twice_area / 2.0) / (ab * bc * ac)
}

/// Resample a polyline so chord length shrinks toward `ds_min` where
/// curvature exceeds `k_threshold`, relaxing smoothly to `ds_max` in
/// straight segments. Always keeps the original endpoints.
pub fn adaptive_resample(pts: &[Point], ds_min: f64, ds_max: f64, k_threshold: f64) -> Vec<Point> {
    if pts.len() < 2 {
        return pts.to_vec();
    }
    let ds_min = ds_min.max(1e-6);
    let ds_max = ds_max.max(ds_min);

    let mut out = vec![pts[0]];
    let mut carry = 0.0f64;
    for i in 0..pts.len() - 1 {
        let a = pts[i];
        let b = pts[i + 1];
        let seg_len = a.dist(&b);
        if seg_len < EPS_LEN {
            continue;
        }
        let k = curvature_at(pts, i + 1).max(curvature_at(pts, i));
        let alpha = (k / k_threshold.max(1e-9)).clamp(0.0, 1.0);
        let target_ds = ds_max - (ds_max - ds_min) * alpha;

        let dir = b.sub(&a).scale(1.0 / seg_len);
        let mut pos = carry;
        while pos + target_ds < seg_len {
            pos += target_ds;
            out.push(a.add(&dir.scale(pos)));
        }
        carry = pos + target_ds - seg_len;
    }
    let last = *pts.last().unwrap();
    if out.last().map(|p| p.dist(&last) > EPS_LEN).unwrap_or(true) {
        out.push(last);
    }
    out
}

/// Per-vertex slowdown factor in `[min_scale, 1.0]` from local curvature.
/// Endpoints are always 1.0.
pub fn slowdown_factors(pts: &[Point], k_threshold: f64, min_scale: f64) -> Vec<f64> {
    let n = pts.len();
    let mut out = vec![1.0; n];
    for i in 1..n.saturating_sub(1) {
        let k = curvature_at(pts, i);
        let alpha = (k / k_threshold.max(1e-9)).clamp(0.0, 1.0);
        out[i] = 1.0 - (1.0 - min_scale) * alpha;
    }
    out
}

/// Default curvature threshold used when a request does not override it:
/// `1 / (3 * tool_d)`.
pub fn default_k_threshold(tool_diameter_mm: f64) -> f64 {
    1.0 / (3.0 * tool_diameter_mm.max(1e-9))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curvature_of_collinear_points_is_zero() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        assert!(curvature_at(&pts, 1).abs() < 1e-12);
    }

    #[test]
    fn curvature_of_right_angle_turn_is_positive() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        assert!(curvature_at(&pts, 1) > 0.0);
    }

    #[test]
    fn curvature_zero_at_endpoints() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        assert_eq!(curvature_at(&pts, 0), 0.0);
        assert_eq!(curvature_at(&pts, 2), 0.0);
    }

    #[test]
    fn slowdown_endpoints_are_full_speed() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        let f = slowdown_factors(&pts, default_k_threshold(6.0), 0.3);
        assert_eq!(f[0], 1.0);
        assert_eq!(*f.last().unwrap(), 1.0);
        assert!(f[1] <= 1.0 && f[1] >= 0.3);
    }

    #[test]
    fn resample_preserves_endpoints() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let out = adaptive_resample(&pts, 0.5, 2.0, 1.0);
        assert_eq!(out[0], pts[0]);
        assert!(out.last().unwrap().dist(&pts[1]) < 1e-9);
    }
}
