//! Arc tessellation.

use super::Point;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcDirection {
    #[serde(rename = "cw")]
    Clockwise,
    #[serde(rename = "ccw")]
    CounterClockwise,
}

/// Tessellate an arc of `radius` centered at `center`, from `start_rad` to
/// `end_rad`, into `N = max(6, ceil(arc_length / chord_tolerance))` evenly
/// spaced points, emitting `N + 1` points (endpoints included). `direction`
/// decides whether the swept angle wraps the short way above or below
/// `start_rad`.
pub fn tessellate(
    center: Point,
    radius: f64,
    start_rad: f64,
    end_rad: f64,
    direction: ArcDirection,
    chord_tolerance_mm: f64,
) -> Vec<Point> {
    let two_pi = 2.0 * PI;
    let mut delta = match direction {
        ArcDirection::CounterClockwise => {
            let mut d = end_rad - start_rad;
            while d < 0.0 {
                d += two_pi;
            }
            d
        }
        ArcDirection::Clockwise => {
            let mut d = start_rad - end_rad;
            while d < 0.0 {
                d += two_pi;
            }
            -d
        }
    };
    if delta == 0.0 {
        delta = match direction {
            ArcDirection::CounterClockwise => two_pi,
            ArcDirection::Clockwise => -two_pi,
        };
    }

    let arc_length = radius * delta.abs();
    let tol = chord_tolerance_mm.max(1e-6);
    let n = (6usize).max((arc_length / tol).ceil() as usize);

    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            let theta = start_rad + delta * t;
            Point::new(center.x + radius * theta.cos(), center.y + radius * theta.sin())
        })
        .collect()
}
