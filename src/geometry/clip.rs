//! Boolean polygon clipping: subtract island keep-outs from an offset
//! ring's outer boundary, splitting it when an island reaches far enough
//! in to cut the ring in two. Wraps `geo`'s `BooleanOps` kernel the way
//! `cam/adaptive_core_l1.py`/`cam/adaptive_core_l2.py` wrap `pyclipper` for
//! the same step — a per-vertex miter-join offset has no way to represent
//! a split, so this is a genuine dependency rather than a hand-rolled one.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

use super::{is_ccw, Loop, Point};

fn to_line_string(loop_: &Loop) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = loop_.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    if coords.first() != coords.last() {
        if let Some(first) = coords.first().copied() {
            coords.push(first);
        }
    }
    LineString::new(coords)
}

fn from_line_string(ls: &LineString<f64>) -> Loop {
    let mut pts: Vec<Point> = ls.coords().map(|c| Point::new(c.x, c.y)).collect();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

/// Subtract every loop in `islands` from `outer`, returning the resulting
/// cuttable sub-loops. Each returned loop keeps `outer`'s orientation
/// convention. Empty when the islands fully consume `outer`'s interior;
/// more than one entry when an island splits the ring into separate
/// pieces.
pub fn subtract_islands(outer: &Loop, islands: &[Loop]) -> Vec<Loop> {
    if islands.is_empty() {
        return vec![outer.clone()];
    }

    let outer_poly = Polygon::new(to_line_string(outer), vec![]);
    let mut acc = MultiPolygon::new(vec![outer_poly]);
    for isl in islands {
        if isl.len() < 3 {
            continue;
        }
        let isl_poly = Polygon::new(to_line_string(isl), vec![]);
        let isl_multi = MultiPolygon::new(vec![isl_poly]);
        acc = acc.difference(&isl_multi);
    }

    let want_ccw = is_ccw(outer);
    acc.0
        .iter()
        .filter_map(|poly| {
            let ring = from_line_string(poly.exterior());
            if ring.len() < 3 {
                return None;
            }
            if is_ccw(&ring) == want_ccw {
                Some(ring)
            } else {
                Some(ring.into_iter().rev().collect())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::area;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Loop {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn island_strictly_inside_leaves_outer_ring_unchanged() {
        let outer = rect(0.0, 0.0, 100.0, 60.0);
        let island = rect(40.0, 20.0, 60.0, 40.0);
        let result = subtract_islands(&outer, &[island]);
        assert_eq!(result.len(), 1);
        assert!((area(&result[0]) - area(&outer)).abs() < 1e-6);
    }

    #[test]
    fn island_crossing_the_ring_line_splits_it() {
        // A ring whose boundary runs straight through the island's
        // footprint must come back as more than one loop, or a single
        // loop with a visibly smaller enclosed area than the raw outer.
        let outer = rect(0.0, 20.0, 100.0, 40.0);
        let island = rect(40.0, 0.0, 60.0, 60.0);
        let result = subtract_islands(&outer, &[island]);
        assert!(result.len() >= 2 || result.iter().map(area).sum::<f64>() < area(&outer) - 1.0);
    }

    #[test]
    fn no_islands_returns_outer_unchanged() {
        let outer = rect(0.0, 0.0, 10.0, 10.0);
        let result = subtract_islands(&outer, &[]);
        assert_eq!(result, vec![outer]);
    }
}
