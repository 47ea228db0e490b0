//! Step 3 (Spiral) / Step 4: ring-pair stitching state machine.

use crate::error::CoreError;
use crate::geometry::{is_ccw, Loop, Point};
use crate::planner::ring::RingLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StitchState {
    Unstarted,
    RingActive,
    BridgeToNext,
    Complete,
}

/// Orient `loop_` to CCW if `want_ccw`, else CW, reversing when the current
/// signed-area sign disagrees.
fn orient_ring(loop_: &Loop, want_ccw: bool) -> Loop {
    if is_ccw(loop_) == want_ccw {
        loop_.clone()
    } else {
        let mut r = loop_.clone();
        r.reverse();
        r
    }
}

fn rotate_to_start(loop_: &Loop, start_idx: usize) -> Loop {
    let n = loop_.len();
    (0..n).map(|i| loop_[(start_idx + i) % n]).collect()
}

fn closest_vertex_to(target: &Point, candidates: &Loop) -> usize {
    candidates
        .iter()
        .enumerate()
        .min_by(|a, b| {
            target
                .dist(a.1)
                .partial_cmp(&target.dist(b.1))
                .unwrap()
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn closest_pair(a: &Loop, b: &Loop) -> (usize, usize) {
    let mut best = (0usize, 0usize);
    let mut best_d = f64::INFINITY;
    for (i, pa) in a.iter().enumerate() {
        for (j, pb) in b.iter().enumerate() {
            let d = pa.dist(pb);
            if d < best_d {
                best_d = d;
                best = (i, j);
            }
        }
    }
    best
}

/// Stitch the cuttable loops of `levels` (shallow-to-deep order, as built
/// by `ring::build_stack`, each level possibly split into several sub-loops
/// by an island) into one continuous polyline. Every sub-loop, at every
/// level, is fully traversed once, entered and exited at the same vertex,
/// bridged to the next sub-loop's closest vertex by a straight chord.
#[allow(unused_assignments)]
pub fn stitch_spiral(levels: &[RingLevel], climb: bool) -> Result<Vec<Point>, CoreError> {
    if levels.is_empty() {
        return Err(CoreError::StitchFailure {
            pair_index: 0,
            reason: "no rings to stitch".into(),
        });
    }

    let mut state = StitchState::Unstarted;
    let mut path = Vec::new();

    let want_ccw = climb;
    let mut oriented: Vec<Loop> = levels
        .iter()
        .flat_map(|l| l.loops.iter())
        .map(|lp| orient_ring(lp, want_ccw))
        .collect();
    if oriented.is_empty() {
        return Err(CoreError::StitchFailure {
            pair_index: 0,
            reason: "no cuttable loops to stitch".into(),
        });
    }

    if oriented.len() == 1 {
        state = StitchState::RingActive;
        if oriented[0].len() < 3 {
            return Err(CoreError::StitchFailure {
                pair_index: 0,
                reason: "ring has fewer than 3 vertices".into(),
            });
        }
        path.extend(oriented[0].iter().copied());
        path.push(oriented[0][0]);
        state = StitchState::Complete;
        return Ok(path);
    }

    let (i0, i1) = closest_pair(&oriented[0], &oriented[1]);
    oriented[0] = rotate_to_start(&oriented[0], i0);
    oriented[1] = rotate_to_start(&oriented[1], i1);

    state = StitchState::RingActive;
    if oriented[0].len() < 3 {
        return Err(CoreError::StitchFailure {
            pair_index: 0,
            reason: "ring has fewer than 3 vertices".into(),
        });
    }
    path.extend(oriented[0].iter().copied());
    path.push(oriented[0][0]);

    for pair_index in 0..oriented.len() - 1 {
        state = StitchState::BridgeToNext;
        let exit_point = *path.last().unwrap();
        if pair_index + 1 < oriented.len() - 1 {
            let next_start = closest_vertex_to(&exit_point, &oriented[pair_index + 2]);
            oriented[pair_index + 2] = rotate_to_start(&oriented[pair_index + 2], next_start);
        }
        let entry = oriented[pair_index + 1].first().copied().ok_or(
            CoreError::StitchFailure {
                pair_index,
                reason: "next ring is empty".into(),
            },
        )?;
        path.push(entry);
        state = StitchState::RingActive;
        if oriented[pair_index + 1].len() < 3 {
            return Err(CoreError::StitchFailure {
                pair_index,
                reason: "ring has fewer than 3 vertices".into(),
            });
        }
        path.extend(oriented[pair_index + 1].iter().skip(1).copied());
        path.push(entry);
    }

    state = StitchState::Complete;
    debug_assert_eq!(state, StitchState::Complete);
    Ok(path)
}

/// Lanes strategy: each cuttable sub-loop emitted as an independent closed
/// loop, deepest level first, direction alternating per loop when
/// `climb=false`.
pub fn lanes_loops(levels: &[RingLevel], climb: bool) -> Vec<Loop> {
    levels
        .iter()
        .rev()
        .flat_map(|level| level.loops.iter())
        .enumerate()
        .map(|(i, lp)| {
            let want_ccw = if climb { true } else { i % 2 == 0 };
            let mut l = orient_ring(lp, want_ccw);
            l.push(l[0]);
            l
        })
        .collect()
}
