//! Step 1-2: build the offset-ring stack.

use crate::error::{CoreError, CoreResult};
use crate::geometry::{self, offset, Loop};

/// One concentric offset level: the cuttable sub-loop(s) at that offset
/// distance once island keep-outs have been subtracted. Usually one loop;
/// more than one when an island has split the ring.
#[derive(Debug, Clone)]
pub struct RingLevel {
    pub distance: f64,
    pub loops: Vec<Loop>,
}

/// Build the stack of offset rings starting at `margin + tool_d/2`,
/// stepping inward by `stepover * tool_d` until the offset fails or the
/// island keep-outs consume the entire ring at that depth (no cuttable
/// loop left). At least one ring must be produced, else `PocketTooSmall`.
pub fn build_stack(
    loops: &[Loop],
    margin_mm: f64,
    tool_diameter_mm: f64,
    stepover: f64,
) -> CoreResult<Vec<RingLevel>> {
    let tool_radius = tool_diameter_mm / 2.0;
    let step = stepover * tool_diameter_mm;
    if step <= 0.0 {
        return Err(CoreError::BadParameter(
            "stepover * tool_diameter_mm must be positive".into(),
        ));
    }

    let mut levels = Vec::new();
    let mut distance = margin_mm + tool_radius;

    loop {
        let Some(rings) = offset(loops, distance) else {
            break;
        };
        let outer = &rings[0];
        let islands = &rings[1..];

        let cuttable = geometry::subtract_islands(outer, islands);
        if cuttable.is_empty() {
            break;
        }

        levels.push(RingLevel {
            distance,
            loops: cuttable,
        });
        distance += step;
    }

    if levels.is_empty() {
        return Err(CoreError::PocketTooSmall(format!(
            "no feasible offset ring at margin={margin_mm}mm tool_d={tool_diameter_mm}mm"
        )));
    }
    Ok(levels)
}
