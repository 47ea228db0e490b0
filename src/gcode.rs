//! G-code assembly contract (§6).
//!
//! Given a `Toolpath` and a post-processor profile, produces UTF-8 text:
//! header (unit prefix + metadata comment), move lines, slowdown-zone
//! wrapping per `AdaptiveFeedMode`, footer. This crate owns only the
//! assembly contract; actual header/footer *templates* are an external
//! collaborator (§1 Non-goals).

use crate::planner::{Move, Toolpath, Units};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveFeedMode {
    Comment,
    InlineF,
    Mcode,
    Inherit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveFeedConfig {
    pub mode: AdaptiveFeedMode,
    pub slowdown_threshold: f64,
    pub inline_min_f: f64,
    pub mcode_start: String,
    pub mcode_end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostProcessorProfile {
    pub id: String,
    pub header: Vec<String>,
    pub footer: Vec<String>,
    pub adaptive_feed: AdaptiveFeedConfig,
}

/// Assemble G-code text for `path` under `profile`.
pub fn assemble(path: &Toolpath, units: Units, profile: &PostProcessorProfile, now: DateTime<Utc>) -> String {
    let mut lines = Vec::new();

    let unit_code = match units {
        Units::Mm => "G21",
        Units::Inch => "G20",
    };
    let header_has_unit = profile
        .header
        .iter()
        .any(|l| l.trim_start().starts_with("G20") || l.trim_start().starts_with("G21"));
    if !header_has_unit {
        lines.push(unit_code.to_string());
    }
    lines.extend(profile.header.iter().cloned());

    let unit_str = match units {
        Units::Mm => "mm",
        Units::Inch => "inch",
    };
    lines.push(format!(
        "(POST={};UNITS={};DATE={})",
        profile.id,
        unit_str,
        now.to_rfc3339()
    ));

    let mut in_zone = false;
    let mut axes = AxisState::default();
    for mv in &path.moves {
        let slowdown = mv.meta().and_then(|m| m.slowdown);
        let tight = slowdown.map(|s| s < profile.adaptive_feed.slowdown_threshold).unwrap_or(false);

        match profile.adaptive_feed.mode {
            AdaptiveFeedMode::Comment => {
                if tight && !in_zone {
                    lines.push(format!(
                        "(FEED_HINT START scale={:.3})",
                        slowdown.unwrap_or(1.0)
                    ));
                    in_zone = true;
                } else if !tight && in_zone {
                    lines.push("(FEED_HINT END)".to_string());
                    in_zone = false;
                }
                lines.push(format_move_line(mv, &mut axes));
            }
            AdaptiveFeedMode::InlineF => {
                lines.push(format_move_line_scaled(mv, &mut axes, slowdown, profile.adaptive_feed.inline_min_f));
            }
            AdaptiveFeedMode::Mcode => {
                if tight && !in_zone {
                    lines.push(profile.adaptive_feed.mcode_start.clone());
                    in_zone = true;
                } else if !tight && in_zone {
                    lines.push(profile.adaptive_feed.mcode_end.clone());
                    in_zone = false;
                }
                lines.push(format_move_line(mv, &mut axes));
            }
            AdaptiveFeedMode::Inherit => {
                lines.push(format_move_line(mv, &mut axes));
            }
        }
    }
    if in_zone {
        match profile.adaptive_feed.mode {
            AdaptiveFeedMode::Comment => lines.push("(FEED_HINT END)".to_string()),
            AdaptiveFeedMode::Mcode => lines.push(profile.adaptive_feed.mcode_end.clone()),
            _ => {}
        }
    }

    lines.extend(profile.footer.iter().cloned());
    lines.join("\n") + "\n"
}

/// Tracks the last emitted value of each axis word across move lines so
/// `format_move_line`/`format_move_line_scaled` can omit words that would
/// repeat the previous line's value (§6: "omit unchanged axes").
#[derive(Debug, Default)]
struct AxisState {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    i: Option<f64>,
    j: Option<f64>,
}

fn axis_changed(prev: Option<f64>, cur: f64) -> bool {
    match prev {
        Some(p) => (p - cur).abs() > 1e-9,
        None => true,
    }
}

impl AxisState {
    fn push_fields(&mut self, parts: &mut Vec<String>, to: crate::planner::Point3, center: Option<(f64, f64)>) {
        if axis_changed(self.x, to.x) {
            parts.push(format!("X{:.4}", to.x));
            self.x = Some(to.x);
        }
        if axis_changed(self.y, to.y) {
            parts.push(format!("Y{:.4}", to.y));
            self.y = Some(to.y);
        }
        if axis_changed(self.z, to.z) {
            parts.push(format!("Z{:.4}", to.z));
            self.z = Some(to.z);
        }
        match center {
            Some((i, j)) => {
                if axis_changed(self.i, i) {
                    parts.push(format!("I{:.4}", i));
                    self.i = Some(i);
                }
                if axis_changed(self.j, j) {
                    parts.push(format!("J{:.4}", j));
                    self.j = Some(j);
                }
            }
            None => {
                self.i = None;
                self.j = None;
            }
        }
    }
}

fn format_move_line(mv: &Move, axes: &mut AxisState) -> String {
    let (code, to, center, f) = move_fields(mv);
    let mut parts = vec![code.to_string()];
    axes.push_fields(&mut parts, to, center);
    parts.push(format!("F{:.1}", f));
    parts.join(" ")
}

fn format_move_line_scaled(mv: &Move, axes: &mut AxisState, slowdown: Option<f64>, inline_min_f: f64) -> String {
    let (code, to, center, f) = move_fields(mv);
    let scaled_f = slowdown.map(|s| (f * s).max(inline_min_f)).unwrap_or(f);
    let mut parts = vec![code.to_string()];
    axes.push_fields(&mut parts, to, center);
    parts.push(format!("F{:.1}", scaled_f));
    parts.join(" ")
}

fn move_fields(mv: &Move) -> (&'static str, crate::planner::Point3, Option<(f64, f64)>, f64) {
    match mv {
        Move::Rapid { to, f, .. } => ("G0", *to, None, *f),
        Move::Linear { to, f, .. } => ("G1", *to, None, *f),
        Move::ArcCw { to, f, center_offset, .. } => ("G2", *to, Some((center_offset.x, center_offset.y)), *f),
        Move::ArcCcw { to, f, center_offset, .. } => ("G3", *to, Some((center_offset.x, center_offset.y)), *f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{MoveMeta, Point3};

    fn default_profile(mode: AdaptiveFeedMode) -> PostProcessorProfile {
        PostProcessorProfile {
            id: "generic".into(),
            header: vec!["(header)".into()],
            footer: vec!["M30".into()],
            adaptive_feed: AdaptiveFeedConfig {
                mode,
                slowdown_threshold: 0.85,
                inline_min_f: 100.0,
                mcode_start: "M51".into(),
                mcode_end: "M52".into(),
            },
        }
    }

    fn sample_path() -> Toolpath {
        Toolpath {
            moves: vec![
                Move::Rapid {
                    from: Point3::new(0.0, 0.0, 5.0),
                    to: Point3::new(0.0, 0.0, 5.0),
                    f: 6000.0,
                },
                Move::Linear {
                    from: Point3::new(0.0, 0.0, 5.0),
                    to: Point3::new(10.0, 0.0, -1.0),
                    f: 1200.0,
                    meta: MoveMeta {
                        slowdown: Some(0.5),
                        trochoid: false,
                        bottleneck: Default::default(),
                    },
                },
            ],
        }
    }

    #[test]
    fn prefixes_unit_code_when_absent_from_header() {
        let out = assemble(&sample_path(), Units::Mm, &default_profile(AdaptiveFeedMode::Inherit), Utc::now());
        assert!(out.starts_with("G21"));
    }

    #[test]
    fn comment_mode_wraps_slowdown_zone() {
        let out = assemble(&sample_path(), Units::Mm, &default_profile(AdaptiveFeedMode::Comment), Utc::now());
        assert!(out.contains("FEED_HINT START"));
    }

    #[test]
    fn inline_mode_scales_feed_and_clamps_minimum() {
        let out = assemble(&sample_path(), Units::Mm, &default_profile(AdaptiveFeedMode::InlineF), Utc::now());
        assert!(out.contains("F600.0"));
    }

    #[test]
    fn mcode_mode_brackets_slowdown_zone() {
        let out = assemble(&sample_path(), Units::Mm, &default_profile(AdaptiveFeedMode::Mcode), Utc::now());
        assert!(out.contains("M51"));
    }

    #[test]
    fn move_lines_use_four_decimal_coords_and_one_decimal_feed() {
        let out = assemble(&sample_path(), Units::Mm, &default_profile(AdaptiveFeedMode::Inherit), Utc::now());
        assert!(out.contains("X10.0000"));
        assert!(out.contains("F1200.0"));
    }

    #[test]
    fn unchanged_axes_are_omitted_on_consecutive_moves() {
        let path = Toolpath {
            moves: vec![
                Move::Rapid {
                    from: Point3::new(0.0, 0.0, 5.0),
                    to: Point3::new(0.0, 0.0, 5.0),
                    f: 6000.0,
                },
                Move::Linear {
                    from: Point3::new(0.0, 0.0, 5.0),
                    to: Point3::new(10.0, 0.0, -1.0),
                    f: 1200.0,
                    meta: MoveMeta::default(),
                },
                Move::Linear {
                    from: Point3::new(10.0, 0.0, -1.0),
                    to: Point3::new(10.0, 5.0, -1.0),
                    f: 1200.0,
                    meta: MoveMeta::default(),
                },
            ],
        };
        let out = assemble(&path, Units::Mm, &default_profile(AdaptiveFeedMode::Inherit), Utc::now());
        let last_move_line = out.lines().filter(|l| l.starts_with("G1")).last().unwrap();
        assert!(last_move_line.contains("Y5.0000"), "{last_move_line}");
        assert!(!last_move_line.contains('X'), "unchanged X should be omitted: {last_move_line}");
        assert!(!last_move_line.contains('Z'), "unchanged Z should be omitted: {last_move_line}");
    }
}
