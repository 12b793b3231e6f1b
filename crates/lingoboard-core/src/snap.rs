//! Snap-to-alignment for moving and resizing blocks.
//!
//! Every rectangle exposes three snap points per axis: its min edge, center and
//! max edge. A moving rectangle snaps an axis when one of its own points comes
//! within the threshold of a point of another rectangle. Only the first match
//! per axis is applied, in the order the other rectangles are given.

use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// Distance threshold for snapping (in world units).
pub const SNAP_THRESHOLD: f64 = 10.0;

/// How far guide lines extend beyond the moving rectangle.
pub const GUIDE_OVERSHOOT: f64 = 100.0;

/// Tunables for alignment snapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Whether snapping is applied at all.
    pub enabled: bool,
    pub threshold: f64,
    pub overshoot: f64,
    /// Spatial index cell size.
    pub bin_size: f64,
    /// Proximity padding of the spatial index; only rectangles this close are candidates.
    pub query_padding: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: SNAP_THRESHOLD,
            overshoot: GUIDE_OVERSHOOT,
            bin_size: crate::spatial::DEFAULT_BIN_SIZE,
            query_padding: 100.0,
        }
    }
}

/// Axis a guide line is anchored on.
///
/// `X` guides are vertical lines at an x coordinate; `Y` guides are horizontal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapAxis {
    X,
    Y,
}

/// Which projection of a rectangle a snap point is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapTargetKind {
    Min,
    Center,
    Max,
}

impl SnapTargetKind {
    pub const ALL: [SnapTargetKind; 3] = [SnapTargetKind::Min, SnapTargetKind::Center, SnapTargetKind::Max];
}

/// A render-only alignment guide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapLine {
    pub axis: SnapAxis,
    /// World coordinate on `axis`.
    pub position: f64,
    /// Extent along the other axis.
    pub start: f64,
    pub end: f64,
}

/// Result of a snap computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapOutcome {
    /// Snapped left edge.
    pub x: f64,
    /// Snapped top edge.
    pub y: f64,
    pub snapped_x: bool,
    pub snapped_y: bool,
    pub guides: Vec<SnapLine>,
}

impl SnapOutcome {
    /// Create a result with no snapping.
    pub fn none(rect: Rect) -> Self {
        Self {
            x: rect.x0,
            y: rect.y0,
            snapped_x: false,
            snapped_y: false,
            guides: Vec::new(),
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }

    /// The moving rectangle translated to the snapped position.
    pub fn apply(&self, rect: Rect) -> Rect {
        rect.with_origin((self.x, self.y))
    }
}

/// Snap point of `rect` on `axis`.
pub fn snap_point(rect: Rect, axis: SnapAxis, kind: SnapTargetKind) -> f64 {
    let (min, max) = match axis {
        SnapAxis::X => (rect.x0, rect.x1),
        SnapAxis::Y => (rect.y0, rect.y1),
    };
    match kind {
        SnapTargetKind::Min => min,
        SnapTargetKind::Center => (min + max) / 2.0,
        SnapTargetKind::Max => max,
    }
}

/// The three snap points of `rect` on `axis`.
pub fn snap_points(rect: Rect, axis: SnapAxis) -> [f64; 3] {
    SnapTargetKind::ALL.map(|kind| snap_point(rect, axis, kind))
}

fn has_area(rect: Rect) -> bool {
    rect.width() > 0.0 && rect.height() > 0.0 && rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}

fn threshold_is_valid(threshold: f64) -> bool {
    threshold.is_finite() && threshold > 0.0
}

/// First target within the threshold of one of `own` on one axis.
///
/// Returns `(target, shift)` where `shift` moves the matching own point onto the target.
fn first_match<'a, I>(own: &[f64], others: I, axis: SnapAxis, threshold: f64) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a Rect>,
{
    for other in others {
        if !has_area(*other) {
            continue;
        }
        for target in snap_points(*other, axis) {
            for &point in own {
                if (target - point).abs() < threshold {
                    return Some((target, target - point));
                }
            }
        }
    }
    None
}

/// Build the guide for a snapped axis, spanning the snapped rectangle on the other axis.
fn guide(axis: SnapAxis, position: f64, snapped: Rect, overshoot: f64) -> SnapLine {
    let (lo, hi) = match axis {
        SnapAxis::X => (snapped.y0, snapped.y1),
        SnapAxis::Y => (snapped.x0, snapped.x1),
    };
    SnapLine {
        axis,
        position,
        start: lo - overshoot,
        end: hi + overshoot,
    }
}

/// Snap a moving rectangle against other rectangles.
///
/// Axes are independent. Degenerate input (zero-size moving rectangle, no
/// other rectangles, invalid threshold) yields no snap.
pub fn compute_snap(moving: Rect, others: &[Rect], threshold: f64, overshoot: f64) -> SnapOutcome {
    if !has_area(moving) || others.is_empty() || !threshold_is_valid(threshold) {
        return SnapOutcome::none(moving);
    }

    let hit_x = first_match(&snap_points(moving, SnapAxis::X), others, SnapAxis::X, threshold);
    let hit_y = first_match(&snap_points(moving, SnapAxis::Y), others, SnapAxis::Y, threshold);

    let shift = kurbo::Vec2::new(
        hit_x.map_or(0.0, |(_, dx)| dx),
        hit_y.map_or(0.0, |(_, dy)| dy),
    );
    let snapped = moving + shift;

    let mut guides = Vec::with_capacity(2);
    if let Some((target, _)) = hit_x {
        guides.push(guide(SnapAxis::X, target, snapped, overshoot));
    }
    if let Some((target, _)) = hit_y {
        guides.push(guide(SnapAxis::Y, target, snapped, overshoot));
    }

    SnapOutcome {
        x: snapped.x0,
        y: snapped.y0,
        snapped_x: hit_x.is_some(),
        snapped_y: hit_y.is_some(),
        guides,
    }
}

/// Edges being dragged during a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovingEdges {
    /// `Min` = left edge, `Max` = right edge.
    pub x: Option<SnapTargetKind>,
    /// `Min` = top edge, `Max` = bottom edge.
    pub y: Option<SnapTargetKind>,
}

/// Result of snapping resize edges.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSnapOutcome {
    pub rect: Rect,
    pub guides: Vec<SnapLine>,
}

/// Snap only the edges being dragged, leaving the opposite edges in place.
pub fn snap_edges(rect: Rect, edges: MovingEdges, others: &[Rect], threshold: f64, overshoot: f64) -> EdgeSnapOutcome {
    let mut result = EdgeSnapOutcome { rect, guides: Vec::new() };
    if !has_area(rect) || others.is_empty() || !threshold_is_valid(threshold) {
        return result;
    }

    let mut snapped = rect;
    let mut hits: Vec<(SnapAxis, f64)> = Vec::with_capacity(2);
    for (axis, kind) in [(SnapAxis::X, edges.x), (SnapAxis::Y, edges.y)] {
        let Some(kind) = kind else { continue };
        let own = snap_point(rect, axis, kind);
        let Some((target, _)) = first_match(&[own], others, axis, threshold) else { continue };
        match (axis, kind) {
            (SnapAxis::X, SnapTargetKind::Min) => snapped.x0 = target,
            (SnapAxis::X, _) => snapped.x1 = target,
            (SnapAxis::Y, SnapTargetKind::Min) => snapped.y0 = target,
            (SnapAxis::Y, _) => snapped.y1 = target,
        }
        hits.push((axis, target));
    }

    result.guides = hits
        .into_iter()
        .map(|(axis, position)| guide(axis, position, snapped, overshoot))
        .collect();
    result.rect = snapped;
    result
}
