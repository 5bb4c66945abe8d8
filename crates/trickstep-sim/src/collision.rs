use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world pixels (top-left origin, y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    /// Whether the vertical span `[top, bottom]` intersects `[y0, y0 + len]`.
    pub fn spans_vertically(&self, y0: f32, len: f32) -> bool {
        self.top() <= y0 + len && self.bottom() >= y0
    }
}

/// Result of a vertical resolution against one solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalContact {
    /// Corrected y for the moving rectangle.
    pub y: f32,
    /// True when the contact surface is the one gravity pulls toward.
    pub landed: bool,
}

/// Push `body` out of `solid` along x, opposite to its horizontal velocity.
///
/// Returns the corrected x, or `None` if there is no overlap or no horizontal
/// motion to resolve against.
pub fn resolve_x(body: &Rect, vx: f32, solid: &Rect) -> Option<f32> {
    if !body.overlaps(solid) {
        return None;
    }
    if vx > 0.0 {
        Some(solid.left() - body.w)
    } else if vx < 0.0 {
        Some(solid.right())
    } else {
        None
    }
}

/// Push `body` out of `solid` along y, opposite to its vertical velocity.
///
/// `gravity_scale` decides which face is walkable: with normal gravity a
/// downward hit lands on the solid's top, with inverted gravity an upward hit
/// lands on its underside.
pub fn resolve_y(
    body: &Rect,
    vy: f32,
    gravity_scale: f32,
    solid: &Rect,
) -> Option<VerticalContact> {
    if !body.overlaps(solid) {
        return None;
    }
    let inverted = gravity_scale < 0.0;
    if vy > 0.0 {
        Some(VerticalContact {
            y: solid.top() - body.h,
            landed: !inverted,
        })
    } else if vy < 0.0 {
        Some(VerticalContact {
            y: solid.bottom(),
            landed: inverted,
        })
    } else {
        None
    }
}
