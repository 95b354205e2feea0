//! crates/ub_reader_core/src/positioning.rs
//!
//! Places the floating selection menu relative to a selection rectangle while keeping
//! it on screen. Pure functions; recomputed every time the menu is shown.

use serde::{Deserialize, Serialize};

/// Gap between the selection and the menu.
pub const MENU_OFFSET: f64 = 8.0;
/// Minimum distance between the menu and any viewport edge.
pub const VIEWPORT_MARGIN: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// A viewport-relative rectangle, like a DOMRect.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Menu position for a selection: below it and aligned to its left edge, shifted left
/// when it would overflow the right edge, flipped above when it would overflow the
/// bottom, and finally clamped into the viewport.
pub fn menu_position(selection: Rect, menu: Size, viewport: Size) -> Point {
    let mut x = selection.left;
    let mut y = selection.bottom() + MENU_OFFSET;

    if x + menu.width > viewport.width - VIEWPORT_MARGIN {
        x = viewport.width - VIEWPORT_MARGIN - menu.width;
    }
    if y + menu.height > viewport.height - VIEWPORT_MARGIN {
        y = selection.top - MENU_OFFSET - menu.height;
    }

    clamp_to_viewport(Point { x, y }, menu, viewport)
}

/// Menu position for a context menu opened at the pointer.
pub fn pointer_position(pointer: Point, menu: Size, viewport: Size) -> Point {
    clamp_to_viewport(pointer, menu, viewport)
}

fn clamp_to_viewport(point: Point, menu: Size, viewport: Size) -> Point {
    let max_x = (viewport.width - VIEWPORT_MARGIN - menu.width).max(VIEWPORT_MARGIN);
    let max_y = (viewport.height - VIEWPORT_MARGIN - menu.height).max(VIEWPORT_MARGIN);
    Point {
        x: point.x.clamp(VIEWPORT_MARGIN, max_x),
        y: point.y.clamp(VIEWPORT_MARGIN, max_y),
    }
}
