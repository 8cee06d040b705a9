//! Grid snapping for dragged positions.

use crate::position::Position;
use kurbo::{Point, Size};

/// Default grid spacing in canvas pixels.
pub const DEFAULT_GRID_SIZE: f64 = 25.0;

/// Decide whether a drag update snaps.
///
/// The held modifier inverts the persistent default: with snapping on by
/// default, holding it places freely, and vice versa.
pub fn should_snap(modifier_held: bool, snap_by_default: bool) -> bool {
    modifier_held ^ snap_by_default
}

/// Snap a pixel point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

/// Snap a percentage position to a pixel grid on a canvas of the given size.
///
/// Returns the position unchanged when `should_snap` is false, the grid size
/// is not positive, or the canvas has no area.
pub fn snap(position: Position, should_snap: bool, grid_size: f64, canvas: Size) -> Position {
    if !should_snap || grid_size <= 0.0 || !grid_size.is_finite() {
        return position;
    }
    if canvas.width <= 0.0 || canvas.height <= 0.0 {
        return position;
    }
    let snapped = snap_to_grid(position.to_pixels(canvas), grid_size);
    Position::from_pixels(snapped, canvas)
}
