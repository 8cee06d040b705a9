//! Entity references and normalized canvas positions.

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque identifier for a controllable device or scene (e.g. `light.kitchen`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(String);

impl EntityRef {
    /// Create a new entity reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the identifier is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A point on the card canvas expressed as percentages (0-100) of width and height.
///
/// Positions are resolution independent; convert to pixels with
/// [`Position::to_pixels`] once the canvas size is known.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Lower bound of both axes.
    pub const MIN: f64 = 0.0;
    /// Upper bound of both axes.
    pub const MAX: f64 = 100.0;
    /// Canvas midpoint.
    pub const CENTER: Position = Position { x: 50.0, y: 50.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Check that both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Clamp both axes to [0, 100].
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(Self::MIN, Self::MAX),
            y: self.y.clamp(Self::MIN, Self::MAX),
        }
    }

    /// Offset by a delta expressed in percentage points.
    pub fn offset(self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
        }
    }

    /// Round both axes to the given number of decimals.
    pub fn rounded(self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        Self {
            x: (self.x * factor).round() / factor,
            y: (self.y * factor).round() / factor,
        }
    }

    /// Convert to canvas pixel coordinates.
    pub fn to_pixels(self, canvas: Size) -> Point {
        Point::new(self.x / 100.0 * canvas.width, self.y / 100.0 * canvas.height)
    }

    /// Convert canvas pixel coordinates back to a percentage position.
    /// A zero-sized axis maps to 0.
    pub fn from_pixels(point: Point, canvas: Size) -> Self {
        Self {
            x: percent_of(point.x, canvas.width),
            y: percent_of(point.y, canvas.height),
        }
    }
}

/// Convert a pixel delta into percentage points of the canvas.
pub fn pixel_delta_to_percent(delta: Vec2, canvas: Size) -> Vec2 {
    Vec2::new(percent_of(delta.x, canvas.width), percent_of(delta.y, canvas.height))
}

fn percent_of(value: f64, extent: f64) -> f64 {
    if extent > 0.0 { value / extent * 100.0 } else { 0.0 }
}

impl From<Position> for Point {
    fn from(position: Position) -> Self {
        Point::new(position.x, position.y)
    }
}

impl From<Point> for Position {
    fn from(point: Point) -> Self {
        Self::new(point.x, point.y)
    }
}

/// Authoritative mapping from entity to its canvas position.
pub type PositionMap = HashMap<EntityRef, Position>;
