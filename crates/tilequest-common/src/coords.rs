//! Coordinate types for world-pixel positions and tile grids.
//!
//! World space is measured in pixels with the origin at the top-left of the
//! map and `y` growing downward.

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// Axis-aligned rectangle in world pixels, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
}

impl Rect {
    /// Creates a new rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle of the given size centred on `center`.
    #[must_use]
    pub fn from_center(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    /// Top-left corner.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Size as a vector.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Corners in clockwise order starting at the top-left.
    #[must_use]
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.right(), self.y),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.x, self.bottom()),
        ]
    }

    /// Returns this rectangle moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Returns this rectangle with its top-left moved to `position`.
    #[must_use]
    pub fn at(&self, position: Vec2) -> Self {
        Self::new(position.x, position.y, self.width, self.height)
    }

    /// Grows the rectangle by `fraction` of its size, keeping it centred.
    #[must_use]
    pub fn expanded_by_fraction(&self, fraction: f32) -> Self {
        Self::new(
            self.x - self.width * fraction / 2.0,
            self.y - self.height * fraction / 2.0,
            self.width * (1.0 + fraction),
            self.height * (1.0 + fraction),
        )
    }

    /// Inclusive point containment (edges count as inside).
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

/// Tile grid coordinate (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts a row-major data index into a coordinate for a grid `width` tiles wide.
    #[must_use]
    pub const fn from_index(index: usize, width: u32) -> Self {
        let width = if width == 0 { 1 } else { width as usize };
        Self {
            x: (index % width) as i32,
            y: (index / width) as i32,
        }
    }

    /// Returns this coordinate offset by another (chunk origin plus local tile).
    #[must_use]
    pub const fn offset(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Top-left pixel position of this tile.
    #[must_use]
    pub fn to_pixel(self, tile_size: u32) -> Vec2 {
        Vec2::new(
            (self.x as f32) * tile_size as f32,
            (self.y as f32) * tile_size as f32,
        )
    }
}
