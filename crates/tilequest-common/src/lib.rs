//! # Tilequest Common
//!
//! Common types shared by the Tilequest simulation crates.
//!
//! This crate provides:
//! - Pixel-space coordinate types (`Rect`, `TileCoord`, `Vec2`)
//! - ID types (`EntityId`)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_coord_conversion() {
        let tile = TileCoord::from_index(13, 10);
        assert_eq!(tile, TileCoord::new(3, 1));
        assert_eq!(tile.to_pixel(64), Vec2::new(192.0, 64.0));
    }

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
        assert!(!EntityId::NULL.is_valid());
    }

    #[test]
    fn test_rect_center() {
        let rect = Rect::new(10.0, 20.0, 68.0, 68.0);
        assert_eq!(rect.center(), Vec2::new(44.0, 54.0));
    }
}
