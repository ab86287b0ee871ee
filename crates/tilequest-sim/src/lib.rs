//! # Tilequest Sim
//!
//! Frame-driven simulation core for a top-down action RPG.
//!
//! This crate provides:
//! - Tiled map model and static collision (rectangles and polygons)
//! - Character controller with dash, melee, bow and spells
//! - Data-driven enemy behaviors and per-frame AI
//! - Player arrows, enemy arrows and Fire Splitters projectiles
//! - XP, levels, ability unlocks, NPC dialog and quests
//! - A world that advances every system in a fixed order
//! - Event bus and render snapshots for the outside

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod camera;
pub mod character;
pub mod collision;
pub mod combat_math;
pub mod effects;
pub mod enemy;
pub mod enemy_ai;
pub mod events;
pub mod geometry;
pub mod input;
pub mod map;
pub mod progression;
pub mod projectile;
pub mod quest;
pub mod snapshot;
pub mod spawn;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::camera::*;
    pub use crate::character::*;
    pub use crate::collision::*;
    pub use crate::combat_math::*;
    pub use crate::effects::*;
    pub use crate::enemy::*;
    pub use crate::enemy_ai::*;
    pub use crate::events::*;
    pub use crate::geometry::*;
    pub use crate::input::*;
    pub use crate::map::*;
    pub use crate::progression::*;
    pub use crate::projectile::*;
    pub use crate::quest::*;
    pub use crate::snapshot::*;
    pub use crate::spawn::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_thresholds() {
        let mut progression = Progression::new();
        progression.add_xp(399);
        assert_eq!(progression.level(), 1);
        progression.add_xp(1);
        assert_eq!(progression.level(), 2);
        assert!(progression.is_choice_open());
    }
}
