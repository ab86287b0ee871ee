//! Per-frame player intent.
//!
//! The simulation does not read devices. A frontend (or a scripted harness)
//! converts whatever it reads into a [`MoveIntent`] plus a list of
//! [`PlayerAction`]s and hands them to the world each frame.

use crate::progression::{AbilityChoice, Spell};
use crate::quest::NpcKind;
use serde::{Deserialize, Serialize};
use tilequest_common::Vec2;

/// Directional movement intent, each axis in [-1, 1] with `y` pointing down.
///
/// Deserialized intents go through [`MoveIntent::new`], so scripts cannot
/// carry out-of-range or non-finite axes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawIntent")]
pub struct MoveIntent {
    /// Horizontal axis
    pub x: f32,
    /// Vertical axis
    pub y: f32,
}

impl MoveIntent {
    /// No movement.
    pub const NONE: Self = Self { x: 0.0, y: 0.0 };

    /// Creates an intent, clamping each axis to [-1, 1]. Non-finite axes
    /// become 0.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_axis(x),
            y: clamp_axis(y),
        }
    }

    /// This intent with the [`MoveIntent::new`] rules reapplied.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self::new(self.x, self.y)
    }

    /// Whether any axis is non-zero.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.x != 0.0 || self.y != 0.0
    }

    /// As a vector.
    #[must_use]
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

fn clamp_axis(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawIntent {
    x: f32,
    y: f32,
}

impl Default for RawIntent {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl From<RawIntent> for MoveIntent {
    fn from(raw: RawIntent) -> Self {
        Self::new(raw.x, raw.y)
    }
}

/// A discrete action requested this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Basic melee swing
    BasicAttack,
    /// Strong melee swing
    StrongAttack,
    /// Fire arrows
    RangedShot,
    /// Mode-dependent single-button attack
    CombinedAttack,
    /// Dash along the current intent
    Dash,
    /// Toggle melee and ranged
    SwapWeapon,
    /// Cast an unlocked spell
    CastSpell(Spell),
    /// Resolve the pending ability choice
    SelectAbility(AbilityChoice),
    /// Start talking to an NPC
    Talk(NpcKind),
    /// Advance an NPC's open dialog
    AdvanceDialog(NpcKind),
    /// Click at a screen position (talks to the NPC under it)
    Click {
        /// Screen X
        x: f32,
        /// Screen Y
        y: f32,
    },
}
