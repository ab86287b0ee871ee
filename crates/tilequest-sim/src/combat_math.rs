//! Damage and cooldown formulas.
//!
//! Pure functions of the current ability flags and health; the only side
//! effect is shield charge consumption in [`incoming_damage`].

use crate::effects::Shield;
use crate::progression::AbilityFlags;
use serde::{Deserialize, Serialize};

/// Berserker applies below this fraction of max health.
pub const BERSERKER_HEALTH_FRACTION: f32 = 0.5;
/// Berserker damage multiplier.
pub const BERSERKER_MULTIPLIER: f32 = 1.3;
/// Titan's Wrath strong attack multiplier.
pub const TITANS_WRATH_MULTIPLIER: i32 = 2;
/// One Man Show incoming damage multiplier.
pub const ONE_MAN_SHOW_MULTIPLIER: f32 = 0.85;
/// Swift Assassin cooldown multiplier.
pub const SWIFT_ASSASSIN_MULTIPLIER: f32 = 0.6;

/// The kind of attack dealing damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackKind {
    /// Basic melee swing
    Basic,
    /// Strong melee swing
    Strong,
    /// Arrow
    Ranged,
    /// Spell
    Magic,
}

/// Damage the player deals with an attack of `kind`.
///
/// Berserker scaling (floored) is applied first, then Titan's Wrath doubling.
#[must_use]
pub fn outgoing_damage(
    base: i32,
    kind: AttackKind,
    abilities: &AbilityFlags,
    health: i32,
    max_health: i32,
) -> i32 {
    let mut damage = base;
    if abilities.berserker && (health as f32) < max_health as f32 * BERSERKER_HEALTH_FRACTION {
        damage = (damage as f32 * BERSERKER_MULTIPLIER).floor() as i32;
    }
    if abilities.titans_wrath && kind == AttackKind::Strong {
        damage *= TITANS_WRATH_MULTIPLIER;
    }
    damage
}

/// Damage the player takes from a hit of `base`.
///
/// An active shield absorbs the hit entirely and loses one charge.
#[must_use]
pub fn incoming_damage(base: i32, abilities: &AbilityFlags, shield: Option<&mut Shield>) -> i32 {
    if let Some(shield) = shield {
        if shield.absorb() {
            return 0;
        }
    }
    if abilities.one_man_show {
        return (base as f32 * ONE_MAN_SHOW_MULTIPLIER).floor() as i32;
    }
    base
}

/// Effective cooldown for a base duration in seconds.
#[must_use]
pub fn cooldown_duration(base: f32, abilities: &AbilityFlags) -> f32 {
    if abilities.swift_assassin {
        base * SWIFT_ASSASSIN_MULTIPLIER
    } else {
        base
    }
}
