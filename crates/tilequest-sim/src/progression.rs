//! Experience, levels and ability unlocks.
//!
//! This module provides:
//! - The level threshold table
//! - XP accumulation and level-up detection
//! - Ability and spell unlock flags
//! - The pending ability choice opened at specific levels

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cumulative XP needed to reach each level (index 1 is level 2).
pub const LEVEL_THRESHOLDS: [u32; 9] = [0, 400, 1000, 1800, 2800, 4000, 5600, 7600, 10000];

/// Highest reachable level.
pub const MAX_LEVEL: u32 = (LEVEL_THRESHOLDS.len() - 1) as u32;

/// Levels that open an ability choice.
pub const CHOICE_LEVELS: [u32; 4] = [2, 3, 5, 8];

/// XP granted when no per-kind reward applies.
pub const DEFAULT_XP_REWARD: u32 = 20;

/// XP granted for turning in the boss quest.
pub const BOSS_QUEST_XP: u32 = 1000;

/// Max health gained per level.
pub const LEVEL_HEALTH_BONUS: i32 = 10;

/// Basic damage gained per level.
pub const LEVEL_DAMAGE_BONUS: i32 = 1;

/// Strong damage gained per level.
pub const LEVEL_STRONG_DAMAGE_BONUS: i32 = 2;

/// Health restored per kill with Vampiric.
pub const VAMPIRIC_HEAL: i32 = 5;

/// Fraction of max health granted by One Man Show.
pub const ONE_MAN_SHOW_HEALTH_FRACTION: f32 = 0.15;

/// One of the two options offered at a choice level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityChoice {
    /// First option
    A,
    /// Second option
    B,
}

/// A castable spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spell {
    /// Piercing fire projectile
    FireSplitters,
    /// Hit-absorbing buff
    Shield,
}

/// Anything the player can unlock at a choice level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unlock {
    /// Fire Splitters spell
    FireSplitters,
    /// Shield spell
    Shield,
    /// Ranged shots fire three arrows
    Multishot,
    /// 15% damage reduction and bonus max health
    OneManShow,
    /// +30% damage below half health
    Berserker,
    /// Heal on kill
    Vampiric,
    /// Double strong attack damage
    TitansWrath,
    /// 40% shorter cooldowns
    SwiftAssassin,
}

impl Unlock {
    /// The unlock behind `choice` at `level`, if that level offers one.
    #[must_use]
    pub fn for_choice(level: u32, choice: AbilityChoice) -> Option<Self> {
        use AbilityChoice::{A, B};
        match (level, choice) {
            (2, A) => Some(Self::FireSplitters),
            (2, B) => Some(Self::Shield),
            (3, A) => Some(Self::Multishot),
            (3, B) => Some(Self::OneManShow),
            (5, A) => Some(Self::Berserker),
            (5, B) => Some(Self::Vampiric),
            (8, A) => Some(Self::TitansWrath),
            (8, B) => Some(Self::SwiftAssassin),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::FireSplitters => "Fire Splitters",
            Self::Shield => "Shield",
            Self::Multishot => "Multishot",
            Self::OneManShow => "One Man Show",
            Self::Berserker => "Berserker",
            Self::Vampiric => "Vampiric Strikes",
            Self::TitansWrath => "Titan's Wrath",
            Self::SwiftAssassin => "Swift Assassin",
        }
    }
}

/// Passive ability flags. Each flag is set at most once and never cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbilityFlags {
    /// Ranged shots fire three arrows
    pub multishot: bool,
    /// Incoming damage reduced by 15%
    pub one_man_show: bool,
    /// +30% outgoing damage below half health
    pub berserker: bool,
    /// +5 HP per kill
    pub vampiric: bool,
    /// Strong attacks deal double damage
    pub titans_wrath: bool,
    /// Cooldowns scaled by 0.6
    pub swift_assassin: bool,
}

/// Unlocked spells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpellFlags {
    /// Fire Splitters available
    pub fire_splitters: bool,
    /// Shield available
    pub shield: bool,
}

impl SpellFlags {
    /// Whether `spell` has been unlocked.
    #[must_use]
    pub fn has(&self, spell: Spell) -> bool {
        match spell {
            Spell::FireSplitters => self.fire_splitters,
            Spell::Shield => self.shield,
        }
    }
}

/// XP, level and unlock state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    xp: u32,
    level: u32,
    pending_choice: Option<u32>,
    /// Passive abilities
    pub abilities: AbilityFlags,
    /// Spells
    pub spells: SpellFlags,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new()
    }
}

impl Progression {
    /// Level 1 with no XP and nothing unlocked.
    #[must_use]
    pub fn new() -> Self {
        Self {
            xp: 0,
            level: 1,
            pending_choice: None,
            abilities: AbilityFlags::default(),
            spells: SpellFlags::default(),
        }
    }

    /// Total XP.
    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Level whose ability choice is waiting, if any.
    #[must_use]
    pub fn pending_choice(&self) -> Option<u32> {
        self.pending_choice
    }

    /// Whether an ability choice is open (XP gain from kills is blocked).
    #[must_use]
    pub fn is_choice_open(&self) -> bool {
        self.pending_choice.is_some()
    }

    /// Adds XP unconditionally and processes level-ups. Returns levels gained.
    pub fn add_xp(&mut self, amount: u32) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        debug!("+{} XP, total {}", amount, self.xp);
        self.check_level_up()
    }

    /// Raises the level while the XP total passes the next threshold.
    ///
    /// Returns the number of levels gained. A choice level reached on the way
    /// becomes the pending choice; a later one in the same call replaces it.
    pub fn check_level_up(&mut self) -> u32 {
        let mut gained = 0;
        while self.level < MAX_LEVEL && self.xp >= LEVEL_THRESHOLDS[self.level as usize] {
            self.level += 1;
            gained += 1;
            info!("Level up! Now level {}", self.level);
            if CHOICE_LEVELS.contains(&self.level) {
                self.pending_choice = Some(self.level);
                info!("Ability choice available at level {}", self.level);
            }
        }
        gained
    }

    /// Fraction of the way through the current level, in [0, 1]; 1 at max level.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.level >= MAX_LEVEL {
            return 1.0;
        }
        let current = if self.level > 1 {
            LEVEL_THRESHOLDS[self.level as usize - 1]
        } else {
            0
        };
        let next = LEVEL_THRESHOLDS[self.level as usize];
        let into = self.xp.saturating_sub(current) as f32;
        (into / (next - current) as f32).clamp(0.0, 1.0)
    }

    /// XP remaining until the next level; 0 at max level.
    #[must_use]
    pub fn xp_to_next_level(&self) -> u32 {
        if self.level >= MAX_LEVEL {
            return 0;
        }
        LEVEL_THRESHOLDS[self.level as usize].saturating_sub(self.xp)
    }

    /// Resolves the pending choice. Returns what was unlocked, or `None` when
    /// no choice is open.
    pub fn select(&mut self, choice: AbilityChoice) -> Option<Unlock> {
        let level = self.pending_choice.take()?;
        let unlock = Unlock::for_choice(level, choice)?;
        self.apply_unlock(unlock);
        info!("Unlocked {} at level {}", unlock.name(), level);
        Some(unlock)
    }

    /// Sets the flag behind `unlock`.
    pub fn apply_unlock(&mut self, unlock: Unlock) {
        match unlock {
            Unlock::FireSplitters => self.spells.fire_splitters = true,
            Unlock::Shield => self.spells.shield = true,
            Unlock::Multishot => self.abilities.multishot = true,
            Unlock::OneManShow => self.abilities.one_man_show = true,
            Unlock::Berserker => self.abilities.berserker = true,
            Unlock::Vampiric => self.abilities.vampiric = true,
            Unlock::TitansWrath => self.abilities.titans_wrath = true,
            Unlock::SwiftAssassin => self.abilities.swift_assassin = true,
        }
    }
}
