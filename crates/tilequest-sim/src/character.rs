//! Player character controller.
//!
//! This module provides:
//! - The `Character` aggregate (transform, combat, animation, progression)
//! - The `LifeState` machine with its eligibility table
//! - Attack, dash, spell and weapon-swap actions
//! - Per-frame update: regen, cooldowns, attack timing, movement
//! - Damage intake and level-up stat growth

use crate::collision::{character_probe, slide_move, CollisionQuery};
use crate::combat_math::{cooldown_duration, incoming_damage, outgoing_damage, AttackKind};
use crate::effects::Shield;
use crate::input::MoveIntent;
use crate::progression::{
    AbilityChoice, Progression, Spell, Unlock, LEVEL_DAMAGE_BONUS, LEVEL_HEALTH_BONUS,
    LEVEL_STRONG_DAMAGE_BONUS, ONE_MAN_SHOW_HEALTH_FRACTION, VAMPIRIC_HEAL,
};
use serde::{Deserialize, Serialize};
use tilequest_common::{Rect, Vec2};
use tracing::{debug, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Sprite size.
pub const CHARACTER_SIZE: Vec2 = Vec2::new(68.0, 68.0);
/// Walking speed in px/s.
pub const WALK_SPEED: f32 = 300.0;
/// Per-axis factor for diagonal movement.
pub const DIAGONAL_FACTOR: f32 = 0.707;
/// Starting max health.
pub const STARTING_HEALTH: i32 = 100;
/// Starting basic attack damage.
pub const STARTING_BASE_DAMAGE: i32 = 5;
/// Starting strong attack damage.
pub const STARTING_STRONG_DAMAGE: i32 = 15;

/// Dash travel distance in pixels.
pub const DASH_DISTANCE: f32 = 150.0;
/// Dash speed in px/s.
pub const DASH_SPEED: f32 = 500.0;

/// Hurt state duration.
pub const HURT_DURATION: f32 = 0.4;
/// Seconds without damage before regeneration starts.
pub const REGEN_DELAY: f32 = 3.0;
/// Seconds per regenerated hit point.
pub const REGEN_INTERVAL: f32 = 2.0;

/// Centre-to-centre reach of melee swings.
pub const MELEE_RANGE: f32 = 92.0;
/// Frames in a melee swing.
pub const MELEE_FRAMES: u32 = 6;
/// Swing frame on which damage lands.
pub const MELEE_HIT_FRAME: u32 = 3;

/// Basic swing duration.
pub const BASIC_ATTACK_DURATION: f32 = 0.3;
/// Strong swing duration.
pub const STRONG_ATTACK_DURATION: f32 = 0.345;
/// Bow draw duration.
pub const RANGED_ATTACK_DURATION: f32 = 0.3;

/// Base cooldowns in seconds, before Swift Assassin.
pub const BASIC_COOLDOWN: f32 = 0.4;
/// See [`BASIC_COOLDOWN`].
pub const STRONG_COOLDOWN: f32 = 0.8;
/// See [`BASIC_COOLDOWN`].
pub const RANGED_COOLDOWN: f32 = 0.5;
/// See [`BASIC_COOLDOWN`].
pub const COMBINED_COOLDOWN: f32 = 0.5;
/// See [`BASIC_COOLDOWN`].
pub const DASH_COOLDOWN: f32 = 1.0;
/// See [`BASIC_COOLDOWN`].
pub const FIRE_SPLITTERS_COOLDOWN: f32 = 10.0;
/// See [`BASIC_COOLDOWN`].
pub const SHIELD_COOLDOWN: f32 = 30.0;

/// Shoot directions shorter than this are replaced by the facing direction.
const MIN_AIM_LENGTH: f32 = 0.01;

/// Frame tables as (frame count, seconds per frame).
const IDLE_ANIM: (u32, f32) = (4, 0.2);
const RUN_ANIM: (u32, f32) = (6, 0.1);
const DASH_ANIM: (u32, f32) = (8, 0.05);
const RANGED_ANIM: (u32, f32) = (6, 0.05);
const HURT_ANIM: (u32, f32) = (4, 0.1);
/// Death frames, held on the last one.
pub const DEATH_FRAMES: u32 = 8;
const DEATH_FRAME_DURATION: f32 = 0.2;

// ============================================================================
// State enums
// ============================================================================

/// Single authoritative life state. Dead is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifeState {
    /// Normal control
    #[default]
    Active,
    /// Dashing along a fixed direction
    Dashing,
    /// Recently hit; immune to arrows until the timer ends
    Hurt,
    /// Out of health
    Dead,
}

/// What a life state permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    /// Intent-driven walking
    pub walk: bool,
    /// Attacks and spells
    pub attack: bool,
    /// Starting a dash
    pub dash: bool,
    /// Weapon swap
    pub swap: bool,
    /// Arrow hits land
    pub arrow_vulnerable: bool,
    /// Health regeneration
    pub regenerate: bool,
}

impl LifeState {
    /// Eligibility lookup.
    #[must_use]
    pub const fn eligibility(self) -> Eligibility {
        match self {
            Self::Active => Eligibility {
                walk: true,
                attack: true,
                dash: true,
                swap: true,
                arrow_vulnerable: true,
                regenerate: true,
            },
            Self::Dashing => Eligibility {
                walk: false,
                attack: true,
                dash: false,
                swap: true,
                arrow_vulnerable: true,
                regenerate: true,
            },
            Self::Hurt => Eligibility {
                walk: true,
                attack: true,
                dash: true,
                swap: true,
                arrow_vulnerable: false,
                regenerate: true,
            },
            Self::Dead => Eligibility {
                walk: false,
                attack: false,
                dash: false,
                swap: false,
                arrow_vulnerable: false,
                regenerate: false,
            },
        }
    }
}

/// Equipped weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeaponMode {
    /// Sword
    #[default]
    Melee,
    /// Bow
    Ranged,
}

/// Attack in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    /// Basic swing
    Basic,
    /// Strong swing
    Strong,
    /// Bow shot
    Ranged,
}

impl AttackType {
    /// Duration of the attack animation.
    #[must_use]
    pub fn duration(self) -> f32 {
        match self {
            Self::Basic => BASIC_ATTACK_DURATION,
            Self::Strong => STRONG_ATTACK_DURATION,
            Self::Ranged => RANGED_ATTACK_DURATION,
        }
    }

    /// Whether this is a sword swing.
    #[must_use]
    pub fn is_melee(self) -> bool {
        matches!(self, Self::Basic | Self::Strong)
    }
}

/// Animation the renderer should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterAnimation {
    /// Standing
    Idle,
    /// Running
    Run,
    /// Dashing
    Dash,
    /// Basic swing
    BasicAttack,
    /// Strong swing
    StrongAttack,
    /// Bow shot
    RangedAttack,
    /// Hit reaction
    Hurt,
    /// Death
    Death,
}

// ============================================================================
// Sub-states
// ============================================================================

/// Position, facing and directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformState {
    /// Top-left position
    pub position: Vec2,
    /// Sprite size
    pub size: Vec2,
    /// Facing right
    pub facing_right: bool,
    /// Walked this frame
    pub is_moving: bool,
    /// Last non-zero walking direction
    pub last_move_direction: Vec2,
    /// Unit aim direction for arrows and spells
    pub shoot_direction: Vec2,
    /// Unit dash direction
    pub dash_direction: Vec2,
}

/// Cooldown timers in seconds; zero means ready.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cooldowns {
    /// Basic swing
    pub basic: f32,
    /// Strong swing
    pub strong: f32,
    /// Bow
    pub ranged: f32,
    /// Combined button
    pub combined: f32,
    /// Spells (shared)
    pub magic: f32,
    /// Dash
    pub dash: f32,
}

impl Cooldowns {
    fn tick(&mut self, dt: f32) {
        for timer in [
            &mut self.basic,
            &mut self.strong,
            &mut self.ranged,
            &mut self.combined,
            &mut self.magic,
        ] {
            *timer = (*timer - dt).max(0.0);
        }
    }
}

/// Health, damage, weapon and timers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    /// Current health, in [0, max_health]
    pub health: i32,
    /// Max health
    pub max_health: i32,
    /// Basic swing damage
    pub base_damage: i32,
    /// Strong swing damage
    pub base_strong_damage: i32,
    /// Equipped weapon
    pub weapon_mode: WeaponMode,
    /// Attack in progress
    pub attack: Option<AttackType>,
    /// Seconds left in the attack; positive iff `attack` is set
    pub attack_timer: f32,
    /// Whether the current swing has landed
    pub melee_hit_applied: bool,
    /// Cooldowns
    pub cooldowns: Cooldowns,
    /// Seconds left in the dash
    pub dash_remaining: f32,
    /// Seconds left in the hurt state
    pub hurt_remaining: f32,
    /// Seconds since the last hit
    pub time_since_damage: f32,
    /// Regeneration accumulator
    pub regen_timer: f32,
    /// Active shield buff
    pub shield: Option<Shield>,
}

/// Current frame and its clock.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationState {
    /// Frame index
    pub frame: u32,
    /// Seconds into the frame
    pub frame_time: f32,
}

impl AnimationState {
    /// Restart at frame 0.
    pub fn reset(&mut self) {
        self.frame = 0;
        self.frame_time = 0.0;
    }

    fn advance_looping(&mut self, dt: f32, (frames, duration): (u32, f32)) {
        self.frame_time += dt;
        if self.frame_time >= duration {
            self.frame_time = 0.0;
            self.frame = (self.frame + 1) % frames;
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// A melee swing reaching its hit frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeleeStrike {
    /// Character centre when the swing landed
    pub origin: Vec2,
    /// Damage after abilities
    pub damage: i32,
    /// Swing kind
    pub kind: AttackType,
}

/// Source of an incoming hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitSource {
    /// Enemy arrow; ignored while hurt and cancels the current attack
    Arrow,
    /// Enemy melee or area attack
    Melee,
}

/// Result of a hit that landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    /// Damage after shield and abilities
    pub damage: i32,
    /// Whether the hit killed the character
    pub died: bool,
}

/// Result of gaining experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XpGain {
    /// XP added
    pub amount: u32,
    /// Levels gained
    pub levels: u32,
}

// ============================================================================
// Character
// ============================================================================

/// The player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Transform
    pub transform: TransformState,
    /// Combat
    pub combat: CombatState,
    /// Animation
    pub animation: AnimationState,
    /// XP, level and unlocks
    pub progression: Progression,
    life: LifeState,
}

impl Default for Character {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl Character {
    /// Creates a fresh level 1 character at `position`.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            transform: TransformState {
                position,
                size: CHARACTER_SIZE,
                facing_right: true,
                is_moving: false,
                last_move_direction: Vec2::ZERO,
                shoot_direction: Vec2::X,
                dash_direction: Vec2::ZERO,
            },
            combat: CombatState {
                health: STARTING_HEALTH,
                max_health: STARTING_HEALTH,
                base_damage: STARTING_BASE_DAMAGE,
                base_strong_damage: STARTING_STRONG_DAMAGE,
                weapon_mode: WeaponMode::Melee,
                attack: None,
                attack_timer: 0.0,
                melee_hit_applied: false,
                cooldowns: Cooldowns::default(),
                dash_remaining: 0.0,
                hurt_remaining: 0.0,
                time_since_damage: 0.0,
                regen_timer: 0.0,
                shield: None,
            },
            animation: AnimationState::default(),
            progression: Progression::new(),
            life: LifeState::Active,
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Current life state.
    #[must_use]
    pub fn life_state(&self) -> LifeState {
        self.life
    }

    /// Whether the character is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.life == LifeState::Dead
    }

    /// Top-left position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Full sprite bounds.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.transform.position.x,
            self.transform.position.y,
            self.transform.size.x,
            self.transform.size.y,
        )
    }

    /// Sprite centre.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    /// Collision probe at the current position.
    #[must_use]
    pub fn probe(&self) -> Rect {
        character_probe(
            self.transform.position,
            self.transform.size,
            self.transform.facing_right,
        )
    }

    /// Rectangle enemy arrows test against.
    #[must_use]
    pub fn hurtbox(&self) -> Rect {
        let size = self.transform.size;
        Rect::new(
            self.transform.position.x,
            self.transform.position.y + size.y * 0.5,
            size.x * 0.9,
            size.y * 0.5,
        )
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> i32 {
        self.combat.health
    }

    /// Max health.
    #[must_use]
    pub fn max_health(&self) -> i32 {
        self.combat.max_health
    }

    /// Active shield, if any.
    #[must_use]
    pub fn shield(&self) -> Option<&Shield> {
        self.combat.shield.as_ref()
    }

    /// Animation the renderer should play.
    #[must_use]
    pub fn animation_kind(&self) -> CharacterAnimation {
        match self.life {
            LifeState::Dead => return CharacterAnimation::Death,
            LifeState::Hurt => return CharacterAnimation::Hurt,
            LifeState::Dashing => return CharacterAnimation::Dash,
            LifeState::Active => {},
        }
        match (self.combat.weapon_mode, self.combat.attack) {
            (WeaponMode::Melee, Some(AttackType::Basic)) => CharacterAnimation::BasicAttack,
            (WeaponMode::Melee, Some(AttackType::Strong)) => CharacterAnimation::StrongAttack,
            (WeaponMode::Ranged, Some(AttackType::Ranged)) => CharacterAnimation::RangedAttack,
            _ if self.transform.is_moving => CharacterAnimation::Run,
            _ => CharacterAnimation::Idle,
        }
    }

    /// Damage for an attack of `kind` from `base`, after abilities.
    #[must_use]
    pub fn outgoing_damage(&self, base: i32, kind: AttackKind) -> i32 {
        outgoing_damage(
            base,
            kind,
            &self.progression.abilities,
            self.combat.health,
            self.combat.max_health,
        )
    }

    /// Cooldown for `base` seconds, after abilities.
    #[must_use]
    pub fn cooldown(&self, base: f32) -> f32 {
        cooldown_duration(base, &self.progression.abilities)
    }

    /// Aim direction, replaced by the facing direction when degenerate.
    pub fn aim_direction(&mut self) -> Vec2 {
        if self.transform.shoot_direction.length() < MIN_AIM_LENGTH {
            warn!("Invalid shoot direction, using facing direction");
            self.transform.shoot_direction = self.facing_vector();
        }
        self.transform.shoot_direction
    }

    /// Unit vector along the facing direction.
    #[must_use]
    pub fn facing_vector(&self) -> Vec2 {
        if self.transform.facing_right {
            Vec2::X
        } else {
            Vec2::NEG_X
        }
    }

    fn set_life(&mut self, life: LifeState) {
        if self.life != life {
            debug!("Character {:?} -> {:?}", self.life, life);
            self.life = life;
        }
    }

    fn start_attack(&mut self, attack: AttackType) {
        self.combat.attack = Some(attack);
        self.combat.attack_timer = attack.duration();
        self.combat.melee_hit_applied = false;
        self.animation.reset();
    }

    fn cancel_attack(&mut self) {
        self.combat.attack = None;
        self.combat.attack_timer = 0.0;
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Starts a basic swing. Requires melee mode and a ready cooldown.
    pub fn basic_attack(&mut self) -> bool {
        if !self.life.eligibility().attack
            || self.combat.weapon_mode != WeaponMode::Melee
            || self.combat.cooldowns.basic > 0.0
        {
            return false;
        }
        self.start_attack(AttackType::Basic);
        self.combat.cooldowns.basic = self.cooldown(BASIC_COOLDOWN);
        true
    }

    /// Starts a strong swing. Requires melee mode and a ready cooldown.
    pub fn strong_attack(&mut self) -> bool {
        if !self.life.eligibility().attack
            || self.combat.weapon_mode != WeaponMode::Melee
            || self.combat.cooldowns.strong > 0.0
        {
            return false;
        }
        self.start_attack(AttackType::Strong);
        self.combat.cooldowns.strong = self.cooldown(STRONG_COOLDOWN);
        true
    }

    /// Starts a bow shot. Requires ranged mode and a ready cooldown; the
    /// caller spawns the arrows.
    pub fn ranged_shot(&mut self) -> bool {
        if !self.life.eligibility().attack
            || self.combat.weapon_mode != WeaponMode::Ranged
            || self.combat.cooldowns.ranged > 0.0
        {
            return false;
        }
        self.start_attack(AttackType::Ranged);
        self.combat.cooldowns.ranged = self.cooldown(RANGED_COOLDOWN);
        true
    }

    /// Mode-dependent attack on its own cooldown. Returns the attack started.
    pub fn combined_attack(&mut self) -> Option<AttackType> {
        if !self.life.eligibility().attack || self.combat.cooldowns.combined > 0.0 {
            return None;
        }
        let started = match self.combat.weapon_mode {
            WeaponMode::Melee => self.basic_attack().then_some(AttackType::Basic),
            WeaponMode::Ranged => self.ranged_shot().then_some(AttackType::Ranged),
        };
        if started.is_some() {
            self.combat.cooldowns.combined = self.cooldown(COMBINED_COOLDOWN);
        }
        started
    }

    /// Starts a dash along the intent, else the last movement direction,
    /// else the facing direction.
    pub fn dash(&mut self, intent: MoveIntent) -> bool {
        if !self.life.eligibility().dash || self.combat.cooldowns.dash > 0.0 {
            return false;
        }

        let mut direction = intent.sanitized().as_vec2();
        if direction == Vec2::ZERO {
            direction = self.transform.last_move_direction;
        }
        if direction == Vec2::ZERO {
            direction = self.facing_vector();
        }
        let direction = direction.normalize_or_zero();

        if direction.x > 0.0 {
            self.transform.facing_right = true;
        } else if direction.x < 0.0 {
            self.transform.facing_right = false;
        }

        self.transform.dash_direction = direction;
        self.combat.dash_remaining = DASH_DISTANCE / DASH_SPEED;
        self.combat.cooldowns.dash = self.cooldown(DASH_COOLDOWN);
        self.set_life(LifeState::Dashing);
        self.animation.reset();
        debug!("Dash towards {:?}", direction);
        true
    }

    /// Toggles melee and ranged.
    pub fn swap_weapon(&mut self) -> bool {
        if !self.life.eligibility().swap {
            return false;
        }
        self.combat.weapon_mode = match self.combat.weapon_mode {
            WeaponMode::Melee => WeaponMode::Ranged,
            WeaponMode::Ranged => WeaponMode::Melee,
        };
        self.animation.reset();
        debug!("Weapon swapped to {:?}", self.combat.weapon_mode);
        true
    }

    /// Casts an unlocked spell. Fire Splitters needs the caller to spawn the
    /// projectile; Shield is applied here.
    pub fn cast_spell(&mut self, spell: Spell) -> bool {
        if !self.life.eligibility().attack
            || !self.progression.spells.has(spell)
            || self.combat.cooldowns.magic > 0.0
        {
            return false;
        }
        match spell {
            Spell::FireSplitters => {
                self.combat.cooldowns.magic = self.cooldown(FIRE_SPLITTERS_COOLDOWN);
            },
            Spell::Shield => {
                if self.combat.shield.as_ref().is_some_and(Shield::is_active) {
                    debug!("Shield already active");
                    return false;
                }
                self.combat.shield = Some(Shield::new());
                self.combat.cooldowns.magic = self.cooldown(SHIELD_COOLDOWN);
            },
        }
        info!("Cast {:?}", spell);
        true
    }

    // ------------------------------------------------------------------------
    // Progression
    // ------------------------------------------------------------------------

    /// XP from a kill. Blocked while an ability choice is open; Vampiric heals
    /// after any level-ups.
    pub fn gain_kill_xp(&mut self, amount: u32) -> Option<XpGain> {
        if self.progression.is_choice_open() {
            debug!("XP gain blocked while choosing an ability");
            return None;
        }
        let gain = self.grant_xp(amount);
        if self.progression.abilities.vampiric {
            self.heal(VAMPIRIC_HEAL);
        }
        Some(gain)
    }

    /// XP from a quest reward, never blocked.
    pub fn grant_xp(&mut self, amount: u32) -> XpGain {
        let levels = self.progression.add_xp(amount);
        for _ in 0..levels {
            self.apply_level_up_stats();
        }
        XpGain { amount, levels }
    }

    fn apply_level_up_stats(&mut self) {
        self.combat.max_health += LEVEL_HEALTH_BONUS;
        self.combat.health = (self.combat.health + LEVEL_HEALTH_BONUS).min(self.combat.max_health);
        self.combat.base_damage += LEVEL_DAMAGE_BONUS;
        self.combat.base_strong_damage += LEVEL_STRONG_DAMAGE_BONUS;
        info!(
            "Stats increased: max HP {}, damage {}, strong damage {}",
            self.combat.max_health, self.combat.base_damage, self.combat.base_strong_damage
        );
    }

    /// Resolves the pending ability choice.
    pub fn select_ability(&mut self, choice: AbilityChoice) -> Option<Unlock> {
        let unlock = self.progression.select(choice)?;
        if unlock == Unlock::OneManShow {
            let bonus = (self.combat.max_health as f32 * ONE_MAN_SHOW_HEALTH_FRACTION).floor() as i32;
            self.combat.max_health += bonus;
            self.combat.health += bonus;
        }
        Some(unlock)
    }

    /// Restores health, clamped to max. No effect when dead.
    pub fn heal(&mut self, amount: i32) {
        if self.is_dead() {
            return;
        }
        self.combat.health = (self.combat.health + amount).min(self.combat.max_health);
    }

    // ------------------------------------------------------------------------
    // Damage intake
    // ------------------------------------------------------------------------

    /// Applies an enemy hit of `base` damage. Returns `None` when the hit is
    /// ignored (dead, or an arrow during the hurt window).
    pub fn take_hit(&mut self, base: i32, source: HitSource) -> Option<HitOutcome> {
        let eligibility = self.life.eligibility();
        let immune = !eligibility.arrow_vulnerable || self.combat.hurt_remaining > 0.0;
        if self.is_dead() || (source == HitSource::Arrow && immune) {
            return None;
        }

        let damage = incoming_damage(
            base,
            &self.progression.abilities,
            self.combat.shield.as_mut(),
        );
        self.combat.health = (self.combat.health - damage).max(0);
        self.combat.time_since_damage = 0.0;
        self.combat.regen_timer = 0.0;

        let died = self.combat.health == 0;
        if died {
            self.set_life(LifeState::Dead);
            self.combat.dash_remaining = 0.0;
            self.combat.hurt_remaining = 0.0;
            self.cancel_attack();
            info!("Character defeated");
        } else {
            self.set_life(LifeState::Hurt);
            self.combat.hurt_remaining = HURT_DURATION;
            self.combat.dash_remaining = 0.0;
            if source == HitSource::Arrow {
                self.cancel_attack();
            }
        }
        self.animation.reset();
        debug!(
            "Character took {} damage from {:?}, health {}",
            damage, source, self.combat.health
        );
        Some(HitOutcome { damage, died })
    }

    // ------------------------------------------------------------------------
    // Per-frame update
    // ------------------------------------------------------------------------

    /// Advances the animation clock.
    pub fn tick_animation(&mut self, dt: f32) {
        match self.life {
            LifeState::Dead => {
                self.animation.frame_time += dt;
                if self.animation.frame_time >= DEATH_FRAME_DURATION {
                    self.animation.frame_time = 0.0;
                    if self.animation.frame < DEATH_FRAMES - 1 {
                        self.animation.frame += 1;
                    }
                }
            },
            LifeState::Hurt => self.animation.advance_looping(dt, HURT_ANIM),
            LifeState::Dashing => self.animation.advance_looping(dt, DASH_ANIM),
            LifeState::Active => match (self.combat.weapon_mode, self.combat.attack) {
                (WeaponMode::Melee, Some(attack)) if attack.is_melee() => {
                    // Swing frames follow the attack clock so the hit frame
                    // and the drawn frame always agree.
                    self.animation.frame = self.swing_frame(attack).min(MELEE_FRAMES - 1);
                },
                (WeaponMode::Ranged, Some(AttackType::Ranged)) => {
                    self.animation.advance_looping(dt, RANGED_ANIM);
                },
                _ if self.transform.is_moving => self.animation.advance_looping(dt, RUN_ANIM),
                _ => self.animation.advance_looping(dt, IDLE_ANIM),
            },
        }
    }

    /// Shield lifetime and expiry.
    pub fn tick_shield(&mut self, dt: f32) {
        if let Some(shield) = &mut self.combat.shield {
            shield.tick(dt);
            if !shield.is_active() {
                debug!(
                    "Shield ended with {} hits left",
                    shield.hits_remaining()
                );
                self.combat.shield = None;
            }
        }
    }

    fn swing_frame(&self, attack: AttackType) -> u32 {
        let duration = attack.duration();
        let elapsed = (duration - self.combat.attack_timer).max(0.0);
        (elapsed / duration * MELEE_FRAMES as f32).floor() as u32
    }

    /// Regen, cooldowns, attack timing, dash, hurt and movement.
    ///
    /// Returns the melee strike when a swing reaches its hit frame this frame.
    pub fn update<C>(&mut self, dt: f32, intent: MoveIntent, collision: &C) -> Option<MeleeStrike>
    where
        C: CollisionQuery + ?Sized,
    {
        self.tick_regen(dt);
        self.combat.cooldowns.tick(dt);
        let strike = self.tick_attack(dt);
        self.tick_dash(dt);
        self.tick_hurt(dt);
        self.apply_movement(dt, intent.sanitized(), collision);

        debug_assert!((0..=self.combat.max_health).contains(&self.combat.health));
        strike
    }

    fn tick_regen(&mut self, dt: f32) {
        if !self.life.eligibility().regenerate || self.combat.health >= self.combat.max_health {
            return;
        }
        self.combat.time_since_damage += dt;
        if self.combat.time_since_damage >= REGEN_DELAY {
            self.combat.regen_timer += dt;
            if self.combat.regen_timer >= REGEN_INTERVAL {
                self.combat.regen_timer = 0.0;
                self.combat.health = (self.combat.health + 1).min(self.combat.max_health);
                debug!("Regenerated to {} HP", self.combat.health);
            }
        }
    }

    fn tick_attack(&mut self, dt: f32) -> Option<MeleeStrike> {
        let attack = self.combat.attack?;
        self.combat.attack_timer -= dt;

        let mut strike = None;
        if attack.is_melee()
            && self.combat.weapon_mode == WeaponMode::Melee
            && !self.combat.melee_hit_applied
            && self.swing_frame(attack) >= MELEE_HIT_FRAME
        {
            self.combat.melee_hit_applied = true;
            let (base, kind) = match attack {
                AttackType::Strong => (self.combat.base_strong_damage, AttackKind::Strong),
                _ => (self.combat.base_damage, AttackKind::Basic),
            };
            strike = Some(MeleeStrike {
                origin: self.center(),
                damage: self.outgoing_damage(base, kind),
                kind: attack,
            });
        }

        if self.combat.attack_timer <= 0.0 {
            self.cancel_attack();
            self.combat.melee_hit_applied = false;
            self.animation.reset();
        }
        strike
    }

    fn tick_dash(&mut self, dt: f32) {
        self.combat.cooldowns.dash = (self.combat.cooldowns.dash - dt).max(0.0);
        if self.life == LifeState::Dashing {
            self.combat.dash_remaining -= dt;
            if self.combat.dash_remaining <= 0.0 {
                self.combat.dash_remaining = 0.0;
                let next = if self.combat.hurt_remaining > 0.0 {
                    LifeState::Hurt
                } else {
                    LifeState::Active
                };
                self.set_life(next);
                self.animation.reset();
            }
        }
    }

    /// The hurt window keeps counting through a dash.
    fn tick_hurt(&mut self, dt: f32) {
        if self.combat.hurt_remaining <= 0.0 {
            return;
        }
        self.combat.hurt_remaining -= dt;
        if self.combat.hurt_remaining <= 0.0 {
            self.combat.hurt_remaining = 0.0;
            if self.life == LifeState::Hurt {
                self.set_life(LifeState::Active);
                self.animation.reset();
            }
        }
    }

    fn apply_movement<C>(&mut self, dt: f32, intent: MoveIntent, collision: &C)
    where
        C: CollisionQuery + ?Sized,
    {
        let size = self.transform.size;
        match self.life {
            LifeState::Dead => {
                self.transform.is_moving = false;
            },
            LifeState::Dashing => {
                let facing_right = self.transform.facing_right;
                let delta = self.transform.dash_direction * DASH_SPEED * dt;
                self.transform.position =
                    slide_move(collision, self.transform.position, delta, |p| {
                        character_probe(p, size, facing_right)
                    });
                self.transform.is_moving = false;
            },
            LifeState::Active | LifeState::Hurt => {
                let (mut dx, mut dy) = (intent.x, intent.y);
                if dx > 0.0 {
                    self.transform.facing_right = true;
                } else if dx < 0.0 {
                    self.transform.facing_right = false;
                }

                let moving = intent.is_moving();
                if moving != self.transform.is_moving && self.combat.attack.is_none() {
                    self.animation.reset();
                }
                self.transform.is_moving = moving;
                if !moving {
                    return;
                }

                if dx != 0.0 && dy != 0.0 {
                    dx *= DIAGONAL_FACTOR;
                    dy *= DIAGONAL_FACTOR;
                }
                let direction = Vec2::new(dx, dy);
                self.transform.last_move_direction = direction;
                if self.combat.weapon_mode == WeaponMode::Ranged {
                    self.transform.shoot_direction = direction.normalize_or_zero();
                }

                let facing_right = self.transform.facing_right;
                let delta = direction * WALK_SPEED * dt;
                self.transform.position =
                    slide_move(collision, self.transform.position, delta, |p| {
                        character_probe(p, size, facing_right)
                    });
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::MockCollision;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn open() -> MockCollision {
        MockCollision::new()
    }

    fn run(character: &mut Character, seconds: f32, intent: MoveIntent) -> Vec<MeleeStrike> {
        let collision = open();
        let mut strikes = Vec::new();
        let steps = (seconds / DT).round() as usize;
        for _ in 0..steps {
            character.tick_animation(DT);
            strikes.extend(character.update(DT, intent, &collision));
        }
        strikes
    }

    #[test]
    fn test_eligibility_table() {
        assert!(LifeState::Hurt.eligibility().walk);
        assert!(LifeState::Hurt.eligibility().dash);
        assert!(!LifeState::Hurt.eligibility().arrow_vulnerable);
        assert!(!LifeState::Dashing.eligibility().dash);
        let dead = LifeState::Dead.eligibility();
        assert!(!dead.walk && !dead.attack && !dead.dash && !dead.swap);
    }

    #[test]
    fn test_walk_and_diagonal() {
        let mut c = Character::new(Vec2::ZERO);
        run(&mut c, 1.0, MoveIntent::new(1.0, 0.0));
        assert!((c.position().x - 300.0).abs() < 0.5);
        assert!(c.transform.facing_right);

        let mut d = Character::new(Vec2::ZERO);
        run(&mut d, 1.0, MoveIntent::new(-1.0, 1.0));
        assert!((d.position().x + 212.1).abs() < 0.5);
        assert!((d.position().y - 212.1).abs() < 0.5);
        assert!(!d.transform.facing_right);
    }

    #[test]
    fn test_wall_blocks_movement() {
        let mut collision = MockCollision::new();
        collision.block(Rect::new(100.0, -1000.0, 50.0, 2000.0));
        let mut c = Character::new(Vec2::ZERO);
        for _ in 0..60 {
            c.update(DT, MoveIntent::new(1.0, 0.0), &collision);
        }
        assert!(c.probe().right() <= 100.0);
    }

    #[test]
    fn test_ranged_movement_sets_aim() {
        let mut c = Character::new(Vec2::ZERO);
        c.swap_weapon();
        run(&mut c, DT, MoveIntent::new(0.0, -1.0));
        assert_eq!(c.transform.shoot_direction, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_dash_moves_fixed_distance() {
        let mut c = Character::new(Vec2::ZERO);
        assert!(c.dash(MoveIntent::new(1.0, 0.0)));
        assert_eq!(c.life_state(), LifeState::Dashing);
        assert!(!c.dash(MoveIntent::new(1.0, 0.0)));

        run(&mut c, 0.5, MoveIntent::NONE);
        assert_eq!(c.life_state(), LifeState::Active);
        assert!((c.position().x - 150.0).abs() < 10.0);
        assert_eq!(c.position().y, 0.0);
    }

    #[test]
    fn test_dash_fallbacks() {
        let mut c = Character::new(Vec2::ZERO);
        c.transform.facing_right = false;
        c.dash(MoveIntent::NONE);
        assert_eq!(c.transform.dash_direction, Vec2::NEG_X);

        let mut m = Character::new(Vec2::ZERO);
        run(&mut m, DT, MoveIntent::new(0.0, 1.0));
        m.dash(MoveIntent::NONE);
        assert_eq!(m.transform.dash_direction, Vec2::Y);
    }

    #[test]
    fn test_dash_on_cooldown_is_noop() {
        let mut c = Character::new(Vec2::new(10.0, 10.0));
        c.dash(MoveIntent::new(1.0, 0.0));
        run(&mut c, 0.5, MoveIntent::NONE);
        let before = c.clone();
        assert!(!c.dash(MoveIntent::new(1.0, 0.0)));
        assert_eq!(c, before);
    }

    #[test]
    fn test_basic_attack_hits_once_at_frame_three() {
        let mut c = Character::new(Vec2::ZERO);
        assert!(c.basic_attack());
        assert!(!c.basic_attack());

        let collision = open();
        let mut hit_time = None;
        let mut hits = 0;
        for step in 1..=30 {
            c.tick_animation(DT);
            if let Some(strike) = c.update(DT, MoveIntent::NONE, &collision) {
                hits += 1;
                hit_time = Some(step as f32 * DT);
                assert_eq!(strike.damage, STARTING_BASE_DAMAGE);
                assert_eq!(strike.kind, AttackType::Basic);
            }
        }
        assert_eq!(hits, 1);
        let t = hit_time.expect("swing landed");
        assert!(t >= 0.15 - 1e-4 && t < 0.15 + DT + 1e-4);
        assert_eq!(c.combat.attack, None);
    }

    #[test]
    fn test_large_step_still_hits_once() {
        let mut c = Character::new(Vec2::ZERO);
        c.strong_attack();
        let collision = open();
        let first = c.update(0.2, MoveIntent::NONE, &collision);
        let second = c.update(0.2, MoveIntent::NONE, &collision);
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(c.combat.attack, None);
    }

    #[test]
    fn test_attacks_respect_weapon_mode() {
        let mut c = Character::new(Vec2::ZERO);
        assert!(!c.ranged_shot());
        c.swap_weapon();
        assert!(!c.basic_attack());
        assert!(!c.strong_attack());
        assert!(c.ranged_shot());
        assert_eq!(c.animation_kind(), CharacterAnimation::RangedAttack);
    }

    #[test]
    fn test_combined_attack() {
        let mut c = Character::new(Vec2::ZERO);
        assert_eq!(c.combined_attack(), Some(AttackType::Basic));
        assert!(c.combat.cooldowns.combined > 0.0);
        assert_eq!(c.combined_attack(), None);
    }

    #[test]
    fn test_swift_assassin_shortens_cooldowns() {
        let mut c = Character::new(Vec2::ZERO);
        c.progression.abilities.swift_assassin = true;
        c.strong_attack();
        assert!((c.combat.cooldowns.strong - 0.48).abs() < 1e-5);
    }

    #[test]
    fn test_arrow_hit_then_hurt_immunity() {
        let mut c = Character::new(Vec2::ZERO);
        c.basic_attack();
        let hit = c.take_hit(15, HitSource::Arrow).expect("hit lands");
        assert_eq!(hit, HitOutcome { damage: 15, died: false });
        assert_eq!(c.life_state(), LifeState::Hurt);
        assert_eq!(c.combat.attack, None);
        assert!(c.take_hit(15, HitSource::Arrow).is_none());
        assert!(c.take_hit(7, HitSource::Melee).is_some());
        assert_eq!(c.health(), 78);

        run(&mut c, 0.5, MoveIntent::NONE);
        assert_eq!(c.life_state(), LifeState::Active);
    }

    #[test]
    fn test_arrow_immunity_survives_dash() {
        let mut c = Character::new(Vec2::ZERO);
        assert!(c.take_hit(15, HitSource::Arrow).is_some());
        assert!(c.dash(MoveIntent::new(1.0, 0.0)));
        assert_eq!(c.life_state(), LifeState::Dashing);
        assert!(c.take_hit(15, HitSource::Arrow).is_none());

        // Dash (0.3 s) ends inside the 0.4 s hurt window.
        run(&mut c, 0.35, MoveIntent::NONE);
        assert_eq!(c.life_state(), LifeState::Hurt);
        assert!(c.take_hit(15, HitSource::Arrow).is_none());

        run(&mut c, 0.1, MoveIntent::NONE);
        assert_eq!(c.life_state(), LifeState::Active);
        assert!(c.take_hit(15, HitSource::Arrow).is_some());
        assert_eq!(c.health(), 70);
    }

    #[test]
    fn test_death_is_terminal() {
        let mut c = Character::new(Vec2::ZERO);
        let hit = c.take_hit(500, HitSource::Melee).expect("hit lands");
        assert!(hit.died);
        assert_eq!(c.health(), 0);
        assert!(c.is_dead());
        assert!(!c.basic_attack());
        assert!(!c.dash(MoveIntent::new(1.0, 0.0)));
        assert!(!c.swap_weapon());
        assert!(c.take_hit(5, HitSource::Melee).is_none());

        run(&mut c, 3.0, MoveIntent::new(1.0, 0.0));
        assert_eq!(c.position(), Vec2::ZERO);
        assert_eq!(c.animation.frame, DEATH_FRAMES - 1);
        assert_eq!(c.health(), 0);
    }

    #[test]
    fn test_shield_absorbs_and_still_hurts() {
        let mut c = Character::new(Vec2::ZERO);
        c.progression.spells.shield = true;
        assert!(c.cast_spell(Spell::Shield));
        let hit = c.take_hit(20, HitSource::Melee).expect("hit lands");
        assert_eq!(hit.damage, 0);
        assert_eq!(c.health(), STARTING_HEALTH);
        assert_eq!(c.shield().map(Shield::hits_remaining), Some(4));
    }

    #[test]
    fn test_spells_need_unlock_and_cooldown() {
        let mut c = Character::new(Vec2::ZERO);
        assert!(!c.cast_spell(Spell::FireSplitters));
        c.progression.spells.fire_splitters = true;
        assert!(c.cast_spell(Spell::FireSplitters));
        assert!(!c.cast_spell(Spell::FireSplitters));
        assert!((c.combat.cooldowns.magic - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_regen_after_delay() {
        let mut c = Character::new(Vec2::ZERO);
        c.take_hit(10, HitSource::Melee);
        assert_eq!(c.health(), 90);
        run(&mut c, 4.9, MoveIntent::NONE);
        assert_eq!(c.health(), 90);
        run(&mut c, 0.2, MoveIntent::NONE);
        assert_eq!(c.health(), 91);
        run(&mut c, 2.0, MoveIntent::NONE);
        assert_eq!(c.health(), 92);
    }

    #[test]
    fn test_hit_during_regen_restarts_delay() {
        let mut c = Character::new(Vec2::ZERO);
        c.take_hit(10, HitSource::Melee);
        run(&mut c, 5.1, MoveIntent::NONE);
        assert_eq!(c.health(), 91);

        // Halfway to the next tick.
        run(&mut c, 1.0, MoveIntent::NONE);
        c.take_hit(10, HitSource::Melee);
        assert_eq!(c.health(), 81);

        run(&mut c, 4.9, MoveIntent::NONE);
        assert_eq!(c.health(), 81);
        run(&mut c, 0.2, MoveIntent::NONE);
        assert_eq!(c.health(), 82);
    }

    #[test]
    fn test_level_up_stats_and_one_man_show() {
        let mut c = Character::new(Vec2::ZERO);
        let gain = c.grant_xp(1000);
        assert_eq!(gain.levels, 2);
        assert_eq!(c.max_health(), 120);
        assert_eq!(c.health(), 120);
        assert_eq!(c.combat.base_damage, 7);
        assert_eq!(c.combat.base_strong_damage, 19);

        assert!(c.gain_kill_xp(35).is_none());
        assert_eq!(c.select_ability(AbilityChoice::B), Some(Unlock::OneManShow));
        assert_eq!(c.max_health(), 138);
        assert_eq!(c.health(), 138);
    }

    #[test]
    fn test_vampiric_heals_on_kill() {
        let mut c = Character::new(Vec2::ZERO);
        c.progression.abilities.vampiric = true;
        c.take_hit(20, HitSource::Melee);
        c.gain_kill_xp(15);
        assert_eq!(c.health(), 85);
    }

    #[test]
    fn test_invalid_aim_uses_facing() {
        let mut c = Character::new(Vec2::ZERO);
        c.transform.facing_right = false;
        c.transform.shoot_direction = Vec2::ZERO;
        assert_eq!(c.aim_direction(), Vec2::NEG_X);
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_range(
            ops in proptest::collection::vec((0u8..4, 0i32..60, 0.0f32..0.5), 1..80)
        ) {
            let collision = MockCollision::new();
            let mut c = Character::new(Vec2::ZERO);
            for (op, amount, dt) in ops {
                match op {
                    0 => { c.take_hit(amount, HitSource::Arrow); },
                    1 => { c.take_hit(amount, HitSource::Melee); },
                    2 => { c.gain_kill_xp(amount as u32 * 20); },
                    _ => { c.heal(amount); },
                }
                c.tick_animation(dt);
                c.update(dt, MoveIntent::new(1.0, 1.0), &collision);
                prop_assert!(c.health() >= 0);
                prop_assert!(c.health() <= c.max_health());
            }
        }
    }
}
