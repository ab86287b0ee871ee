//! Enemy entities and their data-driven behavior profiles.
//!
//! Every enemy is the same [`Enemy`] struct; what differs between kinds lives
//! in a static [`BehaviorProfile`] (sizes, speeds, ranges, frame tables) and a
//! [`Behavior`] variant carrying the data specific to how the kind fights.
//! The per-frame decision logic is in [`crate::enemy_ai`].

use crate::combat_math::AttackKind;
use crate::map::SpawnPoint;
use serde::{Deserialize, Serialize};
use tilequest_common::{EntityId, Rect, Vec2};
use tracing::{debug, info};

// ============================================================================
// Enemy kinds
// ============================================================================

/// Kind of enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Orc archer with long-range volleys
    Archer,
    /// Fast melee orc
    OrcBarbarian,
    /// Shield-bearing melee knight
    YellowKnight,
    /// Mid-range archer
    YellowArcher,
    /// Boss with a cone slam
    BlueGolem,
}

impl EnemyKind {
    /// All kinds.
    pub const ALL: [Self; 5] = [
        Self::Archer,
        Self::OrcBarbarian,
        Self::YellowKnight,
        Self::YellowArcher,
        Self::BlueGolem,
    ];

    /// Static tuning for this kind.
    #[must_use]
    pub fn profile(self) -> &'static BehaviorProfile {
        match self {
            Self::Archer => &ARCHER,
            Self::OrcBarbarian => &ORC_BARBARIAN,
            Self::YellowKnight => &YELLOW_KNIGHT,
            Self::YellowArcher => &YELLOW_ARCHER,
            Self::BlueGolem => &BLUE_GOLEM,
        }
    }

    /// XP granted for a kill.
    #[must_use]
    pub fn xp_reward(self) -> u32 {
        self.profile().xp_reward
    }

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Archer => "Archer",
            Self::OrcBarbarian => "Orc Barbarian",
            Self::YellowKnight => "Yellow Knight",
            Self::YellowArcher => "Yellow Archer",
            Self::BlueGolem => "Blue Golem",
        }
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Frame count and seconds per frame of one animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTable {
    /// Number of frames
    pub frames: u32,
    /// Seconds per frame
    pub duration: f32,
}

impl FrameTable {
    /// Creates a table.
    #[must_use]
    pub const fn new(frames: u32, duration: f32) -> Self {
        Self { frames, duration }
    }

    /// Length of one full play-through.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.frames as f32 * self.duration
    }

    /// Index of the last frame.
    #[must_use]
    pub fn last_frame(&self) -> u32 {
        self.frames.saturating_sub(1)
    }
}

/// How a kind fights. Dispatch in the AI matches on this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    /// Stands at range and looses one arrow late in a long draw animation.
    Volley {
        /// First frame on which the arrow can be released
        first_release_frame: u32,
        /// Last frame on which the arrow can be released
        last_release_frame: u32,
    },
    /// Charges in and lands its hit halfway through the swing.
    Charge,
    /// Always blocks while advancing; the swing lands when it completes.
    Guard {
        /// Reach of the swing when it lands
        hit_range: f32,
        /// Blocking stance animation
        block: FrameTable,
        /// Fraction of player damage let through while blocking
        block_factor: f32,
    },
    /// Keeps to a preferred distance and fires mid-animation on its own timer.
    Skirmish {
        /// Frame on which the arrow is released
        release_frame: u32,
        /// Seconds between shots
        shoot_cooldown: f32,
        /// Approaches while farther than this fraction of its attack range
        approach_fraction: f32,
    },
    /// Boss cone slam with hurt interrupts at health thresholds.
    Boss {
        /// Attack frame on which the slam lands
        hit_frame: u32,
        /// Slam reach
        cone_length: f32,
        /// Full cone angle in radians
        cone_angle: f32,
        /// Earthquake shake (duration, intensity)
        quake: (f32, f32),
        /// Health fractions that interrupt with a hurt animation, each once
        hurt_thresholds: [f32; 3],
        /// Hurt animation
        hurt: FrameTable,
        /// Death animation
        death: FrameTable,
    },
}

/// Static tuning shared by every enemy of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    /// Sprite size
    pub size: Vec2,
    /// Movement speed in px/s
    pub speed: f32,
    /// Starting health
    pub max_health: i32,
    /// Damage dealt to the player by melee or area attacks
    pub attack_damage: i32,
    /// Distance at which the attack starts
    pub attack_range: f32,
    /// Distance at which the player is noticed
    pub detection_range: f32,
    /// Seconds between attacks
    pub attack_cooldown: f32,
    /// Idle animation
    pub idle: FrameTable,
    /// Moving (run or walk) animation
    pub movement: FrameTable,
    /// Attack or shoot animation
    pub attack: FrameTable,
    /// XP for a kill
    pub xp_reward: u32,
    /// Fighting style
    pub behavior: Behavior,
}

impl BehaviorProfile {
    /// Full attack animation length.
    #[must_use]
    pub fn attack_duration(&self) -> f32 {
        self.attack.total()
    }

    /// Death animation: boss kinds carry their own, others play the last
    /// four frames of the shared death sheet.
    #[must_use]
    pub fn death(&self) -> DeathAnimation {
        match self.behavior {
            Behavior::Boss { death, .. } => DeathAnimation {
                first_frame: 0,
                table: death,
            },
            _ => SHARED_DEATH,
        }
    }
}

/// Death animation frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathAnimation {
    /// Starting frame
    pub first_frame: u32,
    /// Frame table; the last frame is `table.frames - 1`
    pub table: FrameTable,
}

impl DeathAnimation {
    /// Seconds from death to removal.
    #[must_use]
    pub fn duration(&self) -> f32 {
        (self.table.frames - self.first_frame) as f32 * self.table.duration
    }
}

const SHARED_DEATH: DeathAnimation = DeathAnimation {
    first_frame: 4,
    table: FrameTable::new(8, 0.28),
};

/// XP for kinds without a specific reward.
pub const FALLBACK_XP_REWARD: u32 = crate::progression::DEFAULT_XP_REWARD;

static ARCHER: BehaviorProfile = BehaviorProfile {
    size: Vec2::new(151.0, 84.0),
    speed: 100.0,
    max_health: 5,
    attack_damage: 0,
    attack_range: 500.0,
    detection_range: 600.0,
    attack_cooldown: 2.0,
    idle: FrameTable::new(2, 0.3),
    movement: FrameTable::new(6, 0.15),
    attack: FrameTable::new(18, 0.05),
    xp_reward: FALLBACK_XP_REWARD,
    behavior: Behavior::Volley {
        first_release_frame: 10,
        last_release_frame: 11,
    },
};

static ORC_BARBARIAN: BehaviorProfile = BehaviorProfile {
    size: Vec2::new(80.0, 118.0),
    speed: 150.0,
    max_health: 30,
    attack_damage: 7,
    attack_range: 70.0,
    detection_range: 400.0,
    attack_cooldown: 1.2,
    idle: FrameTable::new(2, 0.3),
    movement: FrameTable::new(5, 0.15),
    attack: FrameTable::new(12, 0.1),
    xp_reward: 35,
    behavior: Behavior::Charge,
};

static YELLOW_KNIGHT: BehaviorProfile = BehaviorProfile {
    size: Vec2::new(140.0, 140.0),
    speed: 80.0,
    max_health: 40,
    attack_damage: 5,
    attack_range: 55.0,
    detection_range: 300.0,
    attack_cooldown: 1.5,
    idle: FrameTable::new(8, 0.15),
    movement: FrameTable::new(6, 0.15),
    attack: FrameTable::new(4, 0.2),
    xp_reward: 25,
    behavior: Behavior::Guard {
        hit_range: 80.0,
        block: FrameTable::new(6, 0.15),
        block_factor: 0.5,
    },
};

static YELLOW_ARCHER: BehaviorProfile = BehaviorProfile {
    size: Vec2::new(140.0, 140.0),
    speed: 90.0,
    max_health: 10,
    attack_damage: 10,
    attack_range: 400.0,
    detection_range: 350.0,
    attack_cooldown: 2.0,
    idle: FrameTable::new(6, 0.15),
    movement: FrameTable::new(4, 0.15),
    attack: FrameTable::new(8, 0.1),
    xp_reward: 20,
    behavior: Behavior::Skirmish {
        release_frame: 4,
        shoot_cooldown: 2.0,
        approach_fraction: 0.8,
    },
};

static BLUE_GOLEM: BehaviorProfile = BehaviorProfile {
    size: Vec2::new(176.0, 126.0),
    speed: 100.0,
    max_health: 250,
    attack_damage: 20,
    attack_range: 100.0,
    detection_range: 500.0,
    attack_cooldown: 2.0,
    idle: FrameTable::new(8, 0.15),
    movement: FrameTable::new(10, 0.15),
    attack: FrameTable::new(11, 0.15),
    xp_reward: 100,
    behavior: Behavior::Boss {
        hit_frame: 8,
        cone_length: 200.0,
        cone_angle: std::f32::consts::FRAC_PI_3,
        quake: (0.3, 8.0),
        hurt_thresholds: [0.75, 0.5, 0.25],
        hurt: FrameTable::new(4, 0.1),
        death: FrameTable::new(12, 0.2),
    },
};

// ============================================================================
// Enemy
// ============================================================================

/// Animation and behavior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyState {
    /// Standing
    #[default]
    Idle,
    /// Approaching (run animation)
    Moving,
    /// Approaching (boss walk animation)
    Walking,
    /// Melee swing or bow draw
    Attacking,
    /// Skirmisher shot
    Shooting,
    /// Knight stance while in reach but on cooldown
    Blocking,
    /// Boss hit reaction
    Hurt,
    /// Death animation; removed when it finishes
    Dying,
}

/// How a threshold crossing is handled when several qualify at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThresholdMode {
    /// Only the first unused threshold fires and the frame restarts
    First,
    /// Every qualifying threshold is consumed
    All,
}

/// Outcome of the player damaging an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyHit {
    /// Damage actually dealt
    pub damage: i32,
    /// Whether a block reduced it
    pub blocked: bool,
    /// Whether a hurt interrupt fired
    pub hurt: bool,
    /// Whether this hit killed the enemy
    pub died: bool,
}

/// A live enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// Stable identity
    pub id: EntityId,
    /// Kind
    pub kind: EnemyKind,
    /// Top-left position
    pub position: Vec2,
    /// Facing right
    pub facing_right: bool,
    /// Health, 0 once dying
    pub health: i32,
    /// Max health
    pub max_health: i32,
    /// Behavior state
    pub state: EnemyState,
    /// Animation frame
    pub frame: u32,
    /// Seconds into the frame
    pub frame_time: f32,
    /// Seconds left in the attack
    pub attack_timer: f32,
    /// Seconds until the next attack
    pub attack_cooldown: f32,
    /// Seconds left in the shoot animation (skirmishers)
    pub shoot_timer: f32,
    /// Seconds until the next shot (skirmishers)
    pub shoot_cooldown: f32,
    /// Current attack already hit the player
    pub has_dealt_damage: bool,
    /// Current attack already released its arrow
    pub arrow_created: bool,
    /// Blocking stance (knights)
    pub is_blocking: bool,
    /// Seconds left in the hurt interrupt (boss)
    pub hurt_timer: f32,
    /// Hurt thresholds already consumed
    pub thresholds_used: Vec<f32>,
    /// Seconds left in the death animation
    pub death_timer: f32,
}

impl Enemy {
    /// Creates an enemy with its top-left at `position`.
    #[must_use]
    pub fn new(kind: EnemyKind, position: Vec2) -> Self {
        let profile = kind.profile();
        let shoot_cooldown = match profile.behavior {
            Behavior::Skirmish { shoot_cooldown, .. } => shoot_cooldown,
            _ => 0.0,
        };
        Self {
            id: EntityId::new(),
            kind,
            position,
            facing_right: true,
            health: profile.max_health,
            max_health: profile.max_health,
            state: EnemyState::Idle,
            frame: 0,
            frame_time: 0.0,
            attack_timer: 0.0,
            attack_cooldown: 0.0,
            shoot_timer: 0.0,
            shoot_cooldown,
            has_dealt_damage: false,
            arrow_created: false,
            is_blocking: matches!(profile.behavior, Behavior::Guard { .. }),
            hurt_timer: 0.0,
            thresholds_used: Vec::new(),
            death_timer: 0.0,
        }
    }

    /// Creates an enemy standing on a map spawn point (bottom edge at the
    /// point's y).
    #[must_use]
    pub fn spawn_at(kind: EnemyKind, spawn: &SpawnPoint) -> Self {
        let height = kind.profile().size.y;
        Self::new(
            kind,
            Vec2::new(spawn.position.x, spawn.position.y - height),
        )
    }

    /// Static tuning for this enemy's kind.
    #[must_use]
    pub fn profile(&self) -> &'static BehaviorProfile {
        self.kind.profile()
    }

    /// Sprite size.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.profile().size
    }

    /// Full bounds.
    #[must_use]
    pub fn rect(&self) -> Rect {
        let size = self.size();
        Rect::new(self.position.x, self.position.y, size.x, size.y)
    }

    /// Sprite centre.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    /// Whether the enemy can be hit and acts.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0 && self.state != EnemyState::Dying
    }

    /// Whether the death animation is playing.
    #[must_use]
    pub fn is_dying(&self) -> bool {
        self.state == EnemyState::Dying
    }

    /// Whether the boss hurt interrupt is running.
    #[must_use]
    pub fn is_hurt(&self) -> bool {
        self.hurt_timer > 0.0
    }

    /// Applies player damage of `amount` from an attack of `kind`.
    ///
    /// Blocking knights halve melee and arrow damage (floored). Boss hurt
    /// thresholds are checked after the health change. Returns `None` when the
    /// enemy is already dead.
    pub fn take_damage(&mut self, amount: i32, kind: AttackKind) -> Option<EnemyHit> {
        if !self.is_alive() {
            return None;
        }

        let profile = self.profile();
        let mut damage = amount;
        let mut blocked = false;
        if let Behavior::Guard { block_factor, .. } = profile.behavior {
            if self.is_blocking && kind != AttackKind::Magic {
                damage = (amount as f32 * block_factor).floor() as i32;
                blocked = true;
                debug!("{} {} blocked: {} -> {}", self.kind.name(), self.id, amount, damage);
            }
        }

        self.health = (self.health - damage).max(0);
        let mode = if kind == AttackKind::Magic {
            ThresholdMode::All
        } else {
            ThresholdMode::First
        };
        let hurt = self.check_hurt_thresholds(mode);

        let died = self.health == 0;
        if died {
            self.begin_dying();
        }
        debug!(
            "{} {} took {} damage ({:?}), health {}",
            self.kind.name(),
            self.id,
            damage,
            kind,
            self.health
        );
        Some(EnemyHit {
            damage,
            blocked,
            hurt,
            died,
        })
    }

    fn check_hurt_thresholds(&mut self, mode: ThresholdMode) -> bool {
        let Behavior::Boss {
            hurt_thresholds,
            hurt,
            ..
        } = self.profile().behavior
        else {
            return false;
        };

        let fraction = self.health as f32 / self.max_health as f32;
        let mut fired = false;
        for threshold in hurt_thresholds {
            if fraction <= threshold && !self.thresholds_used.contains(&threshold) {
                self.thresholds_used.push(threshold);
                self.hurt_timer = hurt.total();
                fired = true;
                debug!("{} hurt at {:.0}% health", self.kind.name(), threshold * 100.0);
                if mode == ThresholdMode::First {
                    self.frame = 0;
                    self.frame_time = 0.0;
                    break;
                }
            }
        }
        fired
    }

    fn begin_dying(&mut self) {
        let death = self.profile().death();
        self.state = EnemyState::Dying;
        self.death_timer = death.duration();
        self.frame = death.first_frame;
        self.frame_time = 0.0;
        self.attack_timer = 0.0;
        self.hurt_timer = 0.0;
        info!("{} {} defeated", self.kind.name(), self.id);
    }

    /// Advances the death animation. Returns true once the enemy should be
    /// removed: the last frame has been shown for a full frame, or the
    /// death timer ran out.
    pub fn tick_death(&mut self, dt: f32) -> bool {
        debug_assert!(self.is_dying());
        let table = self.profile().death().table;
        self.death_timer -= dt;
        self.frame_time += dt;
        if self.frame_time >= table.duration {
            self.frame_time = 0.0;
            if self.frame < table.last_frame() {
                self.frame += 1;
            } else {
                return true;
            }
        }
        self.death_timer <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn ticks_until_removed(enemy: &mut Enemy) -> usize {
        let mut ticks = 0;
        while !enemy.tick_death(DT) {
            ticks += 1;
            assert!(ticks < 10_000);
        }
        ticks + 1
    }

    #[test]
    fn test_spawn_anchors_bottom() {
        let spawn = SpawnPoint {
            position: Vec2::new(500.0, 300.0),
            width: 32.0,
            height: 32.0,
        };
        let orc = Enemy::spawn_at(EnemyKind::OrcBarbarian, &spawn);
        assert_eq!(orc.position, Vec2::new(500.0, 182.0));
        assert_eq!(orc.health, 30);
        assert!(!orc.is_blocking);
        assert!(Enemy::new(EnemyKind::YellowKnight, Vec2::ZERO).is_blocking);
        assert_eq!(Enemy::new(EnemyKind::YellowArcher, Vec2::ZERO).shoot_cooldown, 2.0);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Enemy::new(EnemyKind::Archer, Vec2::ZERO);
        let b = Enemy::new(EnemyKind::Archer, Vec2::ZERO);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_xp_rewards() {
        assert_eq!(EnemyKind::Archer.xp_reward(), 20);
        assert_eq!(EnemyKind::OrcBarbarian.xp_reward(), 35);
        assert_eq!(EnemyKind::YellowKnight.xp_reward(), 25);
        assert_eq!(EnemyKind::YellowArcher.xp_reward(), 20);
        assert_eq!(EnemyKind::BlueGolem.xp_reward(), 100);
    }

    #[test]
    fn test_knight_blocks_half() {
        let mut knight = Enemy::new(EnemyKind::YellowKnight, Vec2::ZERO);
        let hit = knight.take_damage(15, AttackKind::Ranged).expect("alive");
        assert_eq!(hit.damage, 7);
        assert!(hit.blocked);
        assert_eq!(knight.health, 33);

        let magic = knight.take_damage(10, AttackKind::Magic).expect("alive");
        assert!(!magic.blocked);
        assert_eq!(knight.health, 23);
    }

    #[test]
    fn test_death_happens_once() {
        let mut archer = Enemy::new(EnemyKind::Archer, Vec2::ZERO);
        let hit = archer.take_damage(5, AttackKind::Basic).expect("alive");
        assert!(hit.died);
        assert_eq!(archer.state, EnemyState::Dying);
        assert_eq!(archer.frame, 4);
        assert!(!archer.is_alive());
        assert!(archer.take_damage(5, AttackKind::Basic).is_none());
    }

    #[test]
    fn test_regular_death_takes_full_animation() {
        let mut orc = Enemy::new(EnemyKind::OrcBarbarian, Vec2::ZERO);
        orc.take_damage(100, AttackKind::Strong);
        assert_eq!(orc.health, 0);
        let ticks = ticks_until_removed(&mut orc);
        let seconds = ticks as f32 * DT;
        assert!(seconds >= 1.12 - 2.0 * DT && seconds <= 1.12 + 2.0 * DT);
    }

    #[test]
    fn test_golem_death_takes_two_point_four_seconds() {
        let mut golem = Enemy::new(EnemyKind::BlueGolem, Vec2::ZERO);
        golem.take_damage(1000, AttackKind::Strong);
        assert_eq!(golem.frame, 0);
        let ticks = ticks_until_removed(&mut golem);
        let seconds = ticks as f32 * DT;
        assert!(seconds >= 2.4 - 2.0 * DT && seconds <= 2.4 + 2.0 * DT);
    }

    #[test]
    fn test_golem_thresholds_fire_once_each() {
        let mut golem = Enemy::new(EnemyKind::BlueGolem, Vec2::ZERO);
        let first = golem.take_damage(63, AttackKind::Basic).expect("alive");
        assert!(first.hurt);
        assert!((golem.hurt_timer - 0.4).abs() < 1e-6);
        assert_eq!(golem.thresholds_used, vec![0.75]);

        golem.hurt_timer = 0.0;
        let second = golem.take_damage(1, AttackKind::Basic).expect("alive");
        assert!(!second.hurt);

        // One big arrow crossing two thresholds only consumes the first.
        golem.take_damage(100, AttackKind::Ranged);
        assert_eq!(golem.thresholds_used, vec![0.75, 0.5]);
    }

    #[test]
    fn test_magic_consumes_all_crossed_thresholds() {
        let mut golem = Enemy::new(EnemyKind::BlueGolem, Vec2::ZERO);
        golem.take_damage(200, AttackKind::Magic);
        assert_eq!(golem.thresholds_used, vec![0.75, 0.5, 0.25]);
    }

    #[test]
    fn test_profile_tables() {
        assert!((EnemyKind::Archer.profile().attack_duration() - 0.9).abs() < 1e-5);
        assert!((EnemyKind::YellowKnight.profile().attack_duration() - 0.8).abs() < 1e-5);
        assert!((EnemyKind::BlueGolem.profile().attack_duration() - 1.65).abs() < 1e-5);
        assert!((EnemyKind::BlueGolem.profile().death().duration() - 2.4).abs() < 1e-5);
        assert!((EnemyKind::Archer.profile().death().duration() - 1.12).abs() < 1e-5);
    }
}
