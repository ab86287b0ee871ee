//! Plain-data view of a frame for renderers and tooling.

use serde::{Deserialize, Serialize};
use tilequest_common::{EntityId, Rect, Vec2};

use crate::character::{CharacterAnimation, LifeState, WeaponMode};
use crate::effects::{DamagePopup, HeavyAttackEffect};
use crate::enemy::{EnemyKind, EnemyState};
use crate::projectile::{Arrow, ArrowOrientation};
use crate::quest::{BossQuest, NpcKind};
use crate::world::GameWorld;

/// Character as drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterView {
    /// Bounds
    pub rect: Rect,
    /// Facing right
    pub facing_right: bool,
    /// Weapon mode
    pub weapon_mode: WeaponMode,
    /// Life state
    pub life: LifeState,
    /// Animation to play
    pub animation: CharacterAnimation,
    /// Frame index
    pub frame: u32,
    /// Health
    pub health: i32,
    /// Max health
    pub max_health: i32,
}

/// Enemy as drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyView {
    /// Identity
    pub id: EntityId,
    /// Kind
    pub kind: EnemyKind,
    /// Bounds
    pub rect: Rect,
    /// Facing right
    pub facing_right: bool,
    /// Behavior state
    pub state: EnemyState,
    /// Frame index
    pub frame: u32,
    /// Health
    pub health: i32,
    /// Max health
    pub max_health: i32,
    /// Blocking stance
    pub blocking: bool,
}

/// Arrow as drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrowView {
    /// Bounds
    pub rect: Rect,
    /// Unit direction
    pub direction: Vec2,
    /// Sprite orientation
    pub orientation: ArrowOrientation,
}

impl From<&Arrow> for ArrowView {
    fn from(arrow: &Arrow) -> Self {
        Self {
            rect: arrow.rect,
            direction: arrow.direction,
            orientation: arrow.orientation,
        }
    }
}

/// Fire Splitters projectile as drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagicView {
    /// Bounds
    pub rect: Rect,
    /// Frame index
    pub frame: u32,
    /// Sprite faces right
    pub facing_right: bool,
}

/// Active shield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShieldView {
    /// Hits left
    pub hits_remaining: u32,
    /// Seconds left
    pub lifetime: f32,
    /// Frame index
    pub frame: u32,
}

/// NPC as drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcView {
    /// Which NPC
    pub kind: NpcKind,
    /// Bounds
    pub rect: Rect,
    /// Idle frame
    pub frame: u32,
    /// Exclamation marker
    pub exclamation: bool,
    /// Dialog open
    pub talking: bool,
    /// Line shown
    pub message: Option<String>,
}

/// XP bar and ability prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    /// Total XP
    pub xp: u32,
    /// Level
    pub level: u32,
    /// Fraction of the current level, 0..=1
    pub progress: f32,
    /// XP still needed
    pub xp_to_next_level: u32,
    /// Level whose ability choice is pending
    pub pending_choice: Option<u32>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    /// Frames simulated
    pub frame: u64,
    /// Simulated seconds
    pub elapsed: f32,
    /// Camera top-left
    pub camera: Vec2,
    /// Shake offset to add to the camera
    pub shake_offset: Vec2,
    /// Tile animation clock, seconds
    pub tile_animation_time: f32,
    /// Player
    pub character: CharacterView,
    /// Enemies, dying ones included
    pub enemies: Vec<EnemyView>,
    /// Player arrows
    pub arrows: Vec<ArrowView>,
    /// Enemy arrows
    pub enemy_arrows: Vec<ArrowView>,
    /// Fire Splitters projectiles
    pub magic: Vec<MagicView>,
    /// Heavy-attack effects
    pub heavy_effects: Vec<HeavyAttackEffect>,
    /// Shield buff
    pub shield: Option<ShieldView>,
    /// Damage numbers
    pub popups: Vec<DamagePopup>,
    /// XP and level
    pub progress: ProgressView,
    /// Shown objectives
    pub objectives: Vec<String>,
    /// Boss quest flags
    pub boss_quest: BossQuest,
    /// NPCs
    pub npcs: Vec<NpcView>,
}

impl RenderSnapshot {
    /// Copies the drawable state out of `world`.
    #[must_use]
    pub fn capture(world: &GameWorld) -> Self {
        let character = world.character();
        let progression = &character.progression;
        let quests = world.quests();

        Self {
            frame: world.frame(),
            elapsed: world.elapsed(),
            camera: world.camera().position,
            shake_offset: world.shake().offset(),
            tile_animation_time: world.map().animations().total_elapsed(),
            character: CharacterView {
                rect: character.rect(),
                facing_right: character.transform.facing_right,
                weapon_mode: character.combat.weapon_mode,
                life: character.life_state(),
                animation: character.animation_kind(),
                frame: character.animation.frame,
                health: character.health(),
                max_health: character.max_health(),
            },
            enemies: world
                .enemies()
                .iter()
                .map(|e| EnemyView {
                    id: e.id,
                    kind: e.kind,
                    rect: e.rect(),
                    facing_right: e.facing_right,
                    state: e.state,
                    frame: e.frame,
                    health: e.health,
                    max_health: e.max_health,
                    blocking: e.is_blocking,
                })
                .collect(),
            arrows: world.arrows().iter().map(ArrowView::from).collect(),
            enemy_arrows: world.enemy_arrows().iter().map(ArrowView::from).collect(),
            magic: world
                .magic_projectiles()
                .iter()
                .map(|m| MagicView {
                    rect: m.rect,
                    frame: m.frame,
                    facing_right: m.facing_right,
                })
                .collect(),
            heavy_effects: world.heavy_effects().to_vec(),
            shield: character.shield().map(|s| ShieldView {
                hits_remaining: s.hits_remaining(),
                lifetime: s.lifetime(),
                frame: s.frame(),
            }),
            popups: world.popups().iter().cloned().collect(),
            progress: ProgressView {
                xp: progression.xp(),
                level: progression.level(),
                progress: progression.progress(),
                xp_to_next_level: progression.xp_to_next_level(),
                pending_choice: progression.pending_choice(),
            },
            objectives: quests.log.active().map(str::to_string).collect(),
            boss_quest: quests.boss,
            npcs: quests
                .npcs()
                .map(|npc| NpcView {
                    kind: npc.kind,
                    rect: npc.rect,
                    frame: npc.frame,
                    exclamation: npc.show_exclamation,
                    talking: npc.talking,
                    message: npc.current_line().map(str::to_string),
                })
                .collect(),
        }
    }
}
