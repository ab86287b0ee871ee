//! Populating a freshly loaded map with the character, enemies and NPCs.

use tilequest_common::Vec2;
use tracing::{debug, info};

use crate::character::Character;
use crate::collision::{character_probe, resolve_starting_position, CollisionQuery};
use crate::enemy::{Enemy, EnemyKind};
use crate::map::{MapModel, SpawnPoint};
use crate::quest::{Npc, NpcKind, Quests, NPC_SIZE};

/// Mixed archer / orc barbarian spawn layer.
pub const MONSTER_SPAWN_LAYER: &str = "Monster 1 Spawn Points";
/// Yellow knight spawn layer.
pub const YELLOW_KNIGHT_SPAWN_LAYER: &str = "Yellow Knights Spawn Point";
/// Yellow archer spawn layer.
pub const YELLOW_ARCHER_SPAWN_LAYER: &str = "Yellow Archers Spawn Point";
/// Blue golem spawn layer.
pub const BOSS_SPAWN_LAYER: &str = "Boss Level 1";

/// Chance that a mixed spawn point produces an archer.
pub const ARCHER_CHANCE: f32 = 0.5;

/// Everything placed on the map at load.
#[derive(Debug)]
pub struct Population {
    /// The player
    pub character: Character,
    /// Live enemies in spawn order
    pub enemies: Vec<Enemy>,
    /// NPCs and quest state
    pub quests: Quests,
}

/// Places the character, every enemy and both NPCs.
pub fn populate<C>(map: &MapModel, collision: &C, rng: &mut fastrand::Rng) -> Population
where
    C: CollisionQuery + ?Sized,
{
    let spawn = map.spawn_point();
    let character = spawn_character(spawn.as_ref(), collision);

    let mut enemies = Vec::new();
    for point in map.enemy_spawn_points(MONSTER_SPAWN_LAYER) {
        let kind = if rng.f32() < ARCHER_CHANCE {
            EnemyKind::Archer
        } else {
            EnemyKind::OrcBarbarian
        };
        enemies.push(Enemy::spawn_at(kind, &point));
    }

    let knight_points = map.enemy_spawn_points(YELLOW_KNIGHT_SPAWN_LAYER);
    let archer_points = map.enemy_spawn_points(YELLOW_ARCHER_SPAWN_LAYER);
    enemies.extend(
        knight_points
            .iter()
            .map(|p| Enemy::spawn_at(EnemyKind::YellowKnight, p)),
    );
    enemies.extend(
        archer_points
            .iter()
            .map(|p| Enemy::spawn_at(EnemyKind::YellowArcher, p)),
    );
    enemies.extend(
        map.enemy_spawn_points(BOSS_SPAWN_LAYER)
            .iter()
            .map(|p| Enemy::spawn_at(EnemyKind::BlueGolem, p)),
    );

    for kind in EnemyKind::ALL {
        let count = enemies.iter().filter(|e| e.kind == kind).count();
        if count > 0 {
            debug!("Spawned {} {}", count, kind.name());
        }
    }

    let quest_giver = spawn.as_ref().map(quest_giver_npc);
    let yellow_points: Vec<SpawnPoint> = archer_points.into_iter().chain(knight_points).collect();
    let boss_npc = boss_quest_npc(&yellow_points);

    info!(
        "Populated map: {} enemies, quest giver {}, boss quest NPC {}",
        enemies.len(),
        if quest_giver.is_some() { "placed" } else { "absent" },
        if boss_npc.is_some() { "placed" } else { "absent" },
    );

    Population {
        character,
        enemies,
        quests: Quests::new(quest_giver, boss_npc),
    }
}

/// Creates the character at the spawn centre, nudged out of any geometry.
pub fn spawn_character<C>(spawn: Option<&SpawnPoint>, collision: &C) -> Character
where
    C: CollisionQuery + ?Sized,
{
    let mut character = Character::new(Vec2::ZERO);
    let Some(spawn) = spawn else {
        debug!("Map has no player spawn, starting at the origin");
        return character;
    };
    let start = spawn.position + Vec2::new(spawn.width / 2.0, spawn.height / 2.0);
    let size = character.transform.size;
    let facing = character.transform.facing_right;
    character.transform.position =
        resolve_starting_position(collision, start, |p| character_probe(p, size, facing));
    character
}

/// Quest giver NPC, to the left of the player spawn's right edge.
#[must_use]
pub fn quest_giver_npc(spawn: &SpawnPoint) -> Npc {
    let position = Vec2::new(
        spawn.position.x + spawn.width - 400.0,
        spawn.position.y + spawn.height / 2.0 - NPC_SIZE.y / 2.0,
    );
    Npc::new(NpcKind::QuestGiver, position)
}

/// Boss quest NPC, beside the bottom-most (then left-most) yellow spawn.
#[must_use]
pub fn boss_quest_npc(points: &[SpawnPoint]) -> Option<Npc> {
    let (first, rest) = points.split_first()?;
    let anchor = rest.iter().fold(first, |best, p| {
        let lower = p.position.y > best.position.y;
        let tied_left = p.position.y == best.position.y && p.position.x < best.position.x;
        if lower || tied_left {
            p
        } else {
            best
        }
    });
    let position = Vec2::new(
        anchor.position.x + 100.0,
        anchor.position.y + anchor.height / 2.0 - 100.0,
    );
    Some(Npc::new(NpcKind::BossQuest, position))
}
