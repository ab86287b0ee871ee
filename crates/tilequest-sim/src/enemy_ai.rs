//! Per-frame enemy decisions and animation.
//!
//! [`update_enemy`] advances one living enemy and returns the commands it
//! wants applied to the rest of the world (player damage, arrows, shake).
//! The caller applies them before moving on to the next enemy, so an enemy
//! never sees a player state that an earlier enemy already changed without
//! it being applied.

use crate::collision::{step_with_fallback, CollisionQuery};
use crate::enemy::{Behavior, Enemy, EnemyState, FrameTable};
use tilequest_common::Vec2;
use tracing::debug;

/// Screen shake for a regular enemy hit on the player.
pub const PLAYER_HIT_SHAKE: (f32, f32) = (0.15, 3.0);

/// What an enemy sees of the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    /// Player top-left
    pub position: Vec2,
    /// Player centre
    pub center: Vec2,
    /// Whether the player can still be hurt
    pub alive: bool,
}

/// Side effect requested by an enemy this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnemyCommand {
    /// Damage the player with `damage` base damage.
    StrikePlayer {
        /// Base damage before shield and abilities
        damage: i32,
        /// Whether the regular hit shake should play
        shake: bool,
    },
    /// Loose an arrow from the enemy's centre towards `target` (player
    /// top-left when the arrow was released).
    FireArrow {
        /// Aim point
        target: Vec2,
    },
    /// Shake the camera.
    Shake {
        /// Seconds
        duration: f32,
        /// Pixels
        intensity: f32,
    },
}

/// Advances a living enemy by `dt`.
pub fn update_enemy<C>(
    enemy: &mut Enemy,
    dt: f32,
    player: &PlayerView,
    collision: &C,
) -> Vec<EnemyCommand>
where
    C: CollisionQuery + ?Sized,
{
    debug_assert!(enemy.is_alive());
    let mut commands = Vec::new();

    let to_player = player.position - enemy.position;
    let distance = to_player.length();

    enemy.frame_time += dt;
    tick_attack(enemy, dt, player, &mut commands);

    if enemy.attack_cooldown > 0.0 {
        enemy.attack_cooldown -= dt;
    }
    if matches!(enemy.profile().behavior, Behavior::Skirmish { .. }) && enemy.shoot_cooldown > 0.0 {
        enemy.shoot_cooldown -= dt;
    }

    let sight = Sight {
        to_player,
        distance,
        dt,
    };
    match enemy.profile().behavior {
        Behavior::Guard { .. } => think_guard(enemy, &sight, collision),
        Behavior::Charge => think_charge(enemy, &sight, collision),
        Behavior::Skirmish {
            shoot_cooldown,
            approach_fraction,
            ..
        } => think_skirmish(enemy, &sight, shoot_cooldown, approach_fraction, collision),
        Behavior::Boss { .. } => think_boss(enemy, &sight, collision),
        Behavior::Volley { .. } => think_volley(enemy, &sight, collision),
    }

    animate(enemy, player, &mut commands);
    commands
}

struct Sight {
    to_player: Vec2,
    distance: f32,
    dt: f32,
}

// ============================================================================
// Attack timing
// ============================================================================

fn tick_attack(enemy: &mut Enemy, dt: f32, player: &PlayerView, commands: &mut Vec<EnemyCommand>) {
    if enemy.attack_timer <= 0.0 {
        return;
    }
    let profile = enemy.profile();
    enemy.attack_timer -= dt;

    if profile.behavior == Behavior::Charge && profile.attack_damage > 0 && !enemy.has_dealt_damage {
        let duration = profile.attack_duration();
        let elapsed = duration - enemy.attack_timer;
        if elapsed >= duration / 2.0 {
            enemy.has_dealt_damage = true;
            if player.alive && enemy.center().distance(player.center) <= profile.attack_range {
                debug!("{} {} hits mid-swing", enemy.kind.name(), enemy.id);
                commands.push(EnemyCommand::StrikePlayer {
                    damage: profile.attack_damage,
                    shake: true,
                });
            }
        }
    }

    if enemy.attack_timer <= 0.0 && enemy.state == EnemyState::Attacking {
        enemy.state = EnemyState::Idle;
        enemy.frame = 0;
        enemy.frame_time = 0.0;
        enemy.has_dealt_damage = false;

        if let Behavior::Guard { hit_range, .. } = profile.behavior {
            if profile.attack_damage > 0
                && player.alive
                && enemy.center().distance(player.center) <= hit_range
            {
                debug!("{} {} hits at swing end", enemy.kind.name(), enemy.id);
                commands.push(EnemyCommand::StrikePlayer {
                    damage: profile.attack_damage,
                    shake: true,
                });
            }
        }
    }
}

fn start_attack(enemy: &mut Enemy) {
    let profile = enemy.profile();
    enemy.state = EnemyState::Attacking;
    enemy.attack_timer = profile.attack_duration();
    enemy.attack_cooldown = profile.attack_cooldown;
    enemy.frame = 0;
    enemy.frame_time = 0.0;
    debug!("{} {} attacks", enemy.kind.name(), enemy.id);
}

fn face(enemy: &mut Enemy, sight: &Sight) {
    enemy.facing_right = sight.to_player.x > 0.0;
}

fn approach<C>(enemy: &mut Enemy, sight: &Sight, collision: &C)
where
    C: CollisionQuery + ?Sized,
{
    if sight.distance <= 0.0 {
        return;
    }
    let delta = sight.to_player / sight.distance * enemy.profile().speed * sight.dt;
    enemy.position = step_with_fallback(collision, &enemy.rect(), delta);
}

// ============================================================================
// Decisions
// ============================================================================

fn think_guard<C>(enemy: &mut Enemy, sight: &Sight, collision: &C)
where
    C: CollisionQuery + ?Sized,
{
    let profile = enemy.profile();
    if enemy.attack_timer > 0.0 {
        enemy.state = EnemyState::Attacking;
        enemy.is_blocking = false;
    } else if sight.distance < profile.detection_range {
        face(enemy, sight);
        if sight.distance <= profile.attack_range && enemy.attack_cooldown <= 0.0 {
            enemy.is_blocking = false;
            start_attack(enemy);
        } else if sight.distance > profile.attack_range {
            enemy.is_blocking = true;
            enemy.state = EnemyState::Moving;
            approach(enemy, sight, collision);
        } else {
            enemy.is_blocking = true;
            enemy.state = EnemyState::Blocking;
        }
    } else {
        enemy.is_blocking = true;
        enemy.state = EnemyState::Idle;
    }
}

fn think_charge<C>(enemy: &mut Enemy, sight: &Sight, collision: &C)
where
    C: CollisionQuery + ?Sized,
{
    let profile = enemy.profile();
    if sight.distance >= profile.detection_range {
        enemy.state = EnemyState::Idle;
        return;
    }
    face(enemy, sight);
    if sight.distance <= profile.attack_range
        && enemy.attack_cooldown <= 0.0
        && enemy.attack_timer <= 0.0
    {
        start_attack(enemy);
    } else if enemy.attack_timer <= 0.0 {
        enemy.state = EnemyState::Moving;
        if sight.distance > profile.attack_range {
            approach(enemy, sight, collision);
        }
    }
}

fn think_skirmish<C>(
    enemy: &mut Enemy,
    sight: &Sight,
    shoot_cooldown: f32,
    approach_fraction: f32,
    collision: &C,
) where
    C: CollisionQuery + ?Sized,
{
    let profile = enemy.profile();
    if sight.distance >= profile.detection_range {
        enemy.state = EnemyState::Idle;
        return;
    }
    face(enemy, sight);
    if enemy.shoot_timer > 0.0 {
        enemy.shoot_timer -= sight.dt;
    }

    if sight.distance <= profile.attack_range
        && enemy.shoot_cooldown <= 0.0
        && enemy.shoot_timer <= 0.0
    {
        enemy.state = EnemyState::Shooting;
        enemy.shoot_timer = profile.attack_duration();
        enemy.shoot_cooldown = shoot_cooldown;
        enemy.frame = 0;
        enemy.frame_time = 0.0;
        enemy.arrow_created = false;
        debug!("{} {} draws", enemy.kind.name(), enemy.id);
    } else if enemy.shoot_timer <= 0.0 {
        if sight.distance > profile.attack_range * approach_fraction {
            enemy.state = EnemyState::Moving;
            approach(enemy, sight, collision);
        } else {
            enemy.state = EnemyState::Idle;
        }
    }
}

fn think_boss<C>(enemy: &mut Enemy, sight: &Sight, collision: &C)
where
    C: CollisionQuery + ?Sized,
{
    let profile = enemy.profile();
    if enemy.hurt_timer > 0.0 {
        enemy.hurt_timer -= sight.dt;
    }

    if enemy.is_hurt() {
        enemy.state = EnemyState::Hurt;
    } else if enemy.attack_timer > 0.0 {
        enemy.state = EnemyState::Attacking;
    } else if sight.distance < profile.detection_range {
        face(enemy, sight);
        if sight.distance <= profile.attack_range && enemy.attack_cooldown <= 0.0 {
            start_attack(enemy);
            enemy.has_dealt_damage = false;
        } else if sight.distance > profile.attack_range {
            enemy.state = EnemyState::Walking;
            approach(enemy, sight, collision);
        } else {
            enemy.state = EnemyState::Idle;
        }
    } else {
        enemy.state = EnemyState::Idle;
    }
}

fn think_volley<C>(enemy: &mut Enemy, sight: &Sight, collision: &C)
where
    C: CollisionQuery + ?Sized,
{
    let profile = enemy.profile();
    if sight.distance >= profile.detection_range {
        enemy.state = EnemyState::Idle;
        return;
    }
    face(enemy, sight);
    if sight.distance <= profile.attack_range
        && enemy.attack_cooldown <= 0.0
        && enemy.attack_timer <= 0.0
    {
        start_attack(enemy);
        enemy.arrow_created = false;
    } else if enemy.attack_timer <= 0.0 {
        if sight.distance > profile.attack_range {
            enemy.state = EnemyState::Moving;
            approach(enemy, sight, collision);
        } else {
            enemy.state = EnemyState::Idle;
        }
    }
}

// ============================================================================
// Animation
// ============================================================================

fn advance_looping(enemy: &mut Enemy, table: FrameTable) {
    if enemy.frame_time >= table.duration {
        enemy.frame_time = 0.0;
        enemy.frame = (enemy.frame + 1) % table.frames;
    }
}

fn animate(enemy: &mut Enemy, player: &PlayerView, commands: &mut Vec<EnemyCommand>) {
    let profile = enemy.profile();
    match (enemy.state, profile.behavior) {
        (EnemyState::Idle, _) => advance_looping(enemy, profile.idle),
        (EnemyState::Moving | EnemyState::Walking, _) => advance_looping(enemy, profile.movement),
        (EnemyState::Blocking, Behavior::Guard { block, .. }) => advance_looping(enemy, block),
        (EnemyState::Shooting, Behavior::Skirmish { release_frame, .. }) => {
            if enemy.frame_time >= profile.attack.duration {
                enemy.frame_time = 0.0;
                if enemy.frame == release_frame && !enemy.arrow_created {
                    enemy.arrow_created = true;
                    commands.push(EnemyCommand::FireArrow {
                        target: player.position,
                    });
                }
                if enemy.frame < profile.attack.last_frame() {
                    enemy.frame += 1;
                } else {
                    enemy.state = EnemyState::Idle;
                    enemy.frame = 0;
                    enemy.frame_time = 0.0;
                }
            }
        },
        (EnemyState::Hurt, Behavior::Boss { hurt, .. }) => {
            if enemy.frame_time >= hurt.duration {
                enemy.frame_time = 0.0;
                if enemy.frame < hurt.last_frame() {
                    enemy.frame += 1;
                } else {
                    enemy.frame = 0;
                    if enemy.hurt_timer <= 0.0 {
                        enemy.state = EnemyState::Idle;
                    }
                }
            }
        },
        (EnemyState::Attacking, behavior) => animate_attack(enemy, behavior, player, commands),
        _ => {},
    }
}

fn animate_attack(
    enemy: &mut Enemy,
    behavior: Behavior,
    player: &PlayerView,
    commands: &mut Vec<EnemyCommand>,
) {
    let profile = enemy.profile();

    if let Behavior::Boss {
        hit_frame,
        cone_length,
        cone_angle,
        quake,
        ..
    } = behavior
    {
        if enemy.frame == hit_frame && !enemy.has_dealt_damage {
            commands.push(EnemyCommand::Shake {
                duration: quake.0,
                intensity: quake.1,
            });
            if player.alive && in_cone(enemy, player.center, cone_length, cone_angle) {
                debug!("{} {} slam connects", enemy.kind.name(), enemy.id);
                commands.push(EnemyCommand::StrikePlayer {
                    damage: profile.attack_damage,
                    shake: false,
                });
            }
            enemy.has_dealt_damage = true;
        }
    }

    if enemy.frame_time < profile.attack.duration {
        return;
    }
    enemy.frame_time = 0.0;
    if enemy.frame < profile.attack.last_frame() {
        enemy.frame += 1;
    } else {
        // Held on the last frame until the attack timer runs out.
        match behavior {
            Behavior::Volley { .. } => enemy.arrow_created = false,
            Behavior::Boss { .. } => enemy.has_dealt_damage = false,
            _ => {},
        }
    }

    if let Behavior::Volley {
        first_release_frame,
        last_release_frame,
    } = behavior
    {
        if (first_release_frame..=last_release_frame).contains(&enemy.frame) && !enemy.arrow_created {
            enemy.arrow_created = true;
            commands.push(EnemyCommand::FireArrow {
                target: player.position,
            });
        }
    }
}

/// Whether `target` lies inside the enemy's facing cone.
#[must_use]
pub fn in_cone(enemy: &Enemy, target: Vec2, length: f32, angle: f32) -> bool {
    let to_target = target - enemy.center();
    if to_target.length() > length {
        return false;
    }
    let facing = if enemy.facing_right { Vec2::X } else { Vec2::NEG_X };
    let cos = facing.dot(to_target.normalize_or_zero()).clamp(-1.0, 1.0);
    cos.acos() <= angle / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::MockCollision;
    use crate::enemy::EnemyKind;
    use tilequest_common::Rect;

    const DT: f32 = 1.0 / 60.0;
    const PLAYER_SIZE: Vec2 = Vec2::new(68.0, 68.0);

    fn player_at(position: Vec2) -> PlayerView {
        PlayerView {
            position,
            center: position + PLAYER_SIZE / 2.0,
            alive: true,
        }
    }

    fn simulate(enemy: &mut Enemy, player: &PlayerView, seconds: f32) -> Vec<EnemyCommand> {
        let collision = MockCollision::new();
        let mut all = Vec::new();
        let steps = (seconds / DT).round() as usize;
        for _ in 0..steps {
            all.extend(update_enemy(enemy, DT, player, &collision));
        }
        all
    }

    fn strikes(commands: &[EnemyCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, EnemyCommand::StrikePlayer { .. }))
            .count()
    }

    fn arrows(commands: &[EnemyCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, EnemyCommand::FireArrow { .. }))
            .count()
    }

    #[test]
    fn test_idle_outside_detection() {
        let mut orc = Enemy::new(EnemyKind::OrcBarbarian, Vec2::ZERO);
        let commands = simulate(&mut orc, &player_at(Vec2::new(1000.0, 0.0)), 1.0);
        assert!(commands.is_empty());
        assert_eq!(orc.state, EnemyState::Idle);
        assert_eq!(orc.position, Vec2::ZERO);
    }

    #[test]
    fn test_orc_approaches_and_faces() {
        let mut orc = Enemy::new(EnemyKind::OrcBarbarian, Vec2::ZERO);
        simulate(&mut orc, &player_at(Vec2::new(-300.0, 0.0)), 0.5);
        assert_eq!(orc.state, EnemyState::Moving);
        assert!(!orc.facing_right);
        assert!((orc.position.x + 75.0).abs() < 1.0);
    }

    #[test]
    fn test_orc_hits_once_at_halfway() {
        let mut orc = Enemy::new(EnemyKind::OrcBarbarian, Vec2::ZERO);
        let player = player_at(Vec2::new(50.0, 0.0));

        let early = simulate(&mut orc, &player, 0.55);
        assert_eq!(orc.state, EnemyState::Attacking);
        assert_eq!(strikes(&early), 0);

        let later = simulate(&mut orc, &player, 0.45);
        assert_eq!(strikes(&later), 1);
        assert_eq!(
            later[0],
            EnemyCommand::StrikePlayer {
                damage: 7,
                shake: true
            }
        );
    }

    #[test]
    fn test_knight_blocks_while_advancing_and_hits_at_end() {
        let mut knight = Enemy::new(EnemyKind::YellowKnight, Vec2::ZERO);
        let far = player_at(Vec2::new(200.0, 0.0));
        simulate(&mut knight, &far, 0.2);
        assert_eq!(knight.state, EnemyState::Moving);
        assert!(knight.is_blocking);
        assert!(knight.position.x > 0.0);

        let mut knight = Enemy::new(EnemyKind::YellowKnight, Vec2::ZERO);
        let near = player_at(Vec2::new(30.0, 30.0));
        let during = simulate(&mut knight, &near, 0.7);
        assert_eq!(knight.state, EnemyState::Attacking);
        assert!(!knight.is_blocking);
        assert_eq!(strikes(&during), 0);

        let after = simulate(&mut knight, &near, 0.2);
        assert_eq!(strikes(&after), 1);
        assert_eq!(knight.state, EnemyState::Blocking);
        assert!(knight.is_blocking);
    }

    #[test]
    fn test_knight_misses_when_player_stepped_away() {
        let mut knight = Enemy::new(EnemyKind::YellowKnight, Vec2::ZERO);
        simulate(&mut knight, &player_at(Vec2::new(30.0, 30.0)), 0.1);
        assert_eq!(knight.state, EnemyState::Attacking);
        let after = simulate(&mut knight, &player_at(Vec2::new(250.0, 250.0)), 1.0);
        assert_eq!(strikes(&after), 0);
    }

    #[test]
    fn test_archer_fires_one_arrow_per_attack() {
        let mut archer = Enemy::new(EnemyKind::Archer, Vec2::ZERO);
        let player = player_at(Vec2::new(300.0, 0.0));
        let commands = simulate(&mut archer, &player, 1.5);
        assert_eq!(arrows(&commands), 1);
        assert_eq!(
            commands.iter().find(|c| matches!(c, EnemyCommand::FireArrow { .. })),
            Some(&EnemyCommand::FireArrow {
                target: player.position
            })
        );

        // Cooldown is 2 s from the first draw, so a second volley follows.
        let more = simulate(&mut archer, &player, 1.5);
        assert_eq!(arrows(&more), 1);
    }

    #[test]
    fn test_yellow_archer_shoots_then_keeps_distance() {
        let mut archer = Enemy::new(EnemyKind::YellowArcher, Vec2::ZERO);
        archer.shoot_cooldown = 0.0;
        let player = player_at(Vec2::new(200.0, 0.0));
        let commands = simulate(&mut archer, &player, 1.0);
        assert_eq!(arrows(&commands), 1);
        assert_eq!(archer.state, EnemyState::Idle);
        assert_eq!(archer.position, Vec2::ZERO);
    }

    #[test]
    fn test_yellow_archer_approaches_beyond_preferred_range() {
        let mut archer = Enemy::new(EnemyKind::YellowArcher, Vec2::ZERO);
        simulate(&mut archer, &player_at(Vec2::new(340.0, 0.0)), 0.1);
        assert_eq!(archer.state, EnemyState::Moving);
        assert!(archer.position.x > 0.0);
    }

    #[test]
    fn test_golem_slam_shakes_and_hits_in_front() {
        let mut golem = Enemy::new(EnemyKind::BlueGolem, Vec2::ZERO);
        // Player centre 40 px in front of the golem centre.
        let center = golem.center() + Vec2::new(40.0, 0.0);
        let player = PlayerView {
            position: center - PLAYER_SIZE / 2.0,
            center,
            alive: true,
        };
        let commands = simulate(&mut golem, &player, 1.6);
        assert_eq!(strikes(&commands), 1);
        assert!(commands.contains(&EnemyCommand::Shake {
            duration: 0.3,
            intensity: 8.0
        }));
        assert!(commands.contains(&EnemyCommand::StrikePlayer {
            damage: 20,
            shake: false
        }));
    }

    #[test]
    fn test_cone_excludes_behind_and_far() {
        let golem = Enemy::new(EnemyKind::BlueGolem, Vec2::ZERO);
        let c = golem.center();
        let angle = std::f32::consts::FRAC_PI_3;
        assert!(in_cone(&golem, c + Vec2::new(150.0, 50.0), 200.0, angle));
        assert!(!in_cone(&golem, c + Vec2::new(-150.0, 0.0), 200.0, angle));
        assert!(!in_cone(&golem, c + Vec2::new(250.0, 0.0), 200.0, angle));
        assert!(!in_cone(&golem, c + Vec2::new(50.0, 100.0), 200.0, angle));
    }

    #[test]
    fn test_golem_hurt_interrupts() {
        let mut golem = Enemy::new(EnemyKind::BlueGolem, Vec2::ZERO);
        golem.take_damage(70, crate::combat_math::AttackKind::Basic);
        let player = player_at(Vec2::new(400.0, 0.0));
        simulate(&mut golem, &player, 0.2);
        assert_eq!(golem.state, EnemyState::Hurt);
        assert_eq!(golem.position, Vec2::ZERO);
        simulate(&mut golem, &player, 0.5);
        assert_eq!(golem.state, EnemyState::Walking);
    }

    #[test]
    fn test_movement_slides_along_wall() {
        let mut collision = MockCollision::new();
        collision.block(Rect::new(90.0, -500.0, 50.0, 1000.0));
        let mut orc = Enemy::new(EnemyKind::OrcBarbarian, Vec2::ZERO);
        let player = player_at(Vec2::new(300.0, 200.0));
        for _ in 0..30 {
            update_enemy(&mut orc, DT, &player, &collision);
        }
        assert!(orc.rect().right() <= 90.0);
        assert!(orc.position.y > 0.0);
    }

    #[test]
    fn test_dead_player_not_targeted() {
        let mut orc = Enemy::new(EnemyKind::OrcBarbarian, Vec2::ZERO);
        let mut player = player_at(Vec2::new(50.0, 0.0));
        player.alive = false;
        let commands = simulate(&mut orc, &player, 1.2);
        assert_eq!(strikes(&commands), 0);
    }
}
