//! The simulation world and its per-frame update.
//!
//! One [`GameWorld::update`] call advances every system in a fixed order:
//!
//! 1. tile, character and NPC animations
//! 2. screen shake
//! 3. camera
//! 4. player arrows, then enemy arrows
//! 5. magic projectiles, the shield, heavy-attack effects
//! 6. enemies (AI and damage to the player)
//! 7. damage popups
//! 8. the character (regen, cooldowns, attack, dash, hurt, movement)
//! 9. camera again
//!
//! Within each phase a system is the only writer of its collection. Enemies
//! that finish dying are collected during phase 6 and removed after it.

use serde::{Deserialize, Serialize};
use tilequest_common::{EntityId, Rect, Vec2};
use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::character::{AttackType, Character, HitOutcome, HitSource, MeleeStrike, XpGain, MELEE_RANGE};
use crate::collision::{CollisionQuery, CollisionWorld};
use crate::combat_math::AttackKind;
use crate::effects::{DamagePopup, DamagePopups, HeavyAttackEffect, PopupTint, ScreenShake};
use crate::enemy::{Enemy, EnemyKind};
use crate::enemy_ai::{update_enemy, EnemyCommand, PlayerView, PLAYER_HIT_SHAKE};
use crate::events::{EventBus, GameEvent, DEFAULT_EVENT_CAPACITY};
use crate::geometry::rects_overlap;
use crate::input::{MoveIntent, PlayerAction};
use crate::map::MapModel;
use crate::progression::Spell;
use crate::projectile::{player_volley, Arrow, MagicProjectile, ARROW_DAMAGE, MAGIC_DAMAGE};
use crate::quest::{NpcKind, QuestUpdate, Quests};
use crate::snapshot::RenderSnapshot;
use crate::spawn::populate;

/// Default map tile pitch in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// World construction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldOptions {
    /// Viewport width in pixels
    pub viewport_width: f32,
    /// Viewport height in pixels
    pub viewport_height: f32,
    /// Camera zoom
    pub zoom: f32,
    /// Explicit camera bounds
    pub camera_bounds: Option<Rect>,
    /// Clamp the camera to the map extent when no explicit bounds are set
    pub clamp_camera_to_map: bool,
    /// Tile pitch used when building collision
    pub tile_size: u32,
    /// Seed for spawn draws and screen shake
    pub seed: u64,
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            viewport_height: 720.0,
            zoom: 1.0,
            camera_bounds: None,
            clamp_camera_to_map: false,
            tile_size: DEFAULT_TILE_SIZE,
            seed: 0x7113_0E57,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Everything the simulation owns.
#[derive(Debug)]
pub struct GameWorld {
    map: MapModel,
    collision: CollisionWorld,
    character: Character,
    enemies: Vec<Enemy>,
    arrows: Vec<Arrow>,
    enemy_arrows: Vec<Arrow>,
    magic: Vec<MagicProjectile>,
    heavy_effects: Vec<HeavyAttackEffect>,
    popups: DamagePopups,
    shake: ScreenShake,
    camera: Camera,
    quests: Quests,
    events: EventBus,
    intent: MoveIntent,
    elapsed: f32,
    frame: u64,
}

impl GameWorld {
    /// Builds collision from the map and populates it.
    #[must_use]
    pub fn new(map: MapModel, options: &WorldOptions) -> Self {
        let collision = CollisionWorld::build(&map, options.tile_size);
        Self::with_collision(map, collision, options)
    }

    /// Populates the map against an already-built collision world.
    #[must_use]
    pub fn with_collision(map: MapModel, collision: CollisionWorld, options: &WorldOptions) -> Self {
        let mut rng = fastrand::Rng::with_seed(options.seed);
        let population = populate(&map, &collision, &mut rng);

        let bounds = options
            .camera_bounds
            .or_else(|| options.clamp_camera_to_map.then(|| map.pixel_bounds()));
        let mut camera = Camera::new(options.viewport_width, options.viewport_height)
            .with_zoom(options.zoom)
            .with_bounds(bounds);
        camera.center_on(population.character.center());

        info!(
            "World ready: {} collision shapes, {} enemies",
            collision.len(),
            population.enemies.len()
        );

        Self {
            map,
            collision,
            character: population.character,
            enemies: population.enemies,
            arrows: Vec::new(),
            enemy_arrows: Vec::new(),
            magic: Vec::new(),
            heavy_effects: Vec::new(),
            popups: DamagePopups::new(),
            shake: ScreenShake::new(rng.u64(..)),
            camera,
            quests: population.quests,
            events: EventBus::new(options.event_capacity),
            intent: MoveIntent::NONE,
            elapsed: 0.0,
            frame: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The map.
    #[must_use]
    pub fn map(&self) -> &MapModel {
        &self.map
    }

    /// Static collision.
    #[must_use]
    pub fn collision(&self) -> &CollisionWorld {
        &self.collision
    }

    /// The player.
    #[must_use]
    pub fn character(&self) -> &Character {
        &self.character
    }

    /// The player, mutably.
    pub fn character_mut(&mut self) -> &mut Character {
        &mut self.character
    }

    /// Live and dying enemies.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Adds an enemy.
    pub fn spawn_enemy(&mut self, enemy: Enemy) -> EntityId {
        let id = enemy.id;
        debug!("Spawned {} {}", enemy.kind.name(), id);
        self.enemies.push(enemy);
        id
    }

    /// An enemy by id.
    #[must_use]
    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    /// An enemy by id, mutably.
    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    /// Player arrows in flight.
    #[must_use]
    pub fn arrows(&self) -> &[Arrow] {
        &self.arrows
    }

    /// Enemy arrows in flight.
    #[must_use]
    pub fn enemy_arrows(&self) -> &[Arrow] {
        &self.enemy_arrows
    }

    /// Fire Splitters projectiles.
    #[must_use]
    pub fn magic_projectiles(&self) -> &[MagicProjectile] {
        &self.magic
    }

    /// Heavy-attack effects.
    #[must_use]
    pub fn heavy_effects(&self) -> &[HeavyAttackEffect] {
        &self.heavy_effects
    }

    /// Damage popups.
    #[must_use]
    pub fn popups(&self) -> &DamagePopups {
        &self.popups
    }

    /// Screen shake.
    #[must_use]
    pub fn shake(&self) -> &ScreenShake {
        &self.shake
    }

    /// Camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// NPCs and quests.
    #[must_use]
    pub fn quests(&self) -> &Quests {
        &self.quests
    }

    /// Event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Takes every queued event.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Simulated seconds.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Frames simulated.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Render-facing copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::capture(self)
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Applies this frame's intent and actions, then advances by `dt`.
    pub fn step(&mut self, dt: f32, intent: MoveIntent, actions: &[PlayerAction]) {
        self.set_intent(intent);
        for action in actions {
            self.handle_action(*action);
        }
        self.update(dt);
    }

    /// Sets the movement intent used by the next update and by dashes.
    pub fn set_intent(&mut self, intent: MoveIntent) {
        self.intent = intent.sanitized();
    }

    /// Applies a discrete action immediately.
    pub fn handle_action(&mut self, action: PlayerAction) {
        match action {
            PlayerAction::BasicAttack => {
                self.character.basic_attack();
            },
            PlayerAction::StrongAttack => {
                if self.character.strong_attack() {
                    self.spawn_heavy_effect();
                }
            },
            PlayerAction::RangedShot => {
                if self.character.ranged_shot() {
                    self.fire_volley();
                }
            },
            PlayerAction::CombinedAttack => {
                if self.character.combined_attack() == Some(AttackType::Ranged) {
                    self.fire_volley();
                }
            },
            PlayerAction::Dash => {
                self.character.dash(self.intent);
            },
            PlayerAction::SwapWeapon => {
                self.character.swap_weapon();
            },
            PlayerAction::CastSpell(spell) => self.cast_spell(spell),
            PlayerAction::SelectAbility(choice) => {
                if let Some(unlock) = self.character.select_ability(choice) {
                    info!("Unlocked {}", unlock.name());
                    self.events
                        .publish(GameEvent::AbilitySelected { choice, unlock });
                    if let Some(level) = self.character.progression.pending_choice() {
                        self.events.publish(GameEvent::AbilityChoiceOpened { level });
                    }
                }
            },
            PlayerAction::Talk(npc) => self.talk(npc),
            PlayerAction::AdvanceDialog(npc) => {
                let updates = self.quests.advance_dialog(npc);
                self.apply_quest_updates(updates);
            },
            PlayerAction::Click { x, y } => {
                let Some(npc) = self.quests.npc_at(Vec2::new(x, y), self.camera.position) else {
                    return;
                };
                if self.quests.npc(npc).is_some_and(|n| n.talking) {
                    let updates = self.quests.advance_dialog(npc);
                    self.apply_quest_updates(updates);
                } else {
                    self.talk(npc);
                }
            },
        }
    }

    fn spawn_heavy_effect(&mut self) {
        self.heavy_effects.push(HeavyAttackEffect::new(
            self.character.center(),
            self.character.transform.facing_right,
        ));
    }

    fn fire_volley(&mut self) {
        let origin = self.character.center();
        let aim = self.character.aim_direction();
        let multishot = self.character.progression.abilities.multishot;
        let volley = player_volley(origin, aim, multishot);
        self.events.publish(GameEvent::ArrowFired {
            origin,
            count: volley.len(),
        });
        self.arrows.extend(volley);
    }

    fn cast_spell(&mut self, spell: Spell) {
        if !self.character.cast_spell(spell) {
            return;
        }
        if spell == Spell::FireSplitters {
            let direction = self.character.aim_direction();
            self.magic
                .push(MagicProjectile::new(self.character.center(), direction));
        }
    }

    fn talk(&mut self, npc: NpcKind) {
        let updates = self.quests.start_dialog(npc);
        if self.quests.npc(npc).is_some_and(|n| n.talking) {
            self.events.publish(GameEvent::DialogOpened { npc });
        }
        self.apply_quest_updates(updates);
    }

    fn apply_quest_updates(&mut self, updates: Vec<QuestUpdate>) {
        for update in updates {
            match update {
                QuestUpdate::ObjectiveAdded(text) => {
                    self.events.publish(GameEvent::ObjectiveAdded { text });
                },
                QuestUpdate::ObjectiveRemoved(text) => {
                    self.events.publish(GameEvent::ObjectiveRemoved { text });
                },
                QuestUpdate::BossQuestStarted => {
                    self.events.publish(GameEvent::BossQuestStarted);
                },
                QuestUpdate::QuestCompleted { xp } => {
                    let gain = self.character.grant_xp(xp);
                    self.events.publish(GameEvent::QuestCompleted { xp });
                    self.report_xp(gain);
                },
            }
        }
    }

    // ========================================================================
    // Frame update
    // ========================================================================

    /// Advances the world by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if !dt.is_finite() || dt < 0.0 {
            warn!("Ignoring invalid frame time {}", dt);
            return;
        }
        self.elapsed += dt;
        self.frame += 1;

        self.map.animations_mut().tick(dt);
        self.character.tick_animation(dt);
        self.quests.tick(dt);

        self.shake.tick(dt);
        self.follow_character();

        self.update_player_arrows(dt);
        self.update_enemy_arrows(dt);

        self.update_magic(dt);
        self.character.tick_shield(dt);
        let center = self.character.center();
        self.heavy_effects.retain_mut(|effect| effect.tick(dt, center));

        self.update_enemies(dt);

        self.popups.tick(dt);

        if let Some(strike) = self.character.update(dt, self.intent, &self.collision) {
            self.apply_melee_strike(strike);
        }

        self.follow_character();
    }

    fn follow_character(&mut self) {
        self.camera.center_on(self.character.center());
    }

    fn update_player_arrows(&mut self, dt: f32) {
        let view = self.camera.view_rect();
        let mut arrows = std::mem::take(&mut self.arrows);
        arrows.retain_mut(|arrow| {
            arrow.advance(dt);
            if arrow.is_gone(&view) {
                return false;
            }
            let hitbox = arrow.hitbox();
            let target = self
                .enemies
                .iter()
                .position(|e| e.is_alive() && rects_overlap(&hitbox, &e.rect()));
            if let Some(index) = target {
                let damage = self
                    .character
                    .outgoing_damage(ARROW_DAMAGE, AttackKind::Ranged);
                self.damage_enemy(index, damage, AttackKind::Ranged);
                return false;
            }
            self.collision.can_occupy(&hitbox)
        });
        self.arrows = arrows;
    }

    fn update_enemy_arrows(&mut self, dt: f32) {
        let view = self.camera.view_rect();
        let hurtbox = self.character.hurtbox();
        let mut arrows = std::mem::take(&mut self.enemy_arrows);
        arrows.retain_mut(|arrow| {
            arrow.advance(dt);
            if arrow.is_gone(&view) || !self.collision.can_occupy(&arrow.rect) {
                return false;
            }
            if !rects_overlap(&arrow.rect, &hurtbox) {
                return true;
            }
            if let Some(outcome) = self.character.take_hit(ARROW_DAMAGE, HitSource::Arrow) {
                self.shake.trigger(PLAYER_HIT_SHAKE.0, PLAYER_HIT_SHAKE.1);
                self.report_player_hit(outcome);
            }
            false
        });
        self.enemy_arrows = arrows;
    }

    fn update_magic(&mut self, dt: f32) {
        let view = self.camera.view_rect();
        let mut projectiles = std::mem::take(&mut self.magic);
        projectiles.retain_mut(|projectile| {
            if !projectile.advance(dt) {
                return false;
            }
            for id in projectile.contacts(self.enemies.iter()) {
                if let Some(index) = self.enemies.iter().position(|e| e.id == id) {
                    let damage = self
                        .character
                        .outgoing_damage(MAGIC_DAMAGE, AttackKind::Magic);
                    self.damage_enemy(index, damage, AttackKind::Magic);
                }
            }
            !projectile.is_out_of_view(&view)
        });
        self.magic = projectiles;
    }

    fn update_enemies(&mut self, dt: f32) {
        let mut finished = Vec::new();
        for index in 0..self.enemies.len() {
            let enemy = &mut self.enemies[index];
            if enemy.is_dying() {
                if enemy.tick_death(dt) {
                    finished.push(enemy.id);
                }
                continue;
            }
            if !enemy.is_alive() {
                continue;
            }

            let player = PlayerView {
                position: self.character.position(),
                center: self.character.center(),
                alive: !self.character.is_dead(),
            };
            let commands = update_enemy(enemy, dt, &player, &self.collision);
            for command in commands {
                self.apply_enemy_command(index, command);
            }
        }

        if !finished.is_empty() {
            self.enemies.retain(|e| !finished.contains(&e.id));
            for enemy in finished {
                debug!("Removed enemy {}", enemy);
                self.events.publish(GameEvent::EnemyRemoved { enemy });
            }
        }
    }

    fn apply_enemy_command(&mut self, index: usize, command: EnemyCommand) {
        match command {
            EnemyCommand::StrikePlayer { damage, shake } => {
                let Some(outcome) = self.character.take_hit(damage, HitSource::Melee) else {
                    return;
                };
                self.popups
                    .push(DamagePopup::new(self.character.center(), outcome.damage));
                if shake {
                    self.shake.trigger(PLAYER_HIT_SHAKE.0, PLAYER_HIT_SHAKE.1);
                }
                self.report_player_hit(outcome);
            },
            EnemyCommand::FireArrow { target } => {
                let Some(shooter) = self.enemies.get(index) else {
                    return;
                };
                if let Some(arrow) = Arrow::from_enemy(&shooter.rect(), target) {
                    debug!("{} {} fired an arrow", shooter.kind.name(), shooter.id);
                    self.enemy_arrows.push(arrow);
                }
            },
            EnemyCommand::Shake {
                duration,
                intensity,
            } => self.shake.trigger(duration, intensity),
        }
    }

    fn apply_melee_strike(&mut self, strike: MeleeStrike) {
        let kind = match strike.kind {
            AttackType::Strong => AttackKind::Strong,
            _ => AttackKind::Basic,
        };
        let targets: Vec<usize> = self
            .enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_alive() && e.center().distance(strike.origin) <= MELEE_RANGE)
            .map(|(index, _)| index)
            .collect();
        debug!("{:?} strike reached {} enemies", strike.kind, targets.len());
        for index in targets {
            self.damage_enemy(index, strike.damage, kind);
        }
    }

    // ========================================================================
    // Damage and rewards
    // ========================================================================

    fn damage_enemy(&mut self, index: usize, amount: i32, kind: AttackKind) {
        let Some(enemy) = self.enemies.get_mut(index) else {
            return;
        };
        let Some(hit) = enemy.take_damage(amount, kind) else {
            return;
        };

        let anchor = Vec2::new(enemy.position.x + enemy.size().x / 2.0, enemy.position.y);
        let mut popup = DamagePopup::new(anchor, hit.damage).with_blocked(hit.blocked);
        if kind == AttackKind::Magic {
            popup = popup.with_tint(PopupTint::Orange);
        }
        self.popups.push(popup);

        let (id, enemy_kind) = (enemy.id, enemy.kind);
        self.events.publish(GameEvent::EnemyDamaged {
            enemy: id,
            damage: hit.damage,
            blocked: hit.blocked,
        });
        if hit.died {
            self.on_enemy_killed(id, enemy_kind);
        }
    }

    fn on_enemy_killed(&mut self, id: EntityId, kind: EnemyKind) {
        self.events.publish(GameEvent::EnemyKilled { enemy: id, kind });
        if kind == EnemyKind::BlueGolem && self.quests.mark_boss_defeated() {
            self.events.publish(GameEvent::BossDefeated);
        }
        if let Some(gain) = self.character.gain_kill_xp(kind.xp_reward()) {
            self.report_xp(gain);
        }
    }

    fn report_xp(&mut self, gain: XpGain) {
        if gain.levels == 0 {
            return;
        }
        let level = self.character.progression.level();
        self.events.publish(GameEvent::LevelUp { level });
        if let Some(level) = self.character.progression.pending_choice() {
            self.events.publish(GameEvent::AbilityChoiceOpened { level });
        }
    }

    fn report_player_hit(&mut self, outcome: HitOutcome) {
        self.events.publish(GameEvent::PlayerDamaged {
            damage: outcome.damage,
            health: self.character.health(),
        });
        if outcome.died {
            self.events.publish(GameEvent::PlayerDied);
        }
    }
}
