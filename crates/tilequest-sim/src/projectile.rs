//! Arrows and the Fire Splitters projectile.
//!
//! Projectiles only move and age here; the world decides what they hit and
//! applies the damage.

use crate::enemy::Enemy;
use crate::geometry::rects_overlap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tilequest_common::{EntityId, Rect, Vec2};
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Player arrow speed in px/s.
pub const PLAYER_ARROW_SPEED: f32 = 400.0;
/// Enemy arrow speed in px/s.
pub const ENEMY_ARROW_SPEED: f32 = 540.0;
/// Arrow lifetime in seconds.
pub const ARROW_LIFETIME: f32 = 3.0;
/// Base damage of any arrow.
pub const ARROW_DAMAGE: i32 = 15;
/// Arrows further than this outside the view are dropped.
pub const ARROW_VIEW_MARGIN: f32 = 500.0;
/// Fractional growth of the player arrow hitbox.
pub const ARROW_HITBOX_PADDING: f32 = 0.15;
/// Angle between multishot arrows, in radians.
pub const MULTISHOT_SPREAD: f32 = 0.26;

/// Fire Splitters frame size.
pub const MAGIC_SIZE: Vec2 = Vec2::new(128.0, 64.0);
/// Fire Splitters speed in px/s.
pub const MAGIC_SPEED: f32 = 300.0;
/// Fire Splitters frame count; the projectile is gone after one play-through.
pub const MAGIC_FRAMES: u32 = 6;
/// Seconds per Fire Splitters frame.
pub const MAGIC_FRAME_DURATION: f32 = 0.1;
/// Backup lifetime.
pub const MAGIC_LIFETIME: f32 = 0.6;
/// Fire Splitters base damage per tick.
pub const MAGIC_DAMAGE: i32 = 35;
/// Fire Splitters further than this outside the view are dropped.
pub const MAGIC_VIEW_MARGIN: f32 = 200.0;

/// Directions shorter than this do not produce arrows.
const MIN_DIRECTION: f32 = 0.01;

/// Whether a top-left `point` lies beyond `margin` outside `view`.
#[must_use]
pub fn outside_view(point: Vec2, view: &Rect, margin: f32) -> bool {
    point.x < view.x - margin
        || point.x > view.right() + margin
        || point.y < view.y - margin
        || point.y > view.bottom() + margin
}

// ============================================================================
// Arrows
// ============================================================================

/// Sprite orientation of an arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrowOrientation {
    /// Mostly sideways (14×3)
    Horizontal,
    /// Mostly up or down (3×14)
    Vertical,
    /// Both axes above 0.3 (12×14)
    Diagonal,
}

impl ArrowOrientation {
    /// Orientation for a unit direction.
    #[must_use]
    pub fn for_direction(direction: Vec2) -> Self {
        let (ax, ay) = (direction.x.abs(), direction.y.abs());
        if ax > 0.3 && ay > 0.3 {
            Self::Diagonal
        } else if ay > ax {
            Self::Vertical
        } else {
            Self::Horizontal
        }
    }

    /// Sprite size.
    #[must_use]
    pub fn size(self) -> Vec2 {
        match self {
            Self::Horizontal => Vec2::new(14.0, 3.0),
            Self::Vertical => Vec2::new(3.0, 14.0),
            Self::Diagonal => Vec2::new(12.0, 14.0),
        }
    }
}

/// A flying arrow, shot by the player or an enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    /// Bounds
    pub rect: Rect,
    /// Unit direction
    pub direction: Vec2,
    /// Velocity in px/s
    pub velocity: Vec2,
    /// Sprite orientation
    pub orientation: ArrowOrientation,
    /// Seconds left
    pub lifetime: f32,
}

impl Arrow {
    /// An arrow centred on `center` flying along the unit `direction`.
    #[must_use]
    pub fn new(center: Vec2, direction: Vec2, speed: f32) -> Self {
        let orientation = ArrowOrientation::for_direction(direction);
        let size = orientation.size();
        Self {
            rect: Rect::from_center(center, size.x, size.y),
            direction,
            velocity: direction * speed,
            orientation,
            lifetime: ARROW_LIFETIME,
        }
    }

    /// An enemy arrow from the centre of `shooter` aimed along the line from
    /// the shooter's top-left to `target`. `None` when the two coincide.
    #[must_use]
    pub fn from_enemy(shooter: &Rect, target: Vec2) -> Option<Self> {
        let offset = target - shooter.position();
        let distance = offset.length();
        if distance == 0.0 {
            return None;
        }
        Some(Self::new(
            shooter.center(),
            offset / distance,
            ENEMY_ARROW_SPEED,
        ))
    }

    /// Moves and ages the arrow.
    pub fn advance(&mut self, dt: f32) {
        self.rect = self.rect.translated(self.velocity * dt);
        self.lifetime -= dt;
    }

    /// Whether the arrow is spent or far outside the view.
    #[must_use]
    pub fn is_gone(&self, view: &Rect) -> bool {
        self.lifetime <= 0.0 || outside_view(self.rect.position(), view, ARROW_VIEW_MARGIN)
    }

    /// Enlarged hitbox used against enemies.
    #[must_use]
    pub fn hitbox(&self) -> Rect {
        self.rect.expanded_by_fraction(ARROW_HITBOX_PADDING)
    }
}

/// The arrows of one player shot centred on `center`.
///
/// One arrow along `aim`, or three spread by [`MULTISHOT_SPREAD`] with
/// multishot unlocked.
#[must_use]
pub fn player_volley(center: Vec2, aim: Vec2, multishot: bool) -> Vec<Arrow> {
    let directions: Vec<Vec2> = if multishot {
        let main = aim.y.atan2(aim.x);
        [main - MULTISHOT_SPREAD, main, main + MULTISHOT_SPREAD]
            .into_iter()
            .map(|angle| Vec2::new(angle.cos(), angle.sin()))
            .collect()
    } else {
        vec![aim]
    };

    let arrows: Vec<Arrow> = directions
        .into_iter()
        .filter(|d| d.length() >= MIN_DIRECTION)
        .map(|d| Arrow::new(center, d, PLAYER_ARROW_SPEED))
        .collect();
    debug!("Volley of {} arrow(s) along {:?}", arrows.len(), aim);
    arrows
}

// ============================================================================
// Fire Splitters
// ============================================================================

/// The Fire Splitters projectile: damages every enemy it overlaps once per
/// animation frame, then bursts after one play-through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicProjectile {
    /// Bounds
    pub rect: Rect,
    /// Velocity in px/s
    pub velocity: Vec2,
    /// Animation frame
    pub frame: u32,
    /// Sprite faces right
    pub facing_right: bool,
    frame_time: f32,
    lifetime: f32,
    /// Frame on which each overlapping enemy was last damaged (or first
    /// touched)
    #[serde(skip)]
    last_hit_frame: HashMap<EntityId, u32>,
}

impl MagicProjectile {
    /// Casts a projectile centred on `center` along the unit `direction`.
    #[must_use]
    pub fn new(center: Vec2, direction: Vec2) -> Self {
        Self {
            rect: Rect::from_center(center, MAGIC_SIZE.x, MAGIC_SIZE.y),
            velocity: direction * MAGIC_SPEED,
            frame: 0,
            facing_right: direction.x >= 0.0,
            frame_time: 0.0,
            lifetime: MAGIC_LIFETIME,
            last_hit_frame: HashMap::new(),
        }
    }

    /// Moves and animates. Returns false once the animation has played
    /// through or the lifetime ran out.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.rect = self.rect.translated(self.velocity * dt);
        self.frame_time += dt;
        if self.frame_time >= MAGIC_FRAME_DURATION {
            self.frame_time = 0.0;
            self.frame += 1;
            if self.frame >= MAGIC_FRAMES {
                return false;
            }
        }
        self.lifetime -= dt;
        self.lifetime > 0.0
    }

    /// Enemies to damage this frame.
    ///
    /// The first frame an enemy is touched only records it; afterwards it is
    /// damaged whenever the animation frame differs from the recorded one.
    /// Enemies that leave the area are forgotten.
    pub fn contacts<'a, I>(&mut self, enemies: I) -> Vec<EntityId>
    where
        I: IntoIterator<Item = &'a Enemy>,
    {
        let mut hits = Vec::new();
        for enemy in enemies {
            if !enemy.is_alive() {
                continue;
            }
            if rects_overlap(&self.rect, &enemy.rect()) {
                let recorded = *self.last_hit_frame.entry(enemy.id).or_insert(self.frame);
                if recorded != self.frame {
                    self.last_hit_frame.insert(enemy.id, self.frame);
                    hits.push(enemy.id);
                }
            } else {
                self.last_hit_frame.remove(&enemy.id);
            }
        }
        hits
    }

    /// Whether the projectile has left the view by more than its margin.
    #[must_use]
    pub fn is_out_of_view(&self, view: &Rect) -> bool {
        outside_view(self.rect.position(), view, MAGIC_VIEW_MARGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::EnemyKind;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_orientation_sizes() {
        assert_eq!(
            ArrowOrientation::for_direction(Vec2::X),
            ArrowOrientation::Horizontal
        );
        assert_eq!(
            ArrowOrientation::for_direction(Vec2::NEG_Y),
            ArrowOrientation::Vertical
        );
        assert_eq!(
            ArrowOrientation::for_direction(Vec2::new(0.6, 0.8)),
            ArrowOrientation::Diagonal
        );
        assert_eq!(ArrowOrientation::Vertical.size(), Vec2::new(3.0, 14.0));
    }

    #[test]
    fn test_arrow_centred_and_moves() {
        let mut arrow = Arrow::new(Vec2::new(100.0, 100.0), Vec2::X, PLAYER_ARROW_SPEED);
        assert_eq!(arrow.rect, Rect::new(93.0, 98.5, 14.0, 3.0));
        arrow.advance(0.5);
        assert_eq!(arrow.rect.x, 293.0);
        assert!((arrow.lifetime - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_arrow_expiry_and_view_margin() {
        let view = Rect::new(0.0, 0.0, 800.0, 600.0);
        let mut arrow = Arrow::new(Vec2::new(400.0, 300.0), Vec2::X, PLAYER_ARROW_SPEED);
        assert!(!arrow.is_gone(&view));
        arrow.rect.x = 1299.0;
        assert!(!arrow.is_gone(&view));
        arrow.rect.x = 1301.0;
        assert!(arrow.is_gone(&view));

        let mut old = Arrow::new(Vec2::new(400.0, 300.0), Vec2::X, PLAYER_ARROW_SPEED);
        old.advance(3.0);
        assert!(old.is_gone(&view));
    }

    #[test]
    fn test_hitbox_grows_fifteen_percent() {
        let arrow = Arrow::new(Vec2::new(100.0, 100.0), Vec2::X, PLAYER_ARROW_SPEED);
        let hitbox = arrow.hitbox();
        assert!((hitbox.width - 16.1).abs() < 1e-4);
        assert_eq!(hitbox.center(), arrow.rect.center());
    }

    #[test]
    fn test_enemy_arrow_aims_from_top_left() {
        let shooter = Rect::new(0.0, 0.0, 100.0, 100.0);
        let arrow = Arrow::from_enemy(&shooter, Vec2::new(0.0, 300.0)).expect("aimed");
        assert_eq!(arrow.direction, Vec2::Y);
        assert_eq!(arrow.velocity, Vec2::new(0.0, ENEMY_ARROW_SPEED));
        assert_eq!(arrow.rect.center(), Vec2::new(50.0, 50.0));
        assert!(Arrow::from_enemy(&shooter, Vec2::ZERO).is_none());
    }

    #[test]
    fn test_multishot_spreads_three() {
        let single = player_volley(Vec2::ZERO, Vec2::X, false);
        assert_eq!(single.len(), 1);

        let volley = player_volley(Vec2::ZERO, Vec2::X, true);
        assert_eq!(volley.len(), 3);
        assert!((volley[0].direction.y + 0.26f32.sin()).abs() < 1e-5);
        assert!(volley[1].direction.y.abs() < 1e-6);
        assert!((volley[2].direction.y - 0.26f32.sin()).abs() < 1e-5);
    }

    #[test]
    fn test_magic_bursts_after_six_frames() {
        let mut magic = MagicProjectile::new(Vec2::ZERO, Vec2::X);
        let mut ticks = 0;
        while magic.advance(DT) {
            ticks += 1;
            assert!(ticks < 100);
        }
        let seconds = (ticks + 1) as f32 * DT;
        assert!(seconds <= 0.6 + 2.0 * DT);
        assert!(seconds >= 0.55);
    }

    #[test]
    fn test_magic_damages_once_per_frame() {
        let enemy = Enemy::new(EnemyKind::BlueGolem, Vec2::new(-50.0, -50.0));
        let mut magic = MagicProjectile::new(Vec2::ZERO, Vec2::ZERO);

        // First touch only records.
        assert!(magic.contacts([&enemy]).is_empty());
        assert!(magic.contacts([&enemy]).is_empty());

        magic.frame = 1;
        assert_eq!(magic.contacts([&enemy]), vec![enemy.id]);
        assert!(magic.contacts([&enemy]).is_empty());

        magic.frame = 2;
        assert_eq!(magic.contacts([&enemy]), vec![enemy.id]);
    }

    #[test]
    fn test_magic_forgets_enemies_that_leave() {
        let mut enemy = Enemy::new(EnemyKind::OrcBarbarian, Vec2::new(-20.0, -20.0));
        let mut magic = MagicProjectile::new(Vec2::ZERO, Vec2::ZERO);
        magic.contacts([&enemy]);

        enemy.position = Vec2::new(5000.0, 5000.0);
        magic.contacts([&enemy]);

        enemy.position = Vec2::new(-20.0, -20.0);
        magic.frame = 3;
        // Re-entry records again instead of damaging.
        assert!(magic.contacts([&enemy]).is_empty());
    }
}
