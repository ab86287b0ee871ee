//! Timed effects: the shield buff, damage popups, screen shake and the
//! heavy-attack visual.

use serde::{Deserialize, Serialize};
use tilequest_common::{Rect, Vec2};
use tracing::debug;

// ============================================================================
// Shield
// ============================================================================

/// Hits a fresh shield absorbs.
pub const SHIELD_HITS: u32 = 5;
/// Shield lifetime in seconds.
pub const SHIELD_LIFETIME: f32 = 20.0;
/// Shield animation frame count.
pub const SHIELD_FRAMES: u32 = 15;
/// Seconds per shield frame.
pub const SHIELD_FRAME_DURATION: f32 = 0.1;

/// Damage-absorbing buff around the character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    hits_remaining: u32,
    lifetime: f32,
    frame: u32,
    frame_time: f32,
}

impl Default for Shield {
    fn default() -> Self {
        Self::new()
    }
}

impl Shield {
    /// A fresh shield.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hits_remaining: SHIELD_HITS,
            lifetime: SHIELD_LIFETIME,
            frame: 0,
            frame_time: 0.0,
        }
    }

    /// Whether the shield can still absorb a hit.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.hits_remaining > 0 && self.lifetime > 0.0
    }

    /// Consumes one hit if active. Returns true when the hit was absorbed.
    pub fn absorb(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.hits_remaining -= 1;
        debug!(
            "Shield absorbed a hit, {} left, {:.1}s remaining",
            self.hits_remaining, self.lifetime
        );
        true
    }

    /// Advances animation and lifetime.
    pub fn tick(&mut self, dt: f32) {
        self.frame_time += dt;
        if self.frame_time >= SHIELD_FRAME_DURATION {
            self.frame_time = 0.0;
            self.frame = (self.frame + 1) % SHIELD_FRAMES;
        }
        self.lifetime -= dt;
    }

    /// Hits left.
    #[must_use]
    pub fn hits_remaining(&self) -> u32 {
        self.hits_remaining
    }

    /// Seconds left.
    #[must_use]
    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    /// Animation frame.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }
}

// ============================================================================
// Damage popups
// ============================================================================

/// Popup lifetime in seconds.
pub const POPUP_LIFETIME: f32 = 1.0;
/// Vertical popup velocity in px/s (negative is up).
pub const POPUP_VELOCITY_Y: f32 = -30.0;

/// Colour hint for a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PopupTint {
    /// Renderer default (blocked hits use their own style)
    #[default]
    Default,
    /// Magic damage
    Orange,
}

/// A floating damage number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamagePopup {
    /// World position
    pub position: Vec2,
    /// Damage shown
    pub amount: i32,
    /// Whether the hit was blocked
    pub blocked: bool,
    /// Colour hint
    pub tint: PopupTint,
    /// Seconds left
    pub lifetime: f32,
}

impl DamagePopup {
    /// Creates a popup at `position`.
    #[must_use]
    pub fn new(position: Vec2, amount: i32) -> Self {
        Self {
            position,
            amount,
            blocked: false,
            tint: PopupTint::Default,
            lifetime: POPUP_LIFETIME,
        }
    }

    /// Marks the popup as a blocked hit.
    #[must_use]
    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    /// Sets the colour hint.
    #[must_use]
    pub fn with_tint(mut self, tint: PopupTint) -> Self {
        self.tint = tint;
        self
    }
}

/// All live popups.
#[derive(Debug, Clone, Default)]
pub struct DamagePopups {
    popups: Vec<DamagePopup>,
}

impl DamagePopups {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a popup.
    pub fn push(&mut self, popup: DamagePopup) {
        self.popups.push(popup);
    }

    /// Floats popups upward and drops expired ones.
    pub fn tick(&mut self, dt: f32) {
        for popup in &mut self.popups {
            popup.position.y += POPUP_VELOCITY_Y * dt;
            popup.lifetime -= dt;
        }
        self.popups.retain(|p| p.lifetime > 0.0);
    }

    /// Live popups.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, DamagePopup> {
        self.popups.iter()
    }

    /// Number of live popups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.popups.len()
    }

    /// Whether there are no popups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.popups.is_empty()
    }
}

// ============================================================================
// Screen shake
// ============================================================================

/// Duration at which a shake runs at full intensity.
const SHAKE_REFERENCE_DURATION: f32 = 0.15;

/// Camera shake with a decaying random offset.
#[derive(Debug, Clone)]
pub struct ScreenShake {
    duration: f32,
    intensity: f32,
    offset: Vec2,
    rng: fastrand::Rng,
}

impl ScreenShake {
    /// Creates an idle shake seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            duration: 0.0,
            intensity: 0.0,
            offset: Vec2::ZERO,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Starts a shake, replacing any in progress.
    pub fn trigger(&mut self, duration: f32, intensity: f32) {
        self.duration = duration;
        self.intensity = intensity;
    }

    /// Advances the shake and rolls a new offset.
    pub fn tick(&mut self, dt: f32) {
        if self.duration <= 0.0 {
            return;
        }
        self.duration -= dt;
        let amount = self.intensity * (self.duration / SHAKE_REFERENCE_DURATION);
        self.offset = Vec2::new(
            (self.rng.f32() - 0.5) * amount * 2.0,
            (self.rng.f32() - 0.5) * amount * 2.0,
        );
        if self.duration <= 0.0 {
            self.offset = Vec2::ZERO;
            self.intensity = 0.0;
        }
    }

    /// Current offset to add to the camera.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Whether a shake is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.duration > 0.0
    }

    /// Current intensity.
    #[must_use]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }
}

// ============================================================================
// Heavy attack effect
// ============================================================================

/// Heavy effect frame size.
pub const HEAVY_EFFECT_SIZE: Vec2 = Vec2::new(192.0, 128.0);
/// Offset of the effect centre from the character centre, facing right.
pub const HEAVY_EFFECT_OFFSET: Vec2 = Vec2::new(30.0, -10.0);
/// Heavy effect frame count.
pub const HEAVY_EFFECT_FRAMES: u32 = 5;
/// Seconds per heavy effect frame.
pub const HEAVY_EFFECT_FRAME_DURATION: f32 = 0.069;
/// Backup lifetime in seconds.
pub const HEAVY_EFFECT_LIFETIME: f32 = 0.6;

/// Cosmetic sword trail that follows the character during a strong attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeavyAttackEffect {
    /// Current bounds
    pub rect: Rect,
    /// Facing captured at creation
    pub facing_right: bool,
    /// Animation frame
    pub frame: u32,
    frame_time: f32,
    lifetime: f32,
}

impl HeavyAttackEffect {
    /// Creates the effect around the character centre.
    #[must_use]
    pub fn new(character_center: Vec2, facing_right: bool) -> Self {
        Self {
            rect: Self::bounds_for(character_center, facing_right),
            facing_right,
            frame: 0,
            frame_time: 0.0,
            lifetime: HEAVY_EFFECT_LIFETIME,
        }
    }

    fn bounds_for(center: Vec2, facing_right: bool) -> Rect {
        let offset_x = if facing_right {
            HEAVY_EFFECT_OFFSET.x
        } else {
            -HEAVY_EFFECT_OFFSET.x
        };
        Rect::from_center(
            center + Vec2::new(offset_x, HEAVY_EFFECT_OFFSET.y),
            HEAVY_EFFECT_SIZE.x,
            HEAVY_EFFECT_SIZE.y,
        )
    }

    /// Follows the character and advances; returns false once finished.
    pub fn tick(&mut self, dt: f32, character_center: Vec2) -> bool {
        self.rect = Self::bounds_for(character_center, self.facing_right);
        self.frame_time += dt;
        if self.frame_time >= HEAVY_EFFECT_FRAME_DURATION {
            self.frame_time -= HEAVY_EFFECT_FRAME_DURATION;
            self.frame += 1;
            if self.frame >= HEAVY_EFFECT_FRAMES {
                return false;
            }
        }
        self.lifetime -= dt;
        self.lifetime > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shield_absorbs_five_hits() {
        let mut shield = Shield::new();
        for _ in 0..5 {
            assert!(shield.absorb());
        }
        assert!(!shield.absorb());
        assert!(!shield.is_active());
    }

    #[test]
    fn test_shield_expires() {
        let mut shield = Shield::new();
        for _ in 0..201 {
            shield.tick(0.1);
        }
        assert!(!shield.is_active());
        assert!(!shield.absorb());
        assert_eq!(shield.hits_remaining(), SHIELD_HITS);
    }

    #[test]
    fn test_shield_animation_wraps() {
        let mut shield = Shield::new();
        for _ in 0..15 {
            shield.tick(0.11);
        }
        assert_eq!(shield.frame(), 0);
    }

    #[test]
    fn test_popups_rise_and_expire() {
        let mut popups = DamagePopups::new();
        popups.push(DamagePopup::new(Vec2::new(10.0, 100.0), 7).with_tint(PopupTint::Orange));
        popups.tick(0.5);
        let popup = popups.iter().next().expect("popup alive");
        assert!((popup.position.y - 85.0).abs() < 1e-4);
        assert_eq!(popup.tint, PopupTint::Orange);
        popups.tick(0.6);
        assert!(popups.is_empty());
    }

    #[test]
    fn test_shake_decays_to_zero() {
        let mut shake = ScreenShake::new(7);
        shake.trigger(0.15, 3.0);
        shake.tick(0.01);
        assert!(shake.is_active());
        let offset = shake.offset();
        assert!(offset.x.abs() <= 3.0 && offset.y.abs() <= 3.0);
        for _ in 0..20 {
            shake.tick(0.01);
        }
        assert!(!shake.is_active());
        assert_eq!(shake.offset(), Vec2::ZERO);
        assert_eq!(shake.intensity(), 0.0);
    }

    #[test]
    fn test_shake_trigger_overwrites() {
        let mut shake = ScreenShake::new(1);
        shake.trigger(0.3, 8.0);
        shake.trigger(0.15, 3.0);
        assert_eq!(shake.intensity(), 3.0);
    }

    #[test]
    fn test_heavy_effect_plays_five_frames() {
        let center = Vec2::new(100.0, 100.0);
        let mut effect = HeavyAttackEffect::new(center, false);
        assert!((effect.rect.center() - Vec2::new(70.0, 90.0)).length() < 1e-4);

        let mut alive_frames = 0;
        while effect.tick(0.01, center) {
            alive_frames += 1;
            assert!(alive_frames < 100);
        }
        // 5 frames of 0.069 s at 0.01 s steps.
        assert!((33..=35).contains(&alive_frames));
    }

    #[test]
    fn test_heavy_effect_follows_character() {
        let mut effect = HeavyAttackEffect::new(Vec2::ZERO, true);
        effect.tick(0.01, Vec2::new(50.0, 0.0));
        assert!((effect.rect.center() - Vec2::new(80.0, -10.0)).length() < 1e-4);
    }
}
