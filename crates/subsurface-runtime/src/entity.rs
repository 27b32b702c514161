//! Dynamic entities: the player, patrolling remnants, and debris.
//!
//! Every entity embeds one [`KineticBody`] and follows the same per-frame
//! shape: gather forces, integrate [`SUBSTEPS`] sub-steps with the whole
//! frame force, resolve against the shared static index, then react to the
//! contact flags and touched tile ids. Entity kinds are a tagged
//! [`Entity`] enum dispatched by `match`; the shared capability surface is
//! the [`Positioned`] / [`Embodied`] trait pair, not an inheritance chain.
//!
//! Tile ids feed game logic here: hazards end the run, transition markers
//! request a level change. Those reactions surface as [`LevelEvent`]s for
//! the session to act on -- entities never reach into global state.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use subsurface_core::prelude::*;

use crate::level::{
    EXIT_NEXT_ID, EXIT_PREV_ID, HAZARD_ID, PLAYER_SIZE, REMNANT_SIZE,
};

// ---------------------------------------------------------------------------
// Tuning constants (load-bearing with the 10-sub-step contract)
// ---------------------------------------------------------------------------

/// Horizontal run force per frame.
pub const MOVE_FORCE: f32 = 6.0;
/// Upward jump impulse, applied for the single frame the jump starts.
pub const JUMP_FORCE: f32 = 9.81 * 23.0;
/// Remnant patrol force per frame.
pub const PATROL_FORCE: f32 = 2.0;
/// Damage dealt by remnant contact and by the player's attack.
pub const CONTACT_DAMAGE: i32 = 20;
/// Frames of invulnerability after taking a hit.
pub const GRACE_FRAMES: u32 = 50;
/// Horizontal reach of the player's attack region.
pub const ATTACK_REACH: f32 = 52.0;
/// Starting health for player and remnants.
pub const MAX_HEALTH: i32 = 100;

// ---------------------------------------------------------------------------
// ControlFrame / LevelEvent
// ---------------------------------------------------------------------------

/// One frame of player input, already mapped from whatever device the outer
/// shell reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    pub attack: bool,
}

/// Game-logic outcomes of a frame, raised by entities and consumed by the
/// session's driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEvent {
    /// The player reached a next-level transition tile.
    AdvanceLevel,
    /// The player reached a previous-level transition tile.
    RetreatLevel,
    /// The run is over: health reached zero or a hazard tile was touched.
    PlayerDied,
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Anything with a world-space hitbox.
pub trait Positioned {
    fn rect(&self) -> Rect;
}

/// Anything carrying a physics body.
pub trait Embodied: Positioned {
    fn body(&self) -> &KineticBody;
    fn body_mut(&mut self) -> &mut KineticBody;
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// The player unit: input-driven movement, jump, melee attack, health with
/// a post-hit grace period.
#[derive(Debug, Clone)]
pub struct Player {
    body: KineticBody,
    pub health: i32,
    facing: Facing,
    airborne: bool,
    grace_frames: u32,
    attacking: bool,
    attack_region: Rect,
    alive: bool,
}

impl Player {
    /// Spawn at rest with full health, facing right.
    pub fn new(position: Vec2) -> Self {
        let body = KineticBody::new(position, PLAYER_SIZE);
        let attack_region = Rect::new(
            position.x + PLAYER_SIZE.x,
            position.y,
            ATTACK_REACH,
            PLAYER_SIZE.y,
        );
        Self {
            body,
            health: MAX_HEALTH,
            facing: Facing::Right,
            airborne: false,
            grace_frames: 0,
            attacking: false,
            attack_region,
            alive: true,
        }
    }

    /// Advance one frame: input forces, integration, resolution, and tile
    /// reactions. Returns the events this frame raised.
    pub fn update(
        &mut self,
        dt: f32,
        substeps: u32,
        index: &SpatialIndex,
        input: &ControlFrame,
    ) -> Vec<LevelEvent> {
        let mut events = Vec::new();
        let mut force = Vec2::ZERO;
        self.attacking = false;

        if self.alive {
            if input.move_left {
                force.x -= MOVE_FORCE;
                self.facing = Facing::Left;
            }
            if input.move_right {
                force.x += MOVE_FORCE;
                self.facing = Facing::Right;
            }
            if input.jump {
                if !self.airborne {
                    force.y -= JUMP_FORCE;
                    self.airborne = true;
                }
            } else if self.airborne && self.body.contact.down {
                self.airborne = false;
            }
            self.attacking = input.attack;
        }

        if self.health <= 0 {
            self.body.reset_velocity();
            force = Vec2::ZERO;
        }

        for _ in 0..substeps {
            self.body.integrate(dt, force, true);
        }
        self.body.resolve(index);

        // Tile reactions by id.
        for &id in &self.body.touched {
            match id {
                HAZARD_ID => events.push(LevelEvent::PlayerDied),
                EXIT_PREV_ID => events.push(LevelEvent::RetreatLevel),
                EXIT_NEXT_ID => events.push(LevelEvent::AdvanceLevel),
                _ => {}
            }
        }

        // The attack hitbox hugs the facing side.
        let rect = self.body.rect();
        self.attack_region.x = match self.facing {
            Facing::Left => rect.x - ATTACK_REACH,
            Facing::Right => rect.right(),
        };
        self.attack_region.y = rect.y;

        // Stop on the x-axis when no horizontal force was applied.
        if force.x == 0.0 {
            self.body.halt_x();
        }

        if self.grace_frames > 0 {
            self.grace_frames -= 1;
        }

        if self.health <= 0 && self.alive {
            self.health = 0;
            self.alive = false;
            events.push(LevelEvent::PlayerDied);
        }

        events
    }

    /// Apply damage unless the grace period is active. On a landed hit the
    /// implied velocity is cancelled (stops knockback drift) and the grace
    /// period starts. Returns whether the hit landed.
    pub fn take_hit(&mut self, damage: i32) -> bool {
        if self.grace_frames > 0 || !self.alive {
            return false;
        }
        self.health = (self.health - damage).max(0);
        self.body.reset_velocity();
        self.grace_frames = GRACE_FRAMES;
        tracing::debug!(health = self.health, "player hit");
        true
    }

    /// True while the run continues.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// True on frames where the attack input landed.
    #[inline]
    pub fn attacking(&self) -> bool {
        self.attacking
    }

    /// The melee hitbox on the facing side.
    #[inline]
    pub fn attack_region(&self) -> Rect {
        self.attack_region
    }

    /// Current facing.
    #[inline]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Whether the grace period is active.
    #[inline]
    pub fn in_grace_period(&self) -> bool {
        self.grace_frames > 0
    }
}

impl Positioned for Player {
    fn rect(&self) -> Rect {
        self.body.rect()
    }
}

impl Embodied for Player {
    fn body(&self) -> &KineticBody {
        &self.body
    }
    fn body_mut(&mut self) -> &mut KineticBody {
        &mut self.body
    }
}

// ---------------------------------------------------------------------------
// Remnant
// ---------------------------------------------------------------------------

/// A patrolling enemy. Walks its platform, reversing at ledges and walls,
/// turns toward the player on sight, deals contact damage, and dies to the
/// player's attack.
#[derive(Debug, Clone)]
pub struct Remnant {
    body: KineticBody,
    pub health: i32,
    facing: Facing,
    pace: f32,
}

impl Remnant {
    pub fn new(position: Vec2, facing: Facing) -> Self {
        Self {
            body: KineticBody::new(position, REMNANT_SIZE),
            health: MAX_HEALTH,
            facing,
            pace: PATROL_FORCE,
        }
    }

    /// Advance one frame against the shared index and the player. Returns
    /// false once dead; the manager removes the corpse and bursts debris.
    pub fn update(
        &mut self,
        dt: f32,
        substeps: u32,
        index: &SpatialIndex,
        player: &mut Player,
    ) -> bool {
        // Reverse at a ledge: the probe ahead is clear of both floor and
        // wall. The probe itself is pure; the velocity cancel that
        // historically rode along is explicit here.
        if self.pace != 0.0 && self.body.probe_clear(index, self.facing) {
            self.facing = opposite(self.facing);
            self.body.reset_velocity();
        }

        // Turn toward the player on sight.
        if self.view_rect().overlaps(&player.rect()) {
            self.facing = if player.rect().x >= self.body.rect().x {
                Facing::Right
            } else {
                Facing::Left
            };
        }

        // Contact damage (respects the player's grace period).
        if self.body.rect().overlaps(&player.rect()) {
            player.take_hit(CONTACT_DAMAGE);
        }

        // Take the player's attack.
        if player.attacking() && self.body.rect().overlaps(&player.attack_region()) {
            self.health -= CONTACT_DAMAGE;
            tracing::debug!(health = self.health, "remnant hit");
        }

        let force = Vec2::new(
            match self.facing {
                Facing::Left => -self.pace,
                Facing::Right => self.pace,
            },
            0.0,
        );
        for _ in 0..substeps {
            self.body.integrate(dt, force, true);
        }
        self.body.resolve(index);

        // Bounce off walls.
        if self.body.contact.left {
            self.facing = Facing::Right;
        } else if self.body.contact.right {
            self.facing = Facing::Left;
        }

        self.health > 0
    }

    /// The strip this remnant watches for the player: ten body-widths wide,
    /// centered on the body, at body height.
    pub fn view_rect(&self) -> Rect {
        let rect = self.body.rect();
        let view_w = rect.w * 10.0;
        Rect::new(rect.x + (rect.w - view_w) / 2.0, rect.y, view_w, rect.h)
    }

    /// Center of the hitbox; debris bursts originate here.
    pub fn center(&self) -> Vec2 {
        self.body.rect().center()
    }

    #[inline]
    pub fn facing(&self) -> Facing {
        self.facing
    }
}

impl Positioned for Remnant {
    fn rect(&self) -> Rect {
        self.body.rect()
    }
}

impl Embodied for Remnant {
    fn body(&self) -> &KineticBody {
        &self.body
    }
    fn body_mut(&mut self) -> &mut KineticBody {
        &mut self.body
    }
}

fn opposite(facing: Facing) -> Facing {
    match facing {
        Facing::Left => Facing::Right,
        Facing::Right => Facing::Left,
    }
}

// ---------------------------------------------------------------------------
// Debris
// ---------------------------------------------------------------------------

/// A short-lived particle: one initial impulse, gravity without drag, and a
/// decaying lifetime.
#[derive(Debug, Clone)]
pub struct Debris {
    body: KineticBody,
    impulse: Option<Vec2>,
    ttl: f32,
}

impl Debris {
    /// `impulse` is applied as the frame force on the first update only;
    /// `ttl` decays by `dt * 10` per frame.
    pub fn new(position: Vec2, size: f32, impulse: Vec2, ttl: f32) -> Self {
        Self {
            body: KineticBody::new(position, Vec2::splat(size)),
            impulse: Some(impulse),
            ttl,
        }
    }

    /// Advance one frame. Returns false once expired.
    pub fn update(&mut self, dt: f32, substeps: u32, index: &SpatialIndex) -> bool {
        let force = self.impulse.take().unwrap_or(Vec2::ZERO);
        for _ in 0..substeps {
            self.body.integrate(dt, force, false);
        }
        self.body.resolve(index);

        self.ttl -= dt * 10.0;
        self.ttl > 0.0
    }

    #[inline]
    pub fn remaining(&self) -> f32 {
        self.ttl
    }
}

impl Positioned for Debris {
    fn rect(&self) -> Rect {
        self.body.rect()
    }
}

impl Embodied for Debris {
    fn body(&self) -> &KineticBody {
        &self.body
    }
    fn body_mut(&mut self) -> &mut KineticBody {
        &mut self.body
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Tagged union of every dynamic entity kind.
#[derive(Debug, Clone)]
pub enum Entity {
    Player(Player),
    Remnant(Remnant),
    Debris(Debris),
}

impl Entity {
    /// The player inside, if this is one.
    pub fn as_player(&self) -> Option<&Player> {
        match self {
            Entity::Player(player) => Some(player),
            _ => None,
        }
    }

    /// Mutable access to the player inside, if this is one.
    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match self {
            Entity::Player(player) => Some(player),
            _ => None,
        }
    }
}

impl Positioned for Entity {
    fn rect(&self) -> Rect {
        match self {
            Entity::Player(player) => player.rect(),
            Entity::Remnant(remnant) => remnant.rect(),
            Entity::Debris(debris) => debris.rect(),
        }
    }
}

impl Embodied for Entity {
    fn body(&self) -> &KineticBody {
        match self {
            Entity::Player(player) => player.body(),
            Entity::Remnant(remnant) => remnant.body(),
            Entity::Debris(debris) => debris.body(),
        }
    }
    fn body_mut(&mut self) -> &mut KineticBody {
        match self {
            Entity::Player(player) => player.body_mut(),
            Entity::Remnant(remnant) => remnant.body_mut(),
            Entity::Debris(debris) => debris.body_mut(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn floor_index() -> SpatialIndex {
        // A wide floor with a ledge on the right end, at y = 64.
        let tiles: Vec<Tile> = (0..8)
            .map(|i| Tile::new(Rect::new(i as f32 * 16.0, 64.0, 16.0, 16.0), 1))
            .collect();
        SpatialIndex::build(tiles, DEFAULT_MAX_DEPTH)
    }

    fn settle(player: &mut Player, index: &SpatialIndex) {
        for _ in 0..120 {
            player.update(DT, SUBSTEPS, index, &ControlFrame::default());
        }
        assert!(player.body().contact.down, "player should be grounded");
    }

    // -- Player -------------------------------------------------------------

    #[test]
    fn player_falls_and_lands() {
        let index = floor_index();
        let mut player = Player::new(Vec2::new(8.0, 0.0));
        settle(&mut player, &index);
        assert_eq!(player.rect().bottom(), 64.0);
    }

    #[test]
    fn run_input_moves_and_faces() {
        let index = floor_index();
        let mut player = Player::new(Vec2::new(40.0, 64.0 - PLAYER_SIZE.y));
        let before = player.rect().x;
        for _ in 0..10 {
            player.update(
                DT,
                SUBSTEPS,
                &index,
                &ControlFrame {
                    move_right: true,
                    ..Default::default()
                },
            );
        }
        assert!(player.rect().x > before);
        assert_eq!(player.facing(), Facing::Right);

        let mid = player.rect().x;
        for _ in 0..10 {
            player.update(
                DT,
                SUBSTEPS,
                &index,
                &ControlFrame {
                    move_left: true,
                    ..Default::default()
                },
            );
        }
        assert!(player.rect().x < mid);
        assert_eq!(player.facing(), Facing::Left);
    }

    #[test]
    fn jump_lifts_only_from_the_ground() {
        let index = floor_index();
        let mut player = Player::new(Vec2::new(8.0, 0.0));
        settle(&mut player, &index);
        let grounded_y = player.rect().y;

        // First jump frame lifts off.
        player.update(
            DT,
            SUBSTEPS,
            &index,
            &ControlFrame {
                jump: true,
                ..Default::default()
            },
        );
        assert!(player.rect().y < grounded_y, "jump should lift the player");

        // Holding jump mid-air adds no second impulse: vertical velocity
        // only decays under gravity from here.
        let v_before = player.body().velocity().y;
        player.update(
            DT,
            SUBSTEPS,
            &index,
            &ControlFrame {
                jump: true,
                ..Default::default()
            },
        );
        assert!(player.body().velocity().y > v_before);
        assert!(player.rect().y < grounded_y);
    }

    #[test]
    fn grace_period_blocks_repeat_hits() {
        let mut player = Player::new(Vec2::ZERO);
        assert!(player.take_hit(CONTACT_DAMAGE));
        assert_eq!(player.health, MAX_HEALTH - CONTACT_DAMAGE);
        assert!(player.in_grace_period());
        assert!(!player.take_hit(CONTACT_DAMAGE), "grace period should block");
        assert_eq!(player.health, MAX_HEALTH - CONTACT_DAMAGE);
    }

    #[test]
    fn grace_period_expires_after_its_frames() {
        let index = floor_index();
        let mut player = Player::new(Vec2::new(8.0, 0.0));
        settle(&mut player, &index);
        assert!(player.take_hit(CONTACT_DAMAGE));
        for _ in 0..GRACE_FRAMES {
            player.update(DT, SUBSTEPS, &index, &ControlFrame::default());
        }
        assert!(!player.in_grace_period());
        assert!(player.take_hit(CONTACT_DAMAGE));
    }

    #[test]
    fn health_exhaustion_raises_player_died() {
        let index = floor_index();
        let mut player = Player::new(Vec2::new(8.0, 0.0));
        player.health = CONTACT_DAMAGE;
        assert!(player.take_hit(CONTACT_DAMAGE));
        let events = player.update(DT, SUBSTEPS, &index, &ControlFrame::default());
        assert!(events.contains(&LevelEvent::PlayerDied));
        assert!(!player.is_alive());
    }

    #[test]
    fn attack_region_tracks_facing() {
        let index = floor_index();
        let mut player = Player::new(Vec2::new(40.0, 64.0 - PLAYER_SIZE.y));
        player.update(
            DT,
            SUBSTEPS,
            &index,
            &ControlFrame {
                move_right: true,
                ..Default::default()
            },
        );
        assert_eq!(player.attack_region().x, player.rect().right());

        player.update(
            DT,
            SUBSTEPS,
            &index,
            &ControlFrame {
                move_left: true,
                ..Default::default()
            },
        );
        assert_eq!(player.attack_region().x, player.rect().x - ATTACK_REACH);
        assert_eq!(player.attack_region().w, ATTACK_REACH);
    }

    #[test]
    fn transition_tiles_raise_events() {
        // Exit-next tile directly under the spawn point.
        let tiles = vec![
            Tile::new(Rect::new(0.0, 32.0, 16.0, 16.0), EXIT_NEXT_ID),
        ];
        let index = SpatialIndex::build(tiles, DEFAULT_MAX_DEPTH);
        let mut player = Player::new(Vec2::new(1.0, 0.0));
        let mut seen = Vec::new();
        for _ in 0..60 {
            seen.extend(player.update(DT, SUBSTEPS, &index, &ControlFrame::default()));
            if !seen.is_empty() {
                break;
            }
        }
        assert!(seen.contains(&LevelEvent::AdvanceLevel));
    }

    #[test]
    fn hazard_tile_ends_the_run() {
        let tiles = vec![Tile::new(Rect::new(0.0, 32.0, 16.0, 16.0), HAZARD_ID)];
        let index = SpatialIndex::build(tiles, DEFAULT_MAX_DEPTH);
        let mut player = Player::new(Vec2::new(1.0, 0.0));
        let mut seen = Vec::new();
        for _ in 0..60 {
            seen.extend(player.update(DT, SUBSTEPS, &index, &ControlFrame::default()));
            if !seen.is_empty() {
                break;
            }
        }
        assert!(seen.contains(&LevelEvent::PlayerDied));
    }

    // -- Remnant ------------------------------------------------------------

    #[test]
    fn remnant_reverses_at_a_ledge() {
        let index = floor_index(); // floor spans x in [0, 128)
        let mut remnant = Remnant::new(
            Vec2::new(100.0, 64.0 - REMNANT_SIZE.y),
            Facing::Right,
        );
        // A player far away so sight never interferes.
        let mut player = Player::new(Vec2::new(-500.0, -500.0));

        let mut reversed = false;
        for _ in 0..600 {
            remnant.update(DT, SUBSTEPS, &index, &mut player);
            if remnant.facing() == Facing::Left {
                reversed = true;
                break;
            }
        }
        assert!(reversed, "remnant should turn back at the ledge");
        assert!(
            remnant.rect().right() <= 128.0 + REMNANT_SIZE.x,
            "remnant should not march far past the platform edge"
        );
    }

    #[test]
    fn remnant_contact_damages_player() {
        let index = floor_index();
        let mut remnant = Remnant::new(Vec2::new(40.0, 64.0 - REMNANT_SIZE.y), Facing::Right);
        let mut player = Player::new(Vec2::new(42.0, 64.0 - PLAYER_SIZE.y));
        remnant.update(DT, SUBSTEPS, &index, &mut player);
        assert_eq!(player.health, MAX_HEALTH - CONTACT_DAMAGE);
        assert!(player.in_grace_period());
    }

    #[test]
    fn player_attack_kills_remnant_in_five_hits() {
        let index = floor_index();
        let mut remnant = Remnant::new(Vec2::new(60.0, 64.0 - REMNANT_SIZE.y), Facing::Left);
        let mut player = Player::new(Vec2::new(40.0, 64.0 - PLAYER_SIZE.y));

        let mut alive = true;
        let mut hits = 0;
        while alive && hits < 10 {
            // Land one attack frame, then let the grace-free remnant update
            // observe it.
            player.update(
                DT,
                SUBSTEPS,
                &index,
                &ControlFrame {
                    move_right: true,
                    attack: true,
                    ..Default::default()
                },
            );
            assert!(player.attacking());
            alive = remnant.update(DT, SUBSTEPS, &index, &mut player);
            hits += 1;
        }
        assert!(!alive, "remnant should die to repeated attacks");
        assert_eq!(hits, 5);
    }

    #[test]
    fn remnant_faces_player_on_sight() {
        let index = floor_index();
        let mut remnant = Remnant::new(Vec2::new(80.0, 64.0 - REMNANT_SIZE.y), Facing::Right);
        // Player inside the view strip, to the remnant's left.
        let mut player = Player::new(Vec2::new(20.0, 64.0 - PLAYER_SIZE.y));
        remnant.update(DT, SUBSTEPS, &index, &mut player);
        assert_eq!(remnant.facing(), Facing::Left);
    }

    // -- Debris -------------------------------------------------------------

    #[test]
    fn debris_expires_on_schedule() {
        let index = floor_index();
        // ttl 1.0 decays by dt * 10 per frame: six frames to die.
        let mut debris = Debris::new(Vec2::new(8.0, 0.0), 4.0, Vec2::ZERO, 1.0);
        let mut frames = 0;
        while debris.update(DT, SUBSTEPS, &index) {
            frames += 1;
            assert!(frames < 100, "debris never expired");
        }
        assert_eq!(frames, 5);
    }

    #[test]
    fn debris_impulse_applies_once() {
        let empty = SpatialIndex::build(Vec::new(), DEFAULT_MAX_DEPTH);
        let mut debris = Debris::new(Vec2::ZERO, 4.0, Vec2::new(50.0, 0.0), 100.0);
        debris.update(DT, SUBSTEPS, &empty);
        let v1 = debris.body().velocity().x;
        debris.update(DT, SUBSTEPS, &empty);
        let v2 = debris.body().velocity().x;
        assert!(v1 > 0.0);
        // No drag, no new force: horizontal velocity stays flat.
        assert!((v2 - v1).abs() < 1e-5);
    }

    // -- Entity dispatch ----------------------------------------------------

    #[test]
    fn entity_enum_dispatches_capabilities() {
        let player = Entity::Player(Player::new(Vec2::new(1.0, 2.0)));
        assert_eq!(player.rect().position(), Vec2::new(1.0, 2.0));
        assert!(player.as_player().is_some());

        let debris = Entity::Debris(Debris::new(Vec2::ZERO, 4.0, Vec2::ZERO, 1.0));
        assert!(debris.as_player().is_none());
        assert_eq!(debris.body().size(), Vec2::splat(4.0));
    }
}
