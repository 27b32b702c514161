//! Verlet physics body with axis-separated collision resolution.
//!
//! A [`KineticBody`] is the per-entity physics capability: it advances a
//! position pair (current/previous) through velocity-implicit Verlet
//! integration, then resolves penetration against the static
//! [`SpatialIndex`](crate::spatial::SpatialIndex) in two sequential passes,
//! one per axis. Velocity is never stored; it is always derived as
//! `current - previous`, so snapping both to the same value kills motion on
//! that axis in one assignment.
//!
//! # Sub-step contract
//!
//! Callers invoke [`integrate`](KineticBody::integrate) exactly [`SUBSTEPS`]
//! times per logical frame, passing the SAME per-frame force on every
//! sub-step (not `force / 10`). The effective impulse over one frame is
//! therefore 10x the nominal force magnitude. The tuned gravity and jump
//! constants in the entity layer depend on this; do not redistribute the
//! force across sub-steps.
//!
//! # Resolution order
//!
//! The x-phase runs first against the body rectangle at the new horizontal
//! position (vertical position still at its last resolved value), then the
//! y-phase runs at the new vertical position. When several tiles are hit in
//! one phase, the snap target is the tile with the largest penetration depth
//! along that axis; ties fall to the lowest arena slot. Either way the
//! outcome is deterministic for a given index.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::rect::Rect;
use crate::spatial::SpatialIndex;

/// Integration sub-steps per logical frame.
pub const SUBSTEPS: u32 = 10;

/// Default downward gravity, world units per frame-squared at the tuned
/// sub-step rate.
pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, 9.81);

/// Default linear drag coefficient.
pub const DEFAULT_DRAG: f32 = 9.81 * 100.0;

// ---------------------------------------------------------------------------
// ContactFlags
// ---------------------------------------------------------------------------

/// Directional contact flags from the last resolution pass.
///
/// `left`/`right` and `up`/`down` are mutually exclusive within a frame: each
/// phase sets at most one of its pair, chosen by the sign of the axis
/// velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFlags {
    /// Hit a tile while moving up (snapped to its underside).
    pub up: bool,
    /// Hit a tile while moving down (standing on it).
    pub down: bool,
    /// Hit a tile while moving left.
    pub left: bool,
    /// Hit a tile while moving right.
    pub right: bool,
}

// ---------------------------------------------------------------------------
// Facing
// ---------------------------------------------------------------------------

/// Horizontal facing for probe queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// KineticBody
// ---------------------------------------------------------------------------

/// Per-entity physics state: Verlet position pair, hitbox, contact outputs,
/// and tuning constants.
///
/// Spawned at rest (`previous == current`), mutated every frame by
/// integration and resolution, destroyed with its entity. Callers must keep
/// `mass != 0`, sizes non-negative, and positions finite; the core has no
/// error taxonomy of its own (constructor asserts guard the mass).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KineticBody {
    /// Resolved rectangle position; what the rest of the game sees. Updated
    /// phase by phase during resolution, exactly one axis at a time.
    position: Vec2,
    current: Vec2,
    previous: Vec2,
    size: Vec2,
    /// Directional contacts from the last resolution.
    pub contact: ContactFlags,
    /// Ids of every tile hit during the last resolution, both phases.
    pub touched: BTreeSet<u32>,
    mass: f32,
    gravity: Vec2,
    drag: f32,
}

impl KineticBody {
    /// Spawn a body at rest with the stock tuning.
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            current: position,
            previous: position,
            size,
            contact: ContactFlags::default(),
            touched: BTreeSet::new(),
            mass: 1.0,
            gravity: DEFAULT_GRAVITY,
            drag: DEFAULT_DRAG,
        }
    }

    /// Override the mass.
    ///
    /// # Panics
    ///
    /// Panics unless `mass` is non-zero and finite (it divides the applied
    /// force on every sub-step).
    pub fn with_mass(mut self, mass: f32) -> Self {
        assert!(
            mass != 0.0 && mass.is_finite(),
            "mass must be non-zero and finite, got {mass}"
        );
        self.mass = mass;
        self
    }

    /// Override the gravity vector.
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Override the drag coefficient.
    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    // -- accessors ----------------------------------------------------------

    /// Resolved position (top-left of the hitbox).
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Hitbox size.
    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// The body's hitbox at its resolved position.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_corner_size(self.position, self.size)
    }

    /// Implied velocity: `current - previous`, per sub-step.
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.current - self.previous
    }

    /// Teleport the body, cancelling all motion.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.current = position;
        self.previous = position;
    }

    // -- integration --------------------------------------------------------

    /// One Verlet sub-step: advance `current` by the implied velocity plus
    /// `(acceleration - resistance) * dt^2`, snapshotting `previous` first.
    ///
    /// `force` is the whole-frame force; see the module docs for the
    /// sub-step contract. `apply_drag` gates the linear-drag term (debris
    /// integrates without it).
    pub fn integrate(&mut self, dt: f32, force: Vec2, apply_drag: bool) {
        let velocity = self.current - self.previous;
        let acceleration = (force + self.gravity) / self.mass;
        let resistance = if apply_drag {
            self.drag * velocity * dt
        } else {
            Vec2::ZERO
        };

        // Snapshot BEFORE advancing: this is what makes velocity implicit.
        self.previous = self.current;
        self.current += velocity + (acceleration - resistance) * (dt * dt);
    }

    /// Cancel the implied velocity without moving the body.
    pub fn reset_velocity(&mut self) {
        self.previous = self.current;
    }

    /// Cancel horizontal drift only, leaving vertical motion intact. Used
    /// when no horizontal force was applied this frame.
    pub fn halt_x(&mut self) {
        self.previous.x = self.current.x;
    }

    // -- collision resolution -----------------------------------------------

    /// Axis-separated resolution against the static index.
    ///
    /// Clears and repopulates [`contact`](Self::contact) and
    /// [`touched`](Self::touched). Each phase queries the index with the
    /// body rectangle advanced on that axis only, records every hit tile id,
    /// and snaps flush against the deepest-penetrating tile in the direction
    /// of travel -- setting `current` and `previous` to the snapped value,
    /// which zeroes the axis velocity. A phase with zero axis velocity
    /// records ids but never snaps.
    pub fn resolve(&mut self, index: &SpatialIndex) {
        self.contact = ContactFlags::default();
        self.touched.clear();

        // X-phase.
        let velx = self.current.x - self.previous.x;
        self.position.x = self.current.x;
        let rect = self.rect();
        let mut snap: Option<(f32, f32)> = None; // (depth, snapped x)
        for tile in index.hit(&rect) {
            self.touched.insert(tile.id);
            if velx == 0.0 {
                continue;
            }
            let depth = rect.right().min(tile.rect.right()) - rect.x.max(tile.rect.x);
            let snapped = if velx > 0.0 {
                tile.rect.x - self.size.x
            } else {
                tile.rect.right()
            };
            if snap.is_none_or(|(best, _)| depth > best) {
                snap = Some((depth, snapped));
            }
        }
        if let Some((_, x)) = snap {
            self.position.x = x;
            self.current.x = x;
            self.previous.x = x;
            if velx > 0.0 {
                self.contact.right = true;
            } else {
                self.contact.left = true;
            }
        }

        // Y-phase.
        let vely = self.current.y - self.previous.y;
        self.position.y = self.current.y;
        let rect = self.rect();
        let mut snap: Option<(f32, f32)> = None;
        for tile in index.hit(&rect) {
            self.touched.insert(tile.id);
            if vely == 0.0 {
                continue;
            }
            let depth = rect.bottom().min(tile.rect.bottom()) - rect.y.max(tile.rect.y);
            let snapped = if vely > 0.0 {
                tile.rect.y - self.size.y
            } else {
                tile.rect.bottom()
            };
            if snap.is_none_or(|(best, _)| depth > best) {
                snap = Some((depth, snapped));
            }
        }
        if let Some((_, y)) = snap {
            self.position.y = y;
            self.current.y = y;
            self.previous.y = y;
            if vely > 0.0 {
                self.contact.down = true;
            } else {
                self.contact.up = true;
            }
        }
    }

    /// Probe the cell one unit beyond the leading edge (side chosen by
    /// `facing`) and one unit below: a 1-unit-wide, body-height column.
    /// Returns true iff that column overlaps no tile.
    ///
    /// Pure read. Callers that also want the historical velocity cancel pair
    /// this with an explicit [`reset_velocity`](Self::reset_velocity).
    pub fn probe_clear(&self, index: &SpatialIndex, facing: Facing) -> bool {
        let x = match facing {
            Facing::Right => self.position.x + self.size.x,
            Facing::Left => self.position.x - 1.0,
        };
        let probe = Rect::new(x, self.position.y + 1.0, 1.0, self.size.y);
        !index.is_occupied(&probe)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
