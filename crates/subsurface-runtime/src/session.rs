//! Fixed-timestep level session.
//!
//! A [`LevelSession`] owns one loaded level and drives it forward a frame at
//! a time, in the strict single-threaded order the physics model expects:
//!
//! 1. Entity update: each body integrates its sub-steps, then resolves
//!    against the shared static index.
//! 2. Camera chase: the scroll offset eases toward the player.
//! 3. Cull: the view culler re-queries the index at the new offset.
//!
//! There are no suspension points inside this sequence, and nothing here
//! blocks. The outermost pacing loop (vsync, window events) lives outside
//! this crate and calls [`advance`](LevelSession::advance) once per frame.
//!
//! Simulation time is computed as `frame_count * fixed_dt` rather than
//! accumulated, so it cannot drift.

use glam::Vec2;

use subsurface_core::prelude::*;

use crate::entity::{ControlFrame, Embodied, LevelEvent};
use crate::loader::LoadedLevel;
use crate::manager::EntityManager;

// ---------------------------------------------------------------------------
// FrameConfig
// ---------------------------------------------------------------------------

/// Timing configuration for a session.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Fixed time step in seconds per frame. Must be positive and finite.
    pub fixed_dt: f32,
    /// Integration sub-steps per frame. The tuned forces assume the default.
    pub substeps: u32,
}

impl Default for FrameConfig {
    /// 60 Hz with the standard sub-step count.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            substeps: SUBSTEPS,
        }
    }
}

// ---------------------------------------------------------------------------
// LevelSession
// ---------------------------------------------------------------------------

/// Divisor of the camera's per-frame step toward its target.
const CAMERA_EASE: f32 = 12.0;

/// Where on the screen the player sits: the viewport is divided by these
/// per axis (horizontally centered, vertically a little below center).
const CAMERA_ANCHOR: Vec2 = Vec2::new(2.0, 1.8);

/// One loaded level being played.
pub struct LevelSession {
    index: SpatialIndex,
    entities: EntityManager,
    culler: ViewCuller,
    offset: Vec2,
    frame_counter: u64,
    config: FrameConfig,
}

impl LevelSession {
    /// Start a session on a freshly loaded level.
    ///
    /// The camera starts snapped to its target instead of easing in from
    /// the world origin.
    ///
    /// # Panics
    ///
    /// Panics if `fixed_dt` is not positive and finite, or `substeps` is 0.
    pub fn new(level: LoadedLevel, viewport: Vec2, config: FrameConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        assert!(config.substeps > 0, "substeps must be at least 1");

        let offset = Self::camera_target(&level.entities, viewport);
        let mut culler = ViewCuller::new(viewport);
        culler.update(&level.index, offset);

        Self {
            index: level.index,
            entities: level.entities,
            culler,
            offset,
            frame_counter: 0,
            config,
        }
    }

    fn camera_target(entities: &EntityManager, viewport: Vec2) -> Vec2 {
        let rect = entities.player().body().rect();
        rect.center() - viewport / CAMERA_ANCHOR
    }

    /// Execute one frame: entities, camera, cull, in that order. Returns the
    /// events this frame raised (level transitions, the run ending).
    pub fn advance(&mut self, input: &ControlFrame) -> Vec<LevelEvent> {
        let events = self.entities.update(
            self.config.fixed_dt,
            self.config.substeps,
            &self.index,
            input,
        );

        // Ease the camera toward the player.
        let target = Self::camera_target(&self.entities, self.culler.viewport());
        self.offset += (target - self.offset) / CAMERA_EASE;

        self.culler.update(&self.index, self.offset);
        self.frame_counter += 1;

        if !events.is_empty() {
            tracing::debug!(frame = self.frame_counter, ?events, "level events");
        }
        events
    }

    // -- accessors ----------------------------------------------------------

    /// Frames advanced so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Simulation time in seconds, computed from the frame counter.
    pub fn sim_time(&self) -> f64 {
        self.frame_counter as f64 * self.config.fixed_dt as f64
    }

    /// The static index this session plays on.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// The entity roster.
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Current camera offset.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Tiles visible at the current offset, for the renderer.
    pub fn visible(&self) -> &[u32] {
        self.culler.visible()
    }

    /// The session's timing configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LevelOrigin, LevelPlan, TilePalette};
    use crate::loader::build_level;

    const VIEWPORT: Vec2 = Vec2::new(400.0, 225.0);

    fn flat_level() -> LoadedLevel {
        let plan = LevelPlan {
            origin: LevelOrigin { x: 0.0, y: 0.0 },
            tile_grid: vec![
                vec![0; 16],
                vec![0; 16],
                vec![0; 16],
                vec![1; 16],
            ],
            entity_grid: vec![
                vec![0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                vec![0; 16],
                vec![0; 16],
                vec![0; 16],
            ],
        };
        build_level(&plan, &TilePalette::standard(), 3, |_| {}).unwrap()
    }

    #[test]
    fn frames_and_sim_time_advance() {
        let mut session = LevelSession::new(flat_level(), VIEWPORT, FrameConfig::default());
        assert_eq!(session.frame_count(), 0);
        for _ in 0..120 {
            session.advance(&ControlFrame::default());
        }
        assert_eq!(session.frame_count(), 120);
        assert!((session.sim_time() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn player_settles_on_the_floor() {
        let mut session = LevelSession::new(flat_level(), VIEWPORT, FrameConfig::default());
        for _ in 0..120 {
            session.advance(&ControlFrame::default());
        }
        let player = session.entities().player();
        // Floor row is at y = 48.
        assert_eq!(player.body().rect().bottom(), 48.0);
        assert!(player.body().contact.down);
    }

    #[test]
    fn camera_follows_the_player() {
        let mut session = LevelSession::new(flat_level(), VIEWPORT, FrameConfig::default());
        let start = session.offset();
        let input = ControlFrame {
            move_right: true,
            ..Default::default()
        };
        for _ in 0..240 {
            session.advance(&input);
        }
        assert!(
            session.offset().x > start.x,
            "camera should chase the player rightwards"
        );
    }

    #[test]
    fn visible_set_is_refreshed_each_frame() {
        let mut session = LevelSession::new(flat_level(), VIEWPORT, FrameConfig::default());
        session.advance(&ControlFrame::default());
        // The whole floor row is 16 tiles; the 400px viewport sees at most 26
        // of anything, and at least one floor tile is on screen.
        assert!(!session.visible().is_empty());
        for &slot in session.visible() {
            let tile = session.index().tile(slot);
            assert_eq!(tile.id, 1);
        }
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn zero_dt_panics() {
        let _ = LevelSession::new(
            flat_level(),
            VIEWPORT,
            FrameConfig {
                fixed_dt: 0.0,
                substeps: SUBSTEPS,
            },
        );
    }

    #[test]
    #[should_panic(expected = "substeps must be at least 1")]
    fn zero_substeps_panics() {
        let _ = LevelSession::new(
            flat_level(),
            VIEWPORT,
            FrameConfig {
                fixed_dt: 1.0 / 60.0,
                substeps: 0,
            },
        );
    }
}
