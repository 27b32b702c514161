//! Subsurface runtime -- the playable layer over `subsurface-core`.
//!
//! This crate turns the core's spatial index and physics bodies into a
//! platformer: tile palettes and grid instantiation, the entity roster
//! (player, remnants, debris), background level assembly with a progress
//! channel, and the fixed-timestep session that drives a frame.
//!
//! Windowing, sprites, menus, audio, and file parsing all live outside; the
//! seams are [`level::LevelPlan`] coming in and
//! [`session::LevelSession::advance`] being called once per frame.
//!
//! # Quick Start
//!
//! ```
//! use glam::Vec2;
//! use subsurface_runtime::prelude::*;
//!
//! let plan = LevelPlan {
//!     origin: LevelOrigin { x: 0.0, y: 0.0 },
//!     tile_grid: vec![vec![0; 8], vec![0; 8], vec![1; 8]],
//!     entity_grid: vec![vec![0, 1, 0, 0, 0, 0, 0, 0], vec![0; 8], vec![0; 8]],
//! };
//!
//! let mut handle = build_level_async(plan, TilePalette::standard(), 7);
//! let level = loop {
//!     match handle.poll() {
//!         LoadPoll::Pending(_) => std::thread::yield_now(),
//!         LoadPoll::Complete(result) => break result.unwrap(),
//!     }
//! };
//!
//! let mut session = LevelSession::new(level, Vec2::new(400.0, 225.0), FrameConfig::default());
//! let events = session.advance(&ControlFrame::default());
//! assert!(events.is_empty());
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod level;
pub mod loader;
pub mod manager;
pub mod session;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while assembling a level from its plan.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The tile grid contains a non-zero code the palette does not know.
    #[error("unknown tile code {code} at row {row}, col {col}")]
    UnknownTileCode { code: u32, row: usize, col: usize },

    /// The entity grid contains a non-zero code with no spawn mapping.
    #[error("unknown entity code {code} at row {row}, col {col}")]
    UnknownEntityCode { code: u32, row: usize, col: usize },

    /// The entity grid places no player.
    #[error("entity grid places no player")]
    MissingPlayer,

    /// The entity grid places more than one player.
    #[error("entity grid places {count} players, expected exactly one")]
    DuplicatePlayer { count: usize },

    /// Level metadata JSON did not parse.
    #[error("malformed level metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Install a process-wide `tracing` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops. Intended for
/// binaries and integration tests, never called by library code.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{
        ControlFrame, Debris, Embodied, Entity, LevelEvent, Player, Positioned, Remnant,
    };
    pub use crate::level::{
        spawns_from_grid, tiles_from_grid, LevelOrigin, LevelPlan, Spawn, SpawnKind, TileKind,
        TilePalette, TILE_SIZE,
    };
    pub use crate::loader::{
        build_level, build_level_async, LevelBuildHandle, LoadPoll, LoadedLevel,
    };
    pub use crate::manager::EntityManager;
    pub use crate::session::{FrameConfig, LevelSession};
    pub use crate::LoadError;

    pub use subsurface_core::prelude::*;
}
