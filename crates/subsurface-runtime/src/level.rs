//! Level instantiation: integer tile grids into indexed tiles and spawns.
//!
//! File parsing stays outside this crate; the loader hands over grids of
//! integer codes (0 = empty) plus a level-local pixel origin. This module
//! turns the tile grid into [`Tile`]s for the spatial index and the entity
//! grid into [`Spawn`] records for the entity manager.
//!
//! The [`TilePalette`] is an explicit object owned by the loader and passed
//! into the build, mapping grid codes to semantics. There is no process-wide
//! registry.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use subsurface_core::prelude::*;

use crate::LoadError;

/// Tile and entity grid cell size in world pixels.
pub const TILE_SIZE: f32 = 16.0;

/// Player hitbox size.
pub const PLAYER_SIZE: Vec2 = Vec2::new(14.0, 26.0);

/// Remnant hitbox size (both variants share it).
pub const REMNANT_SIZE: Vec2 = Vec2::new(16.0, 24.0);

// ---------------------------------------------------------------------------
// TileKind / TilePalette
// ---------------------------------------------------------------------------

/// Semantics of a static tile, keyed by its grid code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    /// Plain solid wall.
    Wall,
    /// Kills the run on contact.
    Hazard,
    /// Transition marker to the previous level.
    ExitPrev,
    /// Transition marker to the next level.
    ExitNext,
    /// Solid; reserved for bounce behavior.
    Bounce,
}

/// Grid code of hazard tiles.
pub const HAZARD_ID: u32 = 2;
/// Grid code of previous-level transition tiles.
pub const EXIT_PREV_ID: u32 = 3;
/// Grid code of next-level transition tiles.
pub const EXIT_NEXT_ID: u32 = 4;

/// Maps grid codes to [`TileKind`]s.
///
/// Owned by the loader and passed by reference into the build step; levels
/// that need custom tiles extend it with [`insert`](Self::insert).
#[derive(Debug, Clone)]
pub struct TilePalette {
    kinds: BTreeMap<u32, TileKind>,
}

impl TilePalette {
    /// The stock palette: 1 wall, 2 hazard, 3/4 level transitions, 5 bounce.
    pub fn standard() -> Self {
        let mut kinds = BTreeMap::new();
        kinds.insert(1, TileKind::Wall);
        kinds.insert(HAZARD_ID, TileKind::Hazard);
        kinds.insert(EXIT_PREV_ID, TileKind::ExitPrev);
        kinds.insert(EXIT_NEXT_ID, TileKind::ExitNext);
        kinds.insert(5, TileKind::Bounce);
        Self { kinds }
    }

    /// Register (or override) a code.
    pub fn insert(&mut self, code: u32, kind: TileKind) {
        self.kinds.insert(code, kind);
    }

    /// The kind for `code`, if registered.
    pub fn kind(&self, code: u32) -> Option<TileKind> {
        self.kinds.get(&code).copied()
    }
}

impl Default for TilePalette {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// LevelOrigin / LevelPlan
// ---------------------------------------------------------------------------

/// World-pixel origin of a level's grids, as carried in the level metadata
/// record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelOrigin {
    pub x: f32,
    pub y: f32,
}

impl LevelOrigin {
    /// Parse the origin from a level metadata JSON document
    /// (`{"x": ..., "y": ...}`, extra fields ignored).
    pub fn from_metadata_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    #[inline]
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Everything the background builder needs to assemble a level: the parsed
/// grids plus the pixel origin. Produced by the external level parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelPlan {
    pub origin: LevelOrigin,
    /// Static tile codes, row-major, 0 = empty.
    pub tile_grid: Vec<Vec<u32>>,
    /// Entity codes, row-major, 0 = empty.
    pub entity_grid: Vec<Vec<u32>>,
}

// ---------------------------------------------------------------------------
// Tile instantiation
// ---------------------------------------------------------------------------

/// Instantiate the static tiles of a grid.
///
/// The tile id is the grid code itself; game logic reads it back from
/// collision results. An all-zero grid yields an empty list (a valid empty
/// index downstream), but a non-zero code missing from the palette is an
/// error.
pub fn tiles_from_grid(
    grid: &[Vec<u32>],
    origin: LevelOrigin,
    palette: &TilePalette,
) -> Result<Vec<Tile>, LoadError> {
    let mut tiles = Vec::new();
    for (row, codes) in grid.iter().enumerate() {
        for (col, &code) in codes.iter().enumerate() {
            if code == 0 {
                continue;
            }
            if palette.kind(code).is_none() {
                return Err(LoadError::UnknownTileCode { code, row, col });
            }
            let position = origin.as_vec2() + Vec2::new(col as f32, row as f32) * TILE_SIZE;
            tiles.push(Tile::new(
                Rect::from_corner_size(position, Vec2::splat(TILE_SIZE)),
                code,
            ));
        }
    }
    tracing::debug!(tiles = tiles.len(), "instantiated tile grid");
    Ok(tiles)
}

// ---------------------------------------------------------------------------
// Spawns
// ---------------------------------------------------------------------------

/// What to place at an entity-grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnKind {
    Player,
    SmallRemnant,
    BigRemnant,
}

impl SpawnKind {
    fn from_code(code: u32) -> Option<SpawnKind> {
        match code {
            1 => Some(SpawnKind::Player),
            2 => Some(SpawnKind::SmallRemnant),
            3 => Some(SpawnKind::BigRemnant),
            _ => None,
        }
    }

    /// Hitbox size for this kind.
    pub fn size(&self) -> Vec2 {
        match self {
            SpawnKind::Player => PLAYER_SIZE,
            SpawnKind::SmallRemnant | SpawnKind::BigRemnant => REMNANT_SIZE,
        }
    }
}

/// A placement record from the entity grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spawn {
    pub kind: SpawnKind,
    /// Top-left of the hitbox in world pixels.
    pub position: Vec2,
}

/// Read the entity grid into spawn records.
///
/// Entities stand ON their cell: the spawn position is the cell's pixel
/// position lifted by the entity height. Exactly one player is required;
/// zero (or several) is a [`LoadError`].
pub fn spawns_from_grid(grid: &[Vec<u32>], origin: LevelOrigin) -> Result<Vec<Spawn>, LoadError> {
    let mut spawns = Vec::new();
    let mut players = 0usize;
    for (row, codes) in grid.iter().enumerate() {
        for (col, &code) in codes.iter().enumerate() {
            if code == 0 {
                continue;
            }
            let kind = SpawnKind::from_code(code)
                .ok_or(LoadError::UnknownEntityCode { code, row, col })?;
            if kind == SpawnKind::Player {
                players += 1;
            }
            let cell = origin.as_vec2() + Vec2::new(col as f32, row as f32) * TILE_SIZE;
            spawns.push(Spawn {
                kind,
                position: cell - Vec2::new(0.0, kind.size().y),
            });
        }
    }
    match players {
        1 => Ok(spawns),
        0 => Err(LoadError::MissingPlayer),
        n => Err(LoadError::DuplicatePlayer { count: n }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
