//! Viewport culling against the spatial index.
//!
//! The [`ViewCuller`] is a thin consumer of the
//! [`SpatialIndex`](crate::spatial::SpatialIndex): once per rendered frame it
//! queries the index with the current scroll offset and viewport size, and
//! keeps the resulting slot list for the renderer. It never mutates the
//! index.

use glam::Vec2;

use crate::rect::Rect;
use crate::spatial::{SpatialIndex, Tile};

// ---------------------------------------------------------------------------
// ViewCuller
// ---------------------------------------------------------------------------

/// Tracks which static tiles fall inside the current viewport.
///
/// Holds arena slots rather than tile references so the result can outlive
/// the query without borrowing the index; resolve them through
/// [`visible_tiles`](Self::visible_tiles) at draw time. Slot order follows
/// the index's deterministic ascending order.
#[derive(Debug)]
pub struct ViewCuller {
    viewport: Vec2,
    visible: Vec<u32>,
}

impl ViewCuller {
    /// Create a culler for a viewport of the given size.
    pub fn new(viewport: Vec2) -> Self {
        Self {
            viewport,
            visible: Vec::new(),
        }
    }

    /// Re-query the index with the viewport placed at `offset`. Pure read of
    /// the index; replaces the previous visible set.
    pub fn update(&mut self, index: &SpatialIndex, offset: Vec2) {
        self.visible = index.hit_slots(&Rect::from_corner_size(offset, self.viewport));
    }

    /// Slots of the tiles visible after the last [`update`](Self::update).
    #[inline]
    pub fn visible(&self) -> &[u32] {
        &self.visible
    }

    /// Resolve the visible slots against the index they were queried from.
    pub fn visible_tiles<'a>(&'a self, index: &'a SpatialIndex) -> impl Iterator<Item = &'a Tile> {
        self.visible.iter().map(|&slot| index.tile(slot))
    }

    /// The viewport size.
    #[inline]
    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
