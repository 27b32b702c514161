//! Subsurface core -- spatial indexing and physics for a 2D tile platformer.
//!
//! This crate is the algorithmic heart of the runtime: an adaptive quadtree
//! over a level's static tiles, a Verlet-integrated physics body with
//! axis-separated collision resolution, and the viewport culler that shares
//! the same index. It does no I/O, spawns no threads, and interprets no
//! game rules; the `subsurface-runtime` crate layers those on top.
//!
//! # Quick Start
//!
//! ```
//! use glam::Vec2;
//! use subsurface_core::prelude::*;
//!
//! // One floor tile, indexed once at level load.
//! let tiles = vec![Tile::new(Rect::new(0.0, 40.0, 64.0, 16.0), 1)];
//! let index = SpatialIndex::build(tiles, DEFAULT_MAX_DEPTH);
//!
//! // A body falls onto it.
//! let mut body = KineticBody::new(Vec2::new(8.0, 0.0), Vec2::new(14.0, 26.0));
//! for _ in 0..60 {
//!     for _ in 0..SUBSTEPS {
//!         body.integrate(1.0 / 60.0, Vec2::ZERO, true);
//!     }
//!     body.resolve(&index);
//! }
//! assert!(body.contact.down);
//! assert_eq!(body.rect().bottom(), 40.0);
//! ```

#![deny(unsafe_code)]

pub mod body;
pub mod culler;
pub mod rect;
pub mod spatial;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::body::{ContactFlags, Facing, KineticBody, DEFAULT_DRAG, DEFAULT_GRAVITY, SUBSTEPS};
    pub use crate::culler::ViewCuller;
    pub use crate::rect::Rect;
    pub use crate::spatial::{SpatialIndex, Tile, DEFAULT_MAX_DEPTH};
}
