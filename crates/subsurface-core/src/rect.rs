//! Axis-aligned rectangle primitive.
//!
//! [`Rect`] is the geometry currency of the whole runtime: tiles, body
//! hitboxes, query windows, and viewports are all axis-aligned rectangles
//! stored as a top-left corner plus a non-negative size. There is no rotation
//! anywhere in the engine, so every spatial question reduces to per-axis
//! interval arithmetic.
//!
//! Overlap uses *open* interiors: two rectangles that merely share an edge do
//! not overlap. This is what lets a resolved body sit flush against a wall
//! without re-colliding with it on the next frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// An axis-aligned rectangle: top-left corner plus size.
///
/// Invariant (caller-enforced): `w >= 0` and `h >= 0`. A zero-size rectangle
/// is valid and overlaps nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Rect {
    /// Construct from explicit coordinates.
    #[inline]
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Construct from a position and size vector.
    #[inline]
    pub fn from_corner_size(position: Vec2, size: Vec2) -> Self {
        Self {
            x: position.x,
            y: position.y,
            w: size.x,
            h: size.y,
        }
    }

    /// Right edge (`x + w`).
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge (`y + h`).
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Top-left corner.
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Size as a vector.
    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    /// Geometric midpoint.
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Open-interior overlap test on both axes. Edge-touching rectangles
    /// (zero-width intersection) do NOT overlap. Symmetric.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x + self.w > other.x
            && self.x < other.x + other.w
            && self.y + self.h > other.y
            && self.y < other.y + other.h
    }

    /// Indices of every rectangle in `others` that overlaps `self`.
    pub fn overlap_indices(&self, others: &[Rect]) -> Vec<usize> {
        others
            .iter()
            .enumerate()
            .filter(|(_, other)| self.overlaps(other))
            .map(|(i, _)| i)
            .collect()
    }

    /// Minimal rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let x_min = self.x.min(other.x);
        let y_min = self.y.min(other.y);
        let x_max = self.right().max(other.right());
        let y_max = self.bottom().max(other.bottom());
        Rect {
            x: x_min,
            y: y_min,
            w: x_max - x_min,
            h: y_max - y_min,
        }
    }

    /// Split into four equal quadrants: `[NW, NE, SE, SW]`.
    pub fn split(&self) -> [Rect; 4] {
        let half_w = self.w / 2.0;
        let half_h = self.h / 2.0;
        [
            Rect::new(self.x, self.y, half_w, half_h),
            Rect::new(self.x + half_w, self.y, half_w, half_h),
            Rect::new(self.x + half_w, self.y + half_h, half_w, half_h),
            Rect::new(self.x, self.y + half_h, half_w, half_h),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
