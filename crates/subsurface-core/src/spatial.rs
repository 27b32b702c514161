//! Adaptive quadtree over a static tile set.
//!
//! The [`SpatialIndex`] is built exactly once per level from the full static
//! tile list and is immutable afterwards; it is rebuilt only on level
//! (re)load, never mid-frame. Two consumers share it every frame: collision
//! resolution queries it with body hitboxes, and the view culler queries it
//! with the viewport rectangle.
//!
//! # Storage
//!
//! Tiles live once in an arena (`Vec<Tile>`); tree nodes hold `u32` slot
//! lists into that arena. A tile whose extent crosses a node's center line on
//! one axis is pushed into every child quadrant it overlaps, so the same slot
//! can appear in several subtrees. Queries dedupe by slot (sort + dedup),
//! which also gives results a deterministic iteration order: ascending arena
//! slot. Consumers may rely on that order.
//!
//! # Subdivision
//!
//! A node subdivides around the geometric midpoint of its boundary. A tile
//! overlapping all four quadrants stays at the node; otherwise it descends
//! into each overlapping quadrant. Children inherit the quadrant rectangle as
//! their boundary verbatim (it is not recomputed from the tile subset), with
//! one less level of subdivision budget. The budget bounds the worst case:
//! degenerate clustering degrades to the leaf's linear scan, never to
//! unbounded recursion.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::rect::Rect;

/// Subdivision budget used at the level-load seam.
pub const DEFAULT_MAX_DEPTH: u8 = 8;

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// An immutable static item in the index: a rectangle plus an integer id.
///
/// The id carries tile semantics (wall, hazard, level-transition marker) and
/// is consumed by game logic; the index itself never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// The tile's extent in world coordinates.
    pub rect: Rect,
    /// Semantic id, opaque to the index.
    pub id: u32,
}

impl Tile {
    /// Construct a tile.
    #[inline]
    pub fn new(rect: Rect, id: u32) -> Self {
        Self { rect, id }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

// Quadrant order matches `Rect::split`.
const NW: usize = 0;
const NE: usize = 1;
const SE: usize = 2;
const SW: usize = 3;

#[derive(Debug)]
struct Node {
    center: Vec2,
    /// Slots that stay at this node: leaves keep everything, interior nodes
    /// keep only tiles overlapping all four quadrants.
    items: Vec<u32>,
    children: [Option<Box<Node>>; 4],
}

impl Node {
    /// Recursively partition `slots` within `boundary`. `depth` is the
    /// remaining subdivision budget, consumed once per level.
    fn build(tiles: &[Tile], slots: Vec<u32>, boundary: Rect, depth: u8) -> Node {
        let center = boundary.center();
        let depth = depth.saturating_sub(1);

        if depth == 0 {
            return Node {
                center,
                items: slots,
                children: [None, None, None, None],
            };
        }

        let mut kept = Vec::new();
        let mut quadrant_slots: [Vec<u32>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];

        for slot in slots {
            let rect = tiles[slot as usize].rect;
            let west = rect.x <= center.x;
            let east = rect.right() >= center.x;
            let north = rect.y <= center.y;
            let south = rect.bottom() >= center.y;

            let in_nw = west && north;
            let in_ne = east && north;
            let in_se = east && south;
            let in_sw = west && south;

            if in_nw && in_ne && in_se && in_sw {
                // Spans the center on both axes: keep at this node instead of
                // duplicating into every subtree.
                kept.push(slot);
            } else {
                if in_nw {
                    quadrant_slots[NW].push(slot);
                }
                if in_ne {
                    quadrant_slots[NE].push(slot);
                }
                if in_se {
                    quadrant_slots[SE].push(slot);
                }
                if in_sw {
                    quadrant_slots[SW].push(slot);
                }
            }
        }

        let quarters = boundary.split();
        let mut children: [Option<Box<Node>>; 4] = [None, None, None, None];
        for (quadrant, slots) in quadrant_slots.into_iter().enumerate() {
            if !slots.is_empty() {
                children[quadrant] = Some(Box::new(Node::build(
                    tiles,
                    slots,
                    quarters[quadrant],
                    depth,
                )));
            }
        }

        Node {
            center,
            items: kept,
            children,
        }
    }

    /// Accumulate the slots of every tile overlapping `query` into `out`.
    /// May push duplicates; the caller dedupes.
    fn collect_hits(&self, tiles: &[Tile], query: &Rect, out: &mut Vec<u32>) {
        for &slot in &self.items {
            if query.overlaps(&tiles[slot as usize].rect) {
                out.push(slot);
            }
        }

        // Descend only into quadrants the query could reach, mirroring the
        // predicates used to distribute tiles at build time.
        let (cx, cy) = (self.center.x, self.center.y);
        if let Some(nw) = &self.children[NW] {
            if query.x <= cx && query.y <= cy {
                nw.collect_hits(tiles, query, out);
            }
        }
        if let Some(ne) = &self.children[NE] {
            if query.right() >= cx && query.y <= cy {
                ne.collect_hits(tiles, query, out);
            }
        }
        if let Some(se) = &self.children[SE] {
            if query.right() >= cx && query.bottom() >= cy {
                se.collect_hits(tiles, query, out);
            }
        }
        if let Some(sw) = &self.children[SW] {
            if query.x <= cx && query.bottom() >= cy {
                sw.collect_hits(tiles, query, out);
            }
        }
    }

    /// Early-exit occupancy test: true as soon as any overlapping tile is
    /// found.
    fn any_hit(&self, tiles: &[Tile], query: &Rect) -> bool {
        if self
            .items
            .iter()
            .any(|&slot| query.overlaps(&tiles[slot as usize].rect))
        {
            return true;
        }

        let (cx, cy) = (self.center.x, self.center.y);
        if let Some(nw) = &self.children[NW] {
            if query.x <= cx && query.y <= cy && nw.any_hit(tiles, query) {
                return true;
            }
        }
        if let Some(ne) = &self.children[NE] {
            if query.right() >= cx && query.y <= cy && ne.any_hit(tiles, query) {
                return true;
            }
        }
        if let Some(se) = &self.children[SE] {
            if query.right() >= cx && query.bottom() >= cy && se.any_hit(tiles, query) {
                return true;
            }
        }
        if let Some(sw) = &self.children[SW] {
            if query.x <= cx && query.bottom() >= cy && sw.any_hit(tiles, query) {
                return true;
            }
        }
        false
    }
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

/// Immutable quadtree over a static tile set.
///
/// Balanced partitioning yields average-case sub-linear query cost versus the
/// tile count; the worst case is the leaf's linear scan, bounded by the
/// subdivision budget.
#[derive(Debug)]
pub struct SpatialIndex {
    tiles: Vec<Tile>,
    root: Option<Node>,
    max_depth: u8,
}

impl SpatialIndex {
    /// Build the index from the full static tile set.
    ///
    /// The root boundary is the left fold of `union` over every tile
    /// rectangle. An empty tile list yields a valid empty index (queries
    /// return nothing), not an error.
    pub fn build(tiles: Vec<Tile>, max_depth: u8) -> Self {
        let root = if tiles.is_empty() {
            None
        } else {
            let boundary = tiles[1..]
                .iter()
                .fold(tiles[0].rect, |acc, tile| acc.union(&tile.rect));
            let slots: Vec<u32> = (0..tiles.len() as u32).collect();
            Some(Node::build(&tiles, slots, boundary, max_depth))
        };

        tracing::debug!(
            tiles = tiles.len(),
            max_depth,
            "built spatial index"
        );

        Self {
            tiles,
            root,
            max_depth,
        }
    }

    /// Every tile overlapping `query`, deduplicated, in ascending-slot order.
    ///
    /// Equivalent to a brute-force scan of the whole tile set: straddling
    /// tiles reachable through several subtrees are reported once. A query
    /// outside every boundary returns an empty vec.
    pub fn hit(&self, query: &Rect) -> Vec<&Tile> {
        self.hit_slots(query)
            .into_iter()
            .map(|slot| &self.tiles[slot as usize])
            .collect()
    }

    /// Like [`hit`](Self::hit), but returns arena slots. Suitable for
    /// consumers that hold results across frames (e.g. the view culler)
    /// without borrowing the index.
    pub fn hit_slots(&self, query: &Rect) -> Vec<u32> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.collect_hits(&self.tiles, query, &mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// True iff any tile overlaps `query`. Pure read with early exit; no
    /// allocation on the miss path beyond traversal.
    pub fn is_occupied(&self, query: &Rect) -> bool {
        self.root
            .as_ref()
            .is_some_and(|root| root.any_hit(&self.tiles, query))
    }

    /// The tile stored at `slot`.
    #[inline]
    pub fn tile(&self, slot: u32) -> &Tile {
        &self.tiles[slot as usize]
    }

    /// All tiles in arena order.
    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Number of indexed tiles.
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True iff the index holds no tiles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The subdivision budget this index was built with.
    #[inline]
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
