//! Background level assembly with a progress channel.
//!
//! Level builds run off the frame thread: a worker assembles the tiles, the
//! spatial index, and the entity roster, reporting integer progress
//! (0..=100, nothing else) through an unbounded channel. The frame thread
//! polls [`LevelBuildHandle::poll`] without blocking and swaps the finished
//! [`LoadedLevel`] in only when the worker is done.
//!
//! No locking is involved: the index is immutable once published, and all
//! per-frame mutation happens on the frame thread. There is no cancellation;
//! a worker always runs to completion even if the handle is dropped (its
//! sends just go nowhere).

use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, TryRecvError};

use subsurface_core::prelude::*;

use crate::level::{spawns_from_grid, tiles_from_grid, LevelOrigin, LevelPlan, TilePalette};
use crate::manager::EntityManager;
use crate::LoadError;

// ---------------------------------------------------------------------------
// LoadedLevel
// ---------------------------------------------------------------------------

/// Everything a level session needs, fully assembled off-thread.
#[derive(Debug)]
pub struct LoadedLevel {
    /// The immutable static index, built exactly once per level.
    pub index: SpatialIndex,
    /// The entity roster, player in slot 0.
    pub entities: EntityManager,
    /// The level's pixel origin.
    pub origin: LevelOrigin,
}

// ---------------------------------------------------------------------------
// Synchronous build
// ---------------------------------------------------------------------------

/// Assemble a level on the calling thread, reporting progress through
/// `report` at each stage boundary: 0 start, 20 tiles, 40 index, 60 spawns,
/// 80 roster, 100 done. On error the remaining stages never report.
pub fn build_level(
    plan: &LevelPlan,
    palette: &TilePalette,
    seed: u64,
    mut report: impl FnMut(u8),
) -> Result<LoadedLevel, LoadError> {
    report(0);

    let tiles = tiles_from_grid(&plan.tile_grid, plan.origin, palette)?;
    report(20);

    let index = SpatialIndex::build(tiles, DEFAULT_MAX_DEPTH);
    report(40);

    let spawns = spawns_from_grid(&plan.entity_grid, plan.origin)?;
    report(60);

    let entities = EntityManager::from_spawns(&spawns, seed)?;
    report(80);

    tracing::info!(
        tiles = index.len(),
        entities = entities.len(),
        "level assembled"
    );
    report(100);

    Ok(LoadedLevel {
        index,
        entities,
        origin: plan.origin,
    })
}

// ---------------------------------------------------------------------------
// Background build
// ---------------------------------------------------------------------------

/// Frame-thread view of an in-flight background build.
#[derive(Debug)]
pub struct LevelBuildHandle {
    progress: Receiver<u8>,
    result: Receiver<Result<LoadedLevel, LoadError>>,
    last_progress: u8,
}

/// Outcome of one non-blocking poll.
#[derive(Debug)]
pub enum LoadPoll {
    /// Still building; carries the latest reported percentage.
    Pending(u8),
    /// The worker finished (successfully or not). Terminal: the handle is
    /// spent once this is returned.
    Complete(Result<LoadedLevel, LoadError>),
}

impl LevelBuildHandle {
    /// Drain any queued progress reports and check for completion, without
    /// ever blocking the frame thread.
    pub fn poll(&mut self) -> LoadPoll {
        loop {
            match self.progress.try_recv() {
                Ok(pct) => self.last_progress = pct,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        match self.result.try_recv() {
            Ok(result) => LoadPoll::Complete(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                LoadPoll::Pending(self.last_progress)
            }
        }
    }

    /// The most recent progress percentage seen by [`poll`](Self::poll).
    pub fn progress(&self) -> u8 {
        self.last_progress
    }
}

/// Spawn a worker thread that assembles the level and hands it back through
/// the returned handle.
pub fn build_level_async(plan: LevelPlan, palette: TilePalette, seed: u64) -> LevelBuildHandle {
    let (progress_tx, progress_rx) = unbounded();
    let (result_tx, result_rx) = bounded(1);

    thread::spawn(move || {
        let result = build_level(&plan, &palette, seed, |pct| {
            // The receiver may be gone; the worker finishes regardless.
            let _ = progress_tx.send(pct);
        });
        if let Err(err) = &result {
            tracing::warn!(error = %err, "level build failed");
        }
        let _ = result_tx.send(result);
    });

    LevelBuildHandle {
        progress: progress_rx,
        result: result_rx,
        last_progress: 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
