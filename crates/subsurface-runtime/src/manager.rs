//! Ordered entity collection with per-frame update and removal.
//!
//! The manager owns every dynamic entity of a level. Slot 0 is always the
//! player; remnants and debris follow in spawn order. Each frame the player
//! updates first (it consumes the input), then the rest update against the
//! player, and whatever reports itself dead is removed -- remnants bursting
//! into debris on the way out.
//!
//! All gameplay randomness (burst impulses, lifetimes, initial facings)
//! comes from one seeded [`Pcg32`], so a given seed and input sequence
//! replays identically.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use subsurface_core::prelude::*;

use crate::entity::{ControlFrame, Debris, Entity, LevelEvent, Player, Remnant};
use crate::level::{Spawn, SpawnKind};
use crate::LoadError;

/// Particles per remnant death burst.
pub const DEBRIS_PER_BURST: usize = 20;

// ---------------------------------------------------------------------------
// EntityManager
// ---------------------------------------------------------------------------

/// Owns and updates the level's dynamic entities.
#[derive(Debug)]
pub struct EntityManager {
    /// Slot 0 is the player; everything else follows in spawn order.
    entities: Vec<Entity>,
    rng: Pcg32,
}

impl EntityManager {
    /// Build the roster from spawn records. The player spawn (validated
    /// upstream to exist exactly once) lands in slot 0 regardless of grid
    /// order; remnant facings are drawn from the seeded RNG.
    pub fn from_spawns(spawns: &[Spawn], seed: u64) -> Result<Self, LoadError> {
        let mut rng = Pcg32::seed_from_u64(seed);

        let player = spawns
            .iter()
            .find(|spawn| spawn.kind == SpawnKind::Player)
            .map(|spawn| Player::new(spawn.position))
            .ok_or(LoadError::MissingPlayer)?;

        let mut entities = vec![Entity::Player(player)];
        for spawn in spawns {
            match spawn.kind {
                SpawnKind::Player => {}
                SpawnKind::SmallRemnant | SpawnKind::BigRemnant => {
                    let facing = if rng.gen_bool(0.5) {
                        Facing::Left
                    } else {
                        Facing::Right
                    };
                    entities.push(Entity::Remnant(Remnant::new(spawn.position, facing)));
                }
            }
        }

        tracing::debug!(entities = entities.len(), seed, "entity roster built");
        Ok(Self { entities, rng })
    }

    /// Advance every entity one frame against the shared static index.
    ///
    /// Update order is fixed: player first, then the rest in roster order.
    /// Dead remnants burst into debris at their center; dead debris just
    /// disappears. Returns the events the player raised.
    pub fn update(
        &mut self,
        dt: f32,
        substeps: u32,
        index: &SpatialIndex,
        input: &ControlFrame,
    ) -> Vec<LevelEvent> {
        let (head, tail) = self.entities.split_at_mut(1);
        let player = match &mut head[0] {
            Entity::Player(player) => player,
            _ => unreachable!("slot 0 holds the player"),
        };

        let events = player.update(dt, substeps, index, input);

        let mut dead = Vec::new();
        let mut bursts = Vec::new();
        for (offset, entity) in tail.iter_mut().enumerate() {
            let alive = match entity {
                Entity::Player(_) => unreachable!("only slot 0 holds a player"),
                Entity::Remnant(remnant) => {
                    let alive = remnant.update(dt, substeps, index, player);
                    if !alive {
                        bursts.push(remnant.center());
                    }
                    alive
                }
                Entity::Debris(debris) => debris.update(dt, substeps, index),
            };
            if !alive {
                dead.push(offset + 1);
            }
        }

        // Remove back-to-front so earlier indices stay valid.
        for slot in dead.into_iter().rev() {
            self.entities.remove(slot);
        }

        for center in bursts {
            self.spawn_debris_burst(center, dt);
        }

        events
    }

    /// Scatter a burst of short-lived debris from `center`, the way a dying
    /// remnant sheds particles. Impulse components are uniform in
    /// +-3.5 per frame (scaled up by 1/dt into a force), lifetimes uniform
    /// in 20..=35.
    pub fn spawn_debris_burst(&mut self, center: Vec2, dt: f32) {
        for _ in 0..DEBRIS_PER_BURST {
            let size = self.rng.gen_range(3..=6) as f32;
            let impulse = Vec2::new(
                self.rng.gen_range(-3.5f32..=3.5) / dt,
                self.rng.gen_range(-3.5f32..=3.5) / dt,
            );
            let ttl = self.rng.gen_range(20..=35) as f32;
            self.entities
                .push(Entity::Debris(Debris::new(center, size, impulse, ttl)));
        }
        tracing::debug!(x = center.x, y = center.y, "debris burst");
    }

    /// The player (always slot 0).
    pub fn player(&self) -> &Player {
        match &self.entities[0] {
            Entity::Player(player) => player,
            _ => unreachable!("slot 0 holds the player"),
        }
    }

    /// Mutable access to the player.
    pub fn player_mut(&mut self) -> &mut Player {
        match &mut self.entities[0] {
            Entity::Player(player) => player,
            _ => unreachable!("slot 0 holds the player"),
        }
    }

    /// All entities in roster order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of live entities (player included).
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Never true: the player is permanent.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Embodied, Positioned, MAX_HEALTH};
    use crate::level::{PLAYER_SIZE, REMNANT_SIZE};

    const DT: f32 = 1.0 / 60.0;

    fn floor_index() -> SpatialIndex {
        let tiles: Vec<Tile> = (0..16)
            .map(|i| Tile::new(Rect::new(i as f32 * 16.0, 64.0, 16.0, 16.0), 1))
            .collect();
        SpatialIndex::build(tiles, DEFAULT_MAX_DEPTH)
    }

    fn roster(spawns: &[Spawn]) -> EntityManager {
        EntityManager::from_spawns(spawns, 7).unwrap()
    }

    #[test]
    fn player_lands_in_slot_zero_regardless_of_grid_order() {
        let spawns = [
            Spawn {
                kind: SpawnKind::SmallRemnant,
                position: Vec2::new(96.0, 64.0 - REMNANT_SIZE.y),
            },
            Spawn {
                kind: SpawnKind::Player,
                position: Vec2::new(8.0, 64.0 - PLAYER_SIZE.y),
            },
        ];
        let manager = roster(&spawns);
        assert_eq!(manager.len(), 2);
        assert!(manager.entities()[0].as_player().is_some());
    }

    #[test]
    fn spawns_without_player_are_rejected() {
        let spawns = [Spawn {
            kind: SpawnKind::BigRemnant,
            position: Vec2::ZERO,
        }];
        assert!(matches!(
            EntityManager::from_spawns(&spawns, 0),
            Err(LoadError::MissingPlayer)
        ));
    }

    #[test]
    fn update_runs_the_whole_roster() {
        let spawns = [
            Spawn {
                kind: SpawnKind::Player,
                position: Vec2::new(8.0, 0.0),
            },
            Spawn {
                kind: SpawnKind::SmallRemnant,
                position: Vec2::new(200.0, 0.0),
            },
        ];
        let index = floor_index();
        let mut manager = roster(&spawns);
        for _ in 0..120 {
            manager.update(DT, SUBSTEPS, &index, &ControlFrame::default());
        }
        // Both fell onto the floor.
        assert!(manager.player().body().contact.down);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn dead_remnant_bursts_into_debris() {
        let index = floor_index();
        let spawns = [
            Spawn {
                kind: SpawnKind::Player,
                position: Vec2::new(8.0, 64.0 - PLAYER_SIZE.y),
            },
            Spawn {
                kind: SpawnKind::SmallRemnant,
                position: Vec2::new(40.0, 64.0 - REMNANT_SIZE.y),
            },
        ];
        let mut manager = roster(&spawns);

        // Attack every frame until the remnant dies.
        let input = ControlFrame {
            attack: true,
            ..Default::default()
        };
        let mut burst_seen = false;
        for _ in 0..20 {
            manager.update(DT, SUBSTEPS, &index, &input);
            let remnants = manager
                .entities()
                .iter()
                .filter(|e| matches!(e, Entity::Remnant(_)))
                .count();
            if remnants == 0 {
                burst_seen = true;
                break;
            }
        }
        assert!(burst_seen, "remnant never died");
        let debris = manager
            .entities()
            .iter()
            .filter(|e| matches!(e, Entity::Debris(_)))
            .count();
        assert_eq!(debris, DEBRIS_PER_BURST);
    }

    #[test]
    fn debris_eventually_clears_out() {
        let index = floor_index();
        let spawns = [Spawn {
            kind: SpawnKind::Player,
            position: Vec2::new(8.0, 64.0 - PLAYER_SIZE.y),
        }];
        let mut manager = roster(&spawns);
        manager.spawn_debris_burst(Vec2::new(64.0, 32.0), DT);
        assert_eq!(manager.len(), 1 + DEBRIS_PER_BURST);

        // Max ttl 35 decaying at 1/6 per frame: everything is gone well
        // within 300 frames.
        for _ in 0..300 {
            manager.update(DT, SUBSTEPS, &index, &ControlFrame::default());
        }
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn same_seed_replays_identically() {
        let index = floor_index();
        let spawns = [
            Spawn {
                kind: SpawnKind::Player,
                position: Vec2::new(8.0, 0.0),
            },
            Spawn {
                kind: SpawnKind::SmallRemnant,
                position: Vec2::new(120.0, 0.0),
            },
        ];

        let run = |seed: u64| -> Vec<(f32, f32)> {
            let mut manager = EntityManager::from_spawns(&spawns, seed).unwrap();
            let input = ControlFrame {
                move_right: true,
                ..Default::default()
            };
            for _ in 0..120 {
                manager.update(DT, SUBSTEPS, &index, &input);
            }
            manager
                .entities()
                .iter()
                .map(|e| {
                    let p = e.rect().position();
                    (p.x, p.y)
                })
                .collect()
        };

        assert_eq!(run(42), run(42), "same seed must replay identically");
    }

    #[test]
    fn player_health_survives_contact_with_grace() {
        let index = floor_index();
        let spawns = [
            Spawn {
                kind: SpawnKind::Player,
                position: Vec2::new(40.0, 64.0 - PLAYER_SIZE.y),
            },
            Spawn {
                kind: SpawnKind::SmallRemnant,
                position: Vec2::new(44.0, 64.0 - REMNANT_SIZE.y),
            },
        ];
        let mut manager = roster(&spawns);
        // Several frames of standing contact: only the first hit lands
        // inside the grace window.
        for _ in 0..10 {
            manager.update(DT, SUBSTEPS, &index, &ControlFrame::default());
        }
        assert_eq!(manager.player().health, MAX_HEALTH - 20);
    }
}
