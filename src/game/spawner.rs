//! Obstacle and Coin Spawning
//!
//! The track is populated lazily. A single watermark, the spawn frontier,
//! marks the farthest-ahead position already rolled. Forward is negative:
//! the player sits at `-distance_traveled`, and smaller offsets are
//! farther ahead.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::lane::Lane;
use crate::core::rng::DeterministicRng;

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for spawning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Length of one track segment
    pub segment_length: f32,
    /// Segments of content kept ahead of the player
    pub lookahead_segments: u32,
    /// Distance between spawn rolls
    pub spawn_interval: f32,
    /// Chance a roll places an obstacle
    pub obstacle_chance: f32,
    /// Chance a roll places a coin line (band after `obstacle_chance`)
    pub coin_chance: f32,
    /// Chance an obstacle roll also places a coin line in another lane
    pub escort_coin_chance: f32,
    /// Coins per line
    pub coin_group_size: u32,
    /// Longitudinal gap between coins in a line
    pub coin_spacing: f32,
    /// Height coins float at
    pub coin_height: f32,
    /// Frontier at the start of every run
    pub initial_frontier: f32,
    /// How far behind the player content survives
    pub despawn_margin: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            segment_length: 50.0,
            lookahead_segments: 3,
            spawn_interval: 15.0,
            obstacle_chance: 0.6,
            coin_chance: 0.4,
            escort_coin_chance: 0.5,
            coin_group_size: 3,
            coin_spacing: 2.0,
            coin_height: 1.0,
            initial_frontier: -50.0,
            despawn_margin: 10.0,
        }
    }
}

impl SpawnConfig {
    /// Distance ahead of the player that is always populated.
    #[inline]
    pub fn lookahead(&self) -> f32 {
        self.segment_length * self.lookahead_segments as f32
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// Obstacle identifier, unique within one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

/// Coin identifier, unique within one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinId(pub u32);

/// What it takes to get past an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObstacleKind {
    /// Low barrier: jump over it
    Jump = 0,
    /// High barrier: slide under it
    Slide = 1,
    /// Full-height wall: change lanes
    Block = 2,
}

impl ObstacleKind {
    /// All kinds, in roll order.
    pub const ALL: [ObstacleKind; 3] = [ObstacleKind::Jump, ObstacleKind::Slide, ObstacleKind::Block];
}

/// An obstacle on the track. Never moves once placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Unique ID
    pub id: ObstacleId,
    /// Lane it blocks
    pub lane: Lane,
    /// Avoidance rule
    pub kind: ObstacleKind,
    /// Position along the track
    pub forward_offset: f32,
}

/// A coin on the track. Never moves once placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Unique ID
    pub id: CoinId,
    /// Lane it floats in
    pub lane: Lane,
    /// Position along the track
    pub forward_offset: f32,
    /// Height above the track
    pub height: f32,
}

// =============================================================================
// SPAWNER
// =============================================================================

/// Owns the live obstacles and coins and the spawn frontier.
#[derive(Clone, Debug)]
pub struct Spawner {
    config: SpawnConfig,
    rng: DeterministicRng,
    obstacles: Vec<Obstacle>,
    coins: Vec<Coin>,
    frontier: f32,
    next_id: u32,
}

impl Spawner {
    /// Create a spawner with an unpredictable random source.
    pub fn new(config: SpawnConfig) -> Self {
        Self::with_rng(config, DeterministicRng::from_entropy())
    }

    /// Create a spawner that produces the same track for the same seed.
    pub fn with_seed(config: SpawnConfig, seed: u64) -> Self {
        Self::with_rng(config, DeterministicRng::new(seed))
    }

    /// Create a spawner around an existing random source.
    pub fn with_rng(config: SpawnConfig, rng: DeterministicRng) -> Self {
        let frontier = config.initial_frontier;
        Self {
            config,
            rng,
            obstacles: Vec::new(),
            coins: Vec::new(),
            frontier,
            next_id: 0,
        }
    }

    /// Spawn config.
    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Seed of the random source.
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Current spawn frontier.
    pub fn frontier(&self) -> f32 {
        self.frontier
    }

    /// Live obstacles, in spawn order.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Live coins, in spawn order.
    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    /// Fill the look-ahead window and drop what fell behind.
    ///
    /// `player_offset` is the player's forward offset, i.e. the negated
    /// distance traveled.
    pub fn advance(&mut self, player_offset: f32) {
        let lookahead = self.config.lookahead();

        while self.frontier > player_offset - lookahead {
            let next = self.frontier - self.config.spawn_interval;
            if !(next < self.frontier) {
                warn!(
                    "Spawn interval {} cannot move the frontier at {}",
                    self.config.spawn_interval, self.frontier
                );
                break;
            }
            self.frontier = next;
            self.roll_step();
        }

        let cutoff = player_offset + self.config.despawn_margin;
        let before = (self.obstacles.len(), self.coins.len());
        self.obstacles.retain(|o| o.forward_offset < cutoff);
        self.coins.retain(|c| c.forward_offset < cutoff);

        let dropped = (before.0 - self.obstacles.len(), before.1 - self.coins.len());
        if dropped != (0, 0) {
            debug!(
                "Despawned {} obstacles and {} coins behind {:.1}",
                dropped.0, dropped.1, cutoff
            );
        }
    }

    /// Remove a coin (after it was collected).
    pub fn remove_coin(&mut self, id: CoinId) -> Option<Coin> {
        let idx = self.coins.iter().position(|c| c.id == id)?;
        Some(self.coins.remove(idx))
    }

    /// Remove an obstacle.
    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let idx = self.obstacles.iter().position(|o| o.id == id)?;
        Some(self.obstacles.remove(idx))
    }

    /// Clear everything and rewind the frontier for a new run.
    ///
    /// The random source keeps its position, so consecutive runs differ.
    pub fn reset(&mut self) {
        self.obstacles.clear();
        self.coins.clear();
        self.frontier = self.config.initial_frontier;
        self.next_id = 0;
    }

    /// Draw a seed for a later run from the current random source.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Reset and restart the random source from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = DeterministicRng::new(seed);
        self.reset();
    }

    /// One spawn decision at the current frontier.
    fn roll_step(&mut self) {
        let roll = self.rng.next_f32();

        if roll < self.config.obstacle_chance {
            let lane = self.random_lane();
            let kind = self.rng.choose(&ObstacleKind::ALL).copied().unwrap_or(ObstacleKind::Block);
            let id = ObstacleId(self.alloc_id());
            self.obstacles.push(Obstacle {
                id,
                lane,
                kind,
                forward_offset: self.frontier,
            });

            if self.rng.next_f32() < self.config.escort_coin_chance {
                let coin_lane = self.rng.choose(&lane.others()).copied().unwrap_or_default();
                self.place_coin_line(coin_lane);
            }
        } else if roll < self.config.obstacle_chance + self.config.coin_chance {
            let lane = self.random_lane();
            self.place_coin_line(lane);
        }
    }

    // The line runs along decreasing offset and ends on the frontier, so
    // nothing is placed beyond it.
    fn place_coin_line(&mut self, lane: Lane) {
        let count = self.config.coin_group_size;
        for i in 0..count {
            let id = CoinId(self.alloc_id());
            let forward_offset = self.frontier + (count - 1 - i) as f32 * self.config.coin_spacing;
            self.coins.push(Coin {
                id,
                lane,
                forward_offset,
                height: self.config.coin_height,
            });
        }
    }

    fn random_lane(&mut self) -> Lane {
        self.rng.choose(&Lane::ALL).copied().unwrap_or_default()
    }

    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seeded(seed: u64) -> Spawner {
        Spawner::with_seed(SpawnConfig::default(), seed)
    }

    #[test]
    fn test_first_advance_fills_lookahead() {
        let mut spawner = seeded(1);
        spawner.advance(0.0);

        // -50 stepped by 15 until <= -150: -65, -80, ..., -155
        assert_eq!(spawner.frontier(), -155.0);
        assert!(spawner.frontier() <= -spawner.config().lookahead());
        assert!(!spawner.obstacles().is_empty() || !spawner.coins().is_empty());
    }

    #[test]
    fn test_advance_is_idempotent_without_movement() {
        let mut spawner = seeded(2);
        spawner.advance(-20.0);
        let obstacles = spawner.obstacles().to_vec();
        let coins = spawner.coins().to_vec();
        let frontier = spawner.frontier();

        spawner.advance(-20.0);
        assert_eq!(spawner.obstacles(), &obstacles[..]);
        assert_eq!(spawner.coins(), &coins[..]);
        assert_eq!(spawner.frontier(), frontier);
    }

    #[test]
    fn test_coin_lines() {
        let mut spawner = seeded(3);
        spawner.advance(-500.0);

        let coins = spawner.coins();
        assert_eq!(coins.len() % 3, 0);
        for line in coins.chunks(3) {
            assert!(line.iter().all(|c| c.lane == line[0].lane));
            assert_eq!(line[0].forward_offset - line[1].forward_offset, 2.0);
            assert_eq!(line[1].forward_offset - line[2].forward_offset, 2.0);
            assert!(line.iter().all(|c| c.height == 1.0));
        }
    }

    #[test]
    fn test_escort_coins_avoid_obstacle_lane() {
        let mut spawner = seeded(4);
        spawner.advance(-3000.0);

        for obstacle in spawner.obstacles() {
            for coin in spawner.coins() {
                // escort line ends on the obstacle's offset
                let same_step = coin.forward_offset >= obstacle.forward_offset
                    && coin.forward_offset < obstacle.forward_offset + spawner.config().spawn_interval;
                if same_step {
                    assert_ne!(coin.lane, obstacle.lane);
                }
            }
        }
    }

    #[test]
    fn test_despawn_behind_player() {
        let mut spawner = seeded(5);
        spawner.advance(0.0);
        let first_ids: Vec<_> = spawner.obstacles().iter().map(|o| o.id).collect();

        spawner.advance(-1000.0);
        for o in spawner.obstacles() {
            assert!(o.forward_offset < -990.0);
            assert!(!first_ids.contains(&o.id));
        }
        for c in spawner.coins() {
            assert!(c.forward_offset < -990.0);
        }
    }

    #[test]
    fn test_ids_unique_and_reset() {
        let mut spawner = seeded(6);
        spawner.advance(-800.0);

        let mut ids: Vec<u32> = spawner.obstacles().iter().map(|o| o.id.0)
            .chain(spawner.coins().iter().map(|c| c.id.0))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);

        spawner.reset();
        spawner.advance(0.0);
        let min_id = spawner.obstacles().iter().map(|o| o.id.0)
            .chain(spawner.coins().iter().map(|c| c.id.0))
            .min();
        assert_eq!(min_id, Some(1));
    }

    #[test]
    fn test_remove_coin() {
        let mut spawner = seeded(7);
        spawner.advance(-300.0);
        let id = spawner.coins()[0].id;

        assert!(spawner.remove_coin(id).is_some());
        assert!(spawner.coins().iter().all(|c| c.id != id));
        assert!(spawner.remove_coin(id).is_none());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut spawner = seeded(8);
        spawner.advance(-250.0);
        spawner.reset();

        assert!(spawner.obstacles().is_empty());
        assert!(spawner.coins().is_empty());
        assert_eq!(spawner.frontier(), SpawnConfig::default().initial_frontier);
    }

    #[test]
    fn test_same_seed_same_track() {
        let mut a = seeded(99);
        let mut b = seeded(99);
        a.advance(-400.0);
        b.advance(-400.0);
        assert_eq!(a.obstacles(), b.obstacles());
        assert_eq!(a.coins(), b.coins());
    }

    #[test]
    fn test_reseed_replays_track() {
        let mut spawner = seeded(10);
        spawner.advance(-400.0);
        let first = spawner.obstacles().to_vec();

        spawner.reseed(10);
        spawner.advance(-400.0);
        assert_eq!(spawner.obstacles(), &first[..]);
    }

    #[test]
    fn test_empty_band() {
        let config = SpawnConfig {
            obstacle_chance: 0.0,
            coin_chance: 0.0,
            ..SpawnConfig::default()
        };
        let mut spawner = Spawner::with_seed(config, 11);
        spawner.advance(-1000.0);
        assert!(spawner.obstacles().is_empty());
        assert!(spawner.coins().is_empty());
        assert!(spawner.frontier() <= -1150.0);
    }

    #[test]
    fn test_rolls_cover_every_kind_and_lane() {
        let config = SpawnConfig {
            lookahead_segments: 60,
            ..SpawnConfig::default()
        };
        let mut spawner = Spawner::with_seed(config, 14);
        spawner.advance(0.0);

        for kind in ObstacleKind::ALL {
            assert!(spawner.obstacles().iter().any(|o| o.kind == kind), "{:?} never spawned", kind);
        }
        for lane in Lane::ALL {
            assert!(spawner.obstacles().iter().any(|o| o.lane == lane), "{:?} never used", lane);
            assert!(spawner.coins().iter().any(|c| c.lane == lane), "{:?} has no coins", lane);
        }
    }

    #[test]
    fn test_tiny_interval_does_not_stall() {
        let config = SpawnConfig {
            spawn_interval: 1e-7,
            ..SpawnConfig::default()
        };
        let mut spawner = Spawner::with_seed(config, 12);
        spawner.advance(0.0);

        assert_eq!(spawner.frontier(), -50.0);
        assert!(spawner.obstacles().is_empty());
        assert!(spawner.coins().is_empty());
    }

    #[test]
    fn test_next_seed_varies() {
        let mut spawner = seeded(13);
        let a = spawner.next_seed();
        let b = spawner.next_seed();
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_live_items_within_window(
            seed in any::<u64>(),
            deltas in prop::collection::vec(0.0f32..40.0, 1..60),
        ) {
            let mut spawner = seeded(seed);
            let margin = spawner.config().despawn_margin;
            let lookahead = spawner.config().lookahead();
            let mut distance = 0.0f32;

            for delta in deltas {
                distance += delta;
                let player = -distance;
                spawner.advance(player);

                prop_assert!(spawner.frontier() <= player - lookahead);
                for o in spawner.obstacles() {
                    prop_assert!(o.forward_offset >= spawner.frontier());
                    prop_assert!(o.forward_offset < player + margin);
                }
                for c in spawner.coins() {
                    prop_assert!(c.forward_offset >= spawner.frontier());
                    prop_assert!(c.forward_offset < player + margin);
                }
            }
        }

        #[test]
        fn prop_reset_roundtrip(seed in any::<u64>(), distance in 0.0f32..5000.0) {
            let mut spawner = seeded(seed);
            spawner.advance(-distance);
            spawner.reset();

            prop_assert!(spawner.obstacles().is_empty());
            prop_assert!(spawner.coins().is_empty());
            prop_assert_eq!(spawner.frontier(), SpawnConfig::default().initial_frontier);
        }
    }
}
