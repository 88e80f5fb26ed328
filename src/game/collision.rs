//! Collision Resolution
//!
//! Coarse lane/depth checks, no 3D hit-testing. Stateless: everything is a
//! function of the live entities, the player pose and the player's forward
//! offset.

use serde::{Serialize, Deserialize};

use crate::game::player::PlayerPose;
use crate::game::spawner::{Coin, CoinId, Obstacle, ObstacleKind};

/// Collision thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Longitudinal window in which an obstacle can hit
    pub obstacle_window: f32,
    /// Lateral tolerance for an obstacle lane match
    pub lane_tolerance: f32,
    /// Longitudinal pickup radius for coins
    pub coin_radius: f32,
    /// Extra lateral slack for coins on top of the player radius
    pub coin_lane_slack: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            obstacle_window: 1.5,
            lane_tolerance: 0.1,
            coin_radius: 1.0,
            coin_lane_slack: 0.3,
        }
    }
}

/// Outcome of one collision pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionOutcome {
    /// The obstacle that ended the run, if any
    pub hit: Option<Obstacle>,
    /// Coins picked up this tick
    pub collected: Vec<CoinId>,
}

/// Check whether `obstacle` hits a player in `pose`.
///
/// Assumes the longitudinal window already matched.
#[inline]
pub fn obstacle_hits(obstacle: &Obstacle, pose: &PlayerPose) -> bool {
    match obstacle.kind {
        ObstacleKind::Jump => !pose.is_jumping,
        ObstacleKind::Slide => !pose.is_sliding,
        ObstacleKind::Block => true,
    }
}

/// Find the first obstacle the player runs into.
pub fn check_obstacles<'a>(
    obstacles: &'a [Obstacle],
    pose: &PlayerPose,
    player_offset: f32,
    config: &CollisionConfig,
) -> Option<&'a Obstacle> {
    let player_lane = pose.lane.offset();

    obstacles.iter().find(|obstacle| {
        (obstacle.forward_offset - player_offset).abs() <= config.obstacle_window
            && (obstacle.lane.offset() - player_lane).abs() <= config.lane_tolerance
            && obstacle_hits(obstacle, pose)
    })
}

/// Check if the player picks up `coin`.
pub fn coin_collected(
    coin: &Coin,
    pose: &PlayerPose,
    player_offset: f32,
    player_radius: f32,
    config: &CollisionConfig,
) -> bool {
    if (coin.forward_offset - player_offset).abs() > config.coin_radius {
        return false;
    }

    if (coin.lane.offset() - pose.lane.offset()).abs() > player_radius + config.coin_lane_slack {
        return false;
    }

    let (bottom, top) = pose.body_span();
    coin.height >= bottom && coin.height <= top
}

/// Every coin picked up this tick.
pub fn check_coins(
    coins: &[Coin],
    pose: &PlayerPose,
    player_offset: f32,
    player_radius: f32,
    config: &CollisionConfig,
) -> Vec<CoinId> {
    coins
        .iter()
        .filter(|coin| coin_collected(coin, pose, player_offset, player_radius, config))
        .map(|coin| coin.id)
        .collect()
}

/// Run both checks.
pub fn resolve(
    obstacles: &[Obstacle],
    coins: &[Coin],
    pose: &PlayerPose,
    player_offset: f32,
    player_radius: f32,
    config: &CollisionConfig,
) -> CollisionOutcome {
    CollisionOutcome {
        hit: check_obstacles(obstacles, pose, player_offset, config).cloned(),
        collected: check_coins(coins, pose, player_offset, player_radius, config),
    }
}
