//! Run Events
//!
//! Emitted by the run loop for the view layer (sounds, HUD flashes) and for
//! logging.

use serde::{Serialize, Deserialize};

use crate::core::lane::Lane;
use crate::game::spawner::{CoinId, ObstacleId, ObstacleKind};
use crate::game::run::RunPhase;

/// Run event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RunEventData {
    /// Run phase changed
    PhaseChanged {
        /// Phase before the change
        from: RunPhase,
        /// Phase after the change
        to: RunPhase,
    },

    /// Player picked up a coin
    CoinCollected {
        /// Coin that was picked up
        coin_id: CoinId,
        /// Coins collected this run, including this one
        coins: u32,
        /// Score after the coin bonus
        new_score: u32,
    },

    /// Player ran into an obstacle; the run is over
    ObstacleHit {
        /// Obstacle that was hit
        obstacle_id: ObstacleId,
        /// Its kind
        kind: ObstacleKind,
        /// Lane it blocks
        lane: Lane,
        /// Distance traveled when it was hit
        distance: f32,
    },

    /// Speed reached its cap
    MaxSpeedReached {
        /// The capped speed
        speed: f32,
    },
}

/// A run event with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Event data
    pub data: RunEventData,
}

impl RunEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: RunEventData) -> Self {
        Self { tick, data }
    }

    /// Create phase changed event.
    pub fn phase_changed(tick: u32, from: RunPhase, to: RunPhase) -> Self {
        Self::new(tick, RunEventData::PhaseChanged { from, to })
    }

    /// Create coin collected event.
    pub fn coin_collected(tick: u32, coin_id: CoinId, coins: u32, new_score: u32) -> Self {
        Self::new(tick, RunEventData::CoinCollected { coin_id, coins, new_score })
    }

    /// Create obstacle hit event.
    pub fn obstacle_hit(
        tick: u32,
        obstacle_id: ObstacleId,
        kind: ObstacleKind,
        lane: Lane,
        distance: f32,
    ) -> Self {
        Self::new(
            tick,
            RunEventData::ObstacleHit {
                obstacle_id,
                kind,
                lane,
                distance,
            },
        )
    }

    /// Create max speed reached event.
    pub fn max_speed_reached(tick: u32, speed: f32) -> Self {
        Self::new(tick, RunEventData::MaxSpeedReached { speed })
    }

    /// Check if this event ended the run.
    pub fn ends_run(&self) -> bool {
        matches!(
            self.data,
            RunEventData::ObstacleHit { .. }
                | RunEventData::PhaseChanged { to: RunPhase::GameOver, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ends_run() {
        let hit = RunEvent::obstacle_hit(5, ObstacleId(1), ObstacleKind::Block, Lane::Center, 42.0);
        assert!(hit.ends_run());

        let over = RunEvent::phase_changed(5, RunPhase::Playing, RunPhase::GameOver);
        assert!(over.ends_run());

        let coin = RunEvent::coin_collected(5, CoinId(2), 1, 10);
        assert!(!coin.ends_run());

        let pause = RunEvent::phase_changed(5, RunPhase::Playing, RunPhase::Paused);
        assert!(!pause.ends_run());
    }

    #[test]
    fn test_event_serializes() {
        let event = RunEvent::coin_collected(3, CoinId(7), 2, 20);
        let json = serde_json::to_string(&event).unwrap();
        let back: RunEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
