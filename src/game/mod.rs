//! Game Logic Module
//!
//! The per-frame simulation. Driven by a caller-supplied `dt`; no clocks,
//! no I/O.
//!
//! ## Module Structure
//!
//! - `input`: Commands, the per-tick command queue, input recordings
//! - `player`: Lane, jump and slide state machine
//! - `spawner`: Obstacle and coin spawning around the spawn frontier
//! - `collision`: Lane/depth overlap checks
//! - `events`: Run events for the view layer
//! - `run`: The run loop and run phases

pub mod input;
pub mod player;
pub mod spawner;
pub mod collision;
pub mod events;
pub mod run;

// Re-export key types
pub use input::{Command, BufferedAction, CommandQueue, InputRecording};
pub use player::{Player, PlayerConfig, PlayerPose, VerticalState};
pub use spawner::{Spawner, SpawnConfig, Obstacle, ObstacleKind, ObstacleId, Coin, CoinId};
pub use collision::{CollisionConfig, CollisionOutcome};
pub use events::{RunEvent, RunEventData};
pub use run::{RunLoop, RunConfig, RunPhase, RunProgress, RunSnapshot, TickResult, ConfigError, replay_run};
