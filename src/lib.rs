//! # Subway Runner Simulation
//!
//! Tick-driven simulation core for a three-lane endless runner: the player
//! dodges procedurally spawned obstacles by switching lanes, jumping or
//! sliding, and picks up coins for score.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SUBWAY RUNNER SIM                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── lane.rs     - Lanes and lateral offsets                 │
//! │  ├── rng.rs      - Seedable Xorshift128+ PRNG                │
//! │  └── hash.rs     - State hashing for replay checks           │
//! │                                                              │
//! │  game/           - Simulation (no I/O)                       │
//! │  ├── input.rs    - Commands, queue, recordings               │
//! │  ├── player.rs   - Lane/jump/slide state machine             │
//! │  ├── spawner.rs  - Obstacle and coin spawning                │
//! │  ├── collision.rs- Obstacle hits and coin pickups            │
//! │  ├── events.rs   - Run events                                │
//! │  └── run.rs      - Per-frame run loop                        │
//! │                                                              │
//! │  profile.rs      - Local best score, coins, settings         │
//! │  leaderboard.rs  - Score submission (async)                  │
//! │  session.rs      - Game-over handling                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The spawn source is unpredictable by default. Seeding it
//! ([`RunLoop::with_seed`]) makes a run reproducible on the same build and
//! platform given the same commands and frame deltas, which is what
//! [`game::run::replay_run`] relies on. Bit-exact results across platforms
//! are not a goal; the simulation uses `f32`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod profile;
pub mod leaderboard;
pub mod session;

// Re-export commonly used types
pub use core::lane::Lane;
pub use core::rng::DeterministicRng;
pub use game::input::{Command, InputRecording};
pub use game::run::{RunLoop, RunConfig, RunPhase, RunSnapshot, TickResult};
pub use profile::{ScoreStore, JsonFileStore, MemoryStore};
pub use leaderboard::{Leaderboard, InMemoryLeaderboard, ScoreSubmission};
pub use session::RunSession;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal frame rate (Hz) for fixed-step drivers
pub const TICK_RATE: u32 = 60;
