//! Core primitives.
//!
//! Lane geometry, the spawn random source and state hashing. Nothing here
//! knows about runs, players or obstacles.

pub mod lane;
pub mod rng;
pub mod hash;

// Re-export core types
pub use lane::{Lane, LANE_WIDTH, LANE_COUNT};
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher, compute_state_hash};
