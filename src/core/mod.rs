//! Core deterministic primitives.
//!
//! Everything the simulation needs that is not game-specific:
//! seeded randomness, state hashing and frame timing.

pub mod rng;
pub mod hash;
pub mod clock;

// Re-export core types
pub use rng::{DeterministicRng, ScriptedRng, SpawnRng};
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use clock::{FixedStep, SessionClock};
