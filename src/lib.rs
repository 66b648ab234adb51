//! # Lane Runner
//!
//! Deterministic simulation core for a three-lane endless runner.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        LANE RUNNER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Xorshift128+ PRNG, SpawnRng seam          │
//! │  ├── hash.rs     - State hashing for verification            │
//! │  └── clock.rs    - Frame deltas, fixed-step accumulator      │
//! │                                                              │
//! │  game/           - Simulation                                │
//! │  ├── config.rs   - Tuning and JSON overrides                 │
//! │  ├── state.rs    - Session, character, obstacles, coins      │
//! │  ├── input.rs    - Input mapping, queue, recordings          │
//! │  ├── physics.rs  - Jump integrator                           │
//! │  ├── spawner.rs  - Spawning, movement, pruning               │
//! │  ├── collision.rs- Hitbox tests                              │
//! │  ├── tick.rs     - Per-frame pipeline and replay             │
//! │  ├── events.rs   - Game events and sound cues                │
//! │  └── session.rs  - Facade for the presentation layer         │
//! │                                                              │
//! │  highscore.rs    - High score persistence                    │
//! │                                                              │
//! │  host/           - Async hosting (non-deterministic)         │
//! │  └── driver.rs   - tokio frame loop                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Given the same seed, the same commands at the same ticks and the same
//! elapsed times, `game/` produces bit-identical state on every run:
//! - Entity collections keep spawn order
//! - All randomness comes from the seeded Xorshift128+
//! - No wall-clock reads inside the tick
//!
//! The session clock and the frame driver are the only places that look
//! at real time.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod highscore;
pub mod host;

// Re-export commonly used types
pub use core::rng::{DeterministicRng, ScriptedRng, SpawnRng};
pub use game::config::GameConfig;
pub use game::session::GameSession;
pub use game::state::{SessionSnapshot, SessionState, SessionStatus};
pub use highscore::{FileHighScore, HighScoreStore, MemoryHighScore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Frame rate the tuning is calibrated for (Hz)
pub const REFERENCE_FRAME_RATE: u32 = 60;
