//! Game Logic Module
//!
//! All simulation code for a run.
//!
//! ## Module Structure
//!
//! - `config`: Tuning constants and the loadable `GameConfig`
//! - `state`: Session state, character, obstacles, coins
//! - `input`: Raw input mapping, pending-command queue, recordings
//! - `physics`: Jump integrator
//! - `spawner`: Entity spawning, movement and pruning
//! - `collision`: Hitbox tests
//! - `tick`: Per-frame simulation pipeline and replay
//! - `events`: Game events and sound cues
//! - `session`: Facade used by the presentation layer

pub mod config;
pub mod state;
pub mod input;
pub mod physics;
pub mod spawner;
pub mod collision;
pub mod tick;
pub mod events;
pub mod session;

// Re-export key types
pub use config::{ConfigError, GameConfig};
pub use events::{GameEvent, GameEventData, SoundEvent};
pub use input::{Command, InputAction, InputRecording, InputSender, ReplayError};
pub use session::{GameSession, RunSummary, SessionId};
pub use state::{Character, Collectible, Obstacle, ObstacleKind, SessionSnapshot, SessionState, SessionStatus};
pub use tick::{replay_session, tick, TickResult};
