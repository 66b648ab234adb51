//! Game Events
//!
//! Events generated during simulation, for the presentation layer,
//! the sound collaborator and replay logs.

use serde::{Serialize, Deserialize};
use crate::game::state::{EntityId, ObstacleKind};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A run started (fresh start or restart).
    SessionStarted {
        /// Seed driving this run's spawns.
        seed: u64,
    },

    /// Character left the ground.
    Jumped,

    /// Character touched down after a jump.
    Landed,

    /// Character switched lanes.
    LaneChanged {
        /// Lane before the move.
        from: u8,
        /// Lane after the move.
        to: u8,
    },

    /// Slide started or ended.
    SlideChanged {
        /// New sliding flag.
        sliding: bool,
    },

    /// Obstacle appeared at the far edge.
    ObstacleSpawned {
        /// Obstacle id.
        id: EntityId,
        /// Barrier or train.
        kind: ObstacleKind,
        /// Lane index.
        lane: u8,
    },

    /// Coin appeared at the far edge.
    CoinSpawned {
        /// Coin id.
        id: EntityId,
        /// Lane index.
        lane: u8,
    },

    /// Coin picked up.
    CoinCollected {
        /// Coin id.
        id: EntityId,
        /// Coins added.
        value: u32,
        /// Coin total after pickup.
        total: u32,
    },

    /// Character hit an obstacle.
    Crashed {
        /// Obstacle that was hit.
        obstacle_id: EntityId,
        /// Its kind.
        kind: ObstacleKind,
        /// Lane it happened in.
        lane: u8,
    },

    /// Run paused.
    Paused,

    /// Run resumed.
    Resumed,

    /// Run ended.
    GameOver {
        /// Displayed (floored) score.
        final_score: u64,
        /// Coins collected.
        coins: u32,
    },
}

/// A game event stamped with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Create session started event.
    pub fn session_started(tick: u64, seed: u64) -> Self {
        Self::new(tick, GameEventData::SessionStarted { seed })
    }

    /// Create lane changed event.
    pub fn lane_changed(tick: u64, from: u8, to: u8) -> Self {
        Self::new(tick, GameEventData::LaneChanged { from, to })
    }

    /// Create obstacle spawned event.
    pub fn obstacle_spawned(tick: u64, id: EntityId, kind: ObstacleKind, lane: u8) -> Self {
        Self::new(tick, GameEventData::ObstacleSpawned { id, kind, lane })
    }

    /// Create coin collected event.
    pub fn coin_collected(tick: u64, id: EntityId, value: u32, total: u32) -> Self {
        Self::new(tick, GameEventData::CoinCollected { id, value, total })
    }

    /// Create crash event.
    pub fn crashed(tick: u64, obstacle_id: EntityId, kind: ObstacleKind, lane: u8) -> Self {
        Self::new(tick, GameEventData::Crashed { obstacle_id, kind, lane })
    }

    /// Create game over event.
    pub fn game_over(tick: u64, final_score: u64, coins: u32) -> Self {
        Self::new(tick, GameEventData::GameOver { final_score, coins })
    }

    /// Sound this event should trigger, if any.
    pub fn sound(&self) -> Option<SoundEvent> {
        match self.data {
            GameEventData::Jumped => Some(SoundEvent::Jump),
            GameEventData::CoinCollected { .. } => Some(SoundEvent::Coin),
            GameEventData::Crashed { .. } => Some(SoundEvent::Crash),
            _ => None,
        }
    }
}

/// Sounds the core asks the audio layer to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEvent {
    /// Jump started.
    Jump,
    /// Coin collected.
    Coin,
    /// Obstacle hit.
    Crash,
}

impl SoundEvent {
    /// Name used by the audio layer.
    pub fn name(self) -> &'static str {
        match self {
            SoundEvent::Jump => "jump",
            SoundEvent::Coin => "coin",
            SoundEvent::Crash => "crash",
        }
    }
}

impl std::fmt::Display for SoundEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
