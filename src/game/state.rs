//! Game State Definitions
//!
//! All state types for a run. Entity collections are plain `Vec`s kept
//! in spawn order, so iteration order is deterministic.

use serde::{Serialize, Deserialize};

use crate::core::clock::FixedStep;
use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::core::rng::DeterministicRng;
use crate::game::config::{GameConfig, LANE_COUNT, START_LANE};
use crate::game::events::GameEvent;

/// Identifier for obstacles and coins. Strictly increasing per run.
pub type EntityId = u32;

/// Highest valid lane index.
pub const MAX_LANE: u8 = LANE_COUNT - 1;

/// Clamp any lane index into `0..=MAX_LANE`.
#[inline]
pub fn clamp_lane(lane: i64) -> u8 {
    lane.clamp(0, MAX_LANE as i64) as u8
}

// =============================================================================
// CHARACTER
// =============================================================================

/// The player-controlled runner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Current lane (0..=2)
    pub lane: u8,

    /// Height above ground (0 = ground)
    pub vertical_position: f64,

    /// Signed vertical velocity, positive is up
    pub vertical_velocity: f64,

    /// In the air
    pub is_jumping: bool,

    /// Ducking (reduced hitbox)
    pub is_sliding: bool,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            lane: START_LANE,
            vertical_position: 0.0,
            vertical_velocity: 0.0,
            is_jumping: false,
            is_sliding: false,
        }
    }
}

impl Character {
    /// Character standing in the middle lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move one lane left. Returns the new lane if it changed.
    pub fn move_left(&mut self) -> Option<u8> {
        if self.lane == 0 {
            return None;
        }
        self.lane -= 1;
        Some(self.lane)
    }

    /// Move one lane right. Returns the new lane if it changed.
    pub fn move_right(&mut self) -> Option<u8> {
        if self.lane >= MAX_LANE {
            return None;
        }
        self.lane += 1;
        Some(self.lane)
    }

    /// Start a jump. No-op (returns false) while already airborne.
    pub fn start_jump(&mut self, jump_force: f64) -> bool {
        if self.is_jumping {
            return false;
        }
        self.is_jumping = true;
        self.vertical_velocity = jump_force;
        true
    }

    /// Set the sliding flag. Returns true if it changed.
    pub fn set_sliding(&mut self, sliding: bool) -> bool {
        let changed = self.is_sliding != sliding;
        self.is_sliding = sliding;
        changed
    }

    /// Hitbox height for the current pose.
    #[inline]
    pub fn hitbox_height(&self, config: &GameConfig) -> f64 {
        if self.is_sliding {
            config.sliding_height
        } else {
            config.standing_height
        }
    }

    /// Hash character state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.lane);
        hasher.update_f64(self.vertical_position);
        hasher.update_f64(self.vertical_velocity);
        hasher.update_bool(self.is_jumping);
        hasher.update_bool(self.is_sliding);
    }
}

// =============================================================================
// OBSTACLES
// =============================================================================

/// Obstacle variety.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObstacleKind {
    /// Low block on the ground: jump over it.
    Barrier = 0,
    /// Raised carriage: slide under it.
    Train = 1,
}

impl ObstacleKind {
    /// Pick a kind from a unit sample (50/50).
    #[inline]
    pub fn from_unit(sample: f64) -> Self {
        if sample < 0.5 {
            ObstacleKind::Barrier
        } else {
            ObstacleKind::Train
        }
    }

    /// Hitbox height.
    pub fn height(self, config: &GameConfig) -> f64 {
        match self {
            ObstacleKind::Barrier => config.barrier_height,
            ObstacleKind::Train => config.train_height,
        }
    }

    /// Height of the hitbox floor above the ground.
    pub fn elevation(self, config: &GameConfig) -> f64 {
        match self {
            ObstacleKind::Barrier => 0.0,
            ObstacleKind::Train => config.train_elevation,
        }
    }
}

/// An obstacle travelling towards the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Unique id
    pub id: EntityId,

    /// Barrier or train
    pub kind: ObstacleKind,

    /// Lane index
    pub lane: u8,

    /// Distance from the player; decreases every tick
    pub position_from_far: f64,

    /// Hitbox width
    pub width: f64,

    /// Hitbox height
    pub height: f64,

    /// Hitbox floor above ground
    pub elevation: f64,
}

impl Obstacle {
    /// Create an obstacle of `kind` at the far edge of `lane`.
    pub fn new(id: EntityId, kind: ObstacleKind, lane: u8, config: &GameConfig) -> Self {
        Self {
            id,
            kind,
            lane: clamp_lane(lane as i64),
            position_from_far: config.view_depth,
            width: config.obstacle_width,
            height: kind.height(config),
            elevation: kind.elevation(config),
        }
    }
}

/// A coin waiting to be picked up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    /// Unique id
    pub id: EntityId,

    /// Lane index
    pub lane: u8,

    /// Distance from the player; decreases every tick
    pub position_from_far: f64,

    /// Coins granted on pickup (at least 1)
    pub value: u32,
}

impl Collectible {
    /// Create a coin at the far edge of `lane`.
    pub fn new(id: EntityId, lane: u8, config: &GameConfig) -> Self {
        Self {
            id,
            lane: clamp_lane(lane as i64),
            position_from_far: config.view_depth,
            value: config.coin_value.max(1),
        }
    }
}

// =============================================================================
// SESSION STATUS
// =============================================================================

/// Lifecycle of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SessionStatus {
    /// Created, waiting for start.
    #[default]
    NotStarted = 0,
    /// Simulating.
    Active = 1,
    /// Frozen until resumed.
    Paused = 2,
    /// Crashed. Terminal until restart.
    GameOver = 3,
}

impl SessionStatus {
    /// Whether a run has been started (and not exited).
    pub fn is_started(self) -> bool {
        !matches!(self, SessionStatus::NotStarted)
    }
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Authoritative state of one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    /// Ticks simulated while active
    pub tick: u64,

    /// Seed the spawn RNG started from
    pub seed: u64,

    /// Spawn RNG
    pub rng: DeterministicRng,

    /// Lifecycle status
    pub status: SessionStatus,

    /// Real-valued score; displayed floored
    pub score: f64,

    /// Coins collected
    pub coins: u32,

    /// Entity approach speed, never decreases
    pub speed: f64,

    /// The runner
    pub character: Character,

    /// Obstacles in spawn order
    pub obstacles: Vec<Obstacle>,

    /// Coins in spawn order
    pub collectibles: Vec<Collectible>,

    /// Next entity id (monotonic counter)
    pub next_entity_id: EntityId,

    /// Physics cadence accumulator
    pub physics: FixedStep,

    /// Milliseconds simulated while active
    pub active_ms: f64,

    /// Events generated since the last drain
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl SessionState {
    /// Create a fresh, not yet started run.
    pub fn new(config: &GameConfig, seed: u64) -> Self {
        Self {
            tick: 0,
            seed,
            rng: DeterministicRng::new(seed),
            status: SessionStatus::NotStarted,
            score: 0.0,
            coins: 0,
            speed: config.initial_speed,
            character: Character::new(),
            obstacles: Vec::new(),
            collectibles: Vec::new(),
            next_entity_id: 0,
            physics: FixedStep::new(config.physics_step_ms),
            active_ms: 0.0,
            pending_events: Vec::new(),
        }
    }

    /// Create a fresh run that is already active.
    pub fn started(config: &GameConfig, seed: u64) -> Self {
        let mut state = Self::new(config, seed);
        state.start();
        state
    }

    /// NotStarted → Active. Returns false if already started.
    pub fn start(&mut self) -> bool {
        if self.status != SessionStatus::NotStarted {
            return false;
        }
        self.status = SessionStatus::Active;
        self.push_event(GameEvent::session_started(self.tick, self.seed));
        true
    }

    /// Is the simulation advancing?
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Has the run ended?
    #[inline]
    pub fn is_over(&self) -> bool {
        self.status == SessionStatus::GameOver
    }

    /// Score as shown to the player.
    #[inline]
    pub fn display_score(&self) -> u64 {
        self.score.floor() as u64
    }

    /// Allocate the next entity id.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Read-only view for the rendering layer.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            score: self.score,
            display_score: self.display_score(),
            coins: self.coins,
            speed: self.speed,
            character: self.character.clone(),
            obstacles: self.obstacles.clone(),
            collectibles: self.collectibles.clone(),
        }
    }

    /// Compute deterministic state hash.
    ///
    /// Pending events are not part of the hash.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.seed, |hasher| {
            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);

            hasher.update_u8(self.status as u8);
            hasher.update_f64(self.score);
            hasher.update_u32(self.coins);
            hasher.update_f64(self.speed);
            self.character.hash_into(hasher);

            hasher.update_u32(self.obstacles.len() as u32);
            for obstacle in &self.obstacles {
                hasher.update_u32(obstacle.id);
                hasher.update_u8(obstacle.kind as u8);
                hasher.update_u8(obstacle.lane);
                hasher.update_f64(obstacle.position_from_far);
                hasher.update_f64(obstacle.width);
                hasher.update_f64(obstacle.height);
                hasher.update_f64(obstacle.elevation);
            }

            hasher.update_u32(self.collectibles.len() as u32);
            for coin in &self.collectibles {
                hasher.update_u32(coin.id);
                hasher.update_u8(coin.lane);
                hasher.update_f64(coin.position_from_far);
                hasher.update_u32(coin.value);
            }

            hasher.update_u32(self.next_entity_id);
            hasher.update_f64(self.physics.accumulated_ms());
            hasher.update_f64(self.active_ms);
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Queue an event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

/// Read-only copy of everything the renderer draws.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Lifecycle status
    pub status: SessionStatus,
    /// Real-valued score
    pub score: f64,
    /// Floored score
    pub display_score: u64,
    /// Coins collected
    pub coins: u32,
    /// Current speed
    pub speed: f64,
    /// The runner
    pub character: Character,
    /// Obstacles in spawn order
    pub obstacles: Vec<Obstacle>,
    /// Coins in spawn order
    pub collectibles: Vec<Collectible>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::GameEventData;

    #[test]
    fn test_new_state() {
        let config = GameConfig::default();
        let state = SessionState::new(&config, 7);
        assert_eq!(state.status, SessionStatus::NotStarted);
        assert_eq!(state.character.lane, 1);
        assert_eq!(state.speed, config.initial_speed);
        assert!(state.obstacles.is_empty());
        assert!(state.collectibles.is_empty());
    }

    #[test]
    fn test_start_once() {
        let config = GameConfig::default();
        let mut state = SessionState::new(&config, 7);
        assert!(state.start());
        assert!(!state.start());
        assert!(state.is_active());

        let events = state.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, GameEventData::SessionStarted { seed: 7 });
    }

    #[test]
    fn test_lane_bounds() {
        let mut character = Character::new();
        assert_eq!(character.move_left(), Some(0));
        assert_eq!(character.move_left(), None);
        assert_eq!(character.lane, 0);
        assert_eq!(character.move_right(), Some(1));
        assert_eq!(character.move_right(), Some(2));
        assert_eq!(character.move_right(), None);
        assert_eq!(character.lane, 2);
    }

    #[test]
    fn test_clamp_lane() {
        assert_eq!(clamp_lane(-4), 0);
        assert_eq!(clamp_lane(1), 1);
        assert_eq!(clamp_lane(17), MAX_LANE);
    }

    #[test]
    fn test_jump_only_from_ground() {
        let mut character = Character::new();
        assert!(character.start_jump(20.0));
        assert_eq!(character.vertical_velocity, 20.0);
        character.vertical_velocity = 3.0;
        assert!(!character.start_jump(20.0));
        assert_eq!(character.vertical_velocity, 3.0);
    }

    #[test]
    fn test_slide_changes_hitbox() {
        let config = GameConfig::default();
        let mut character = Character::new();
        assert_eq!(character.hitbox_height(&config), config.standing_height);
        assert!(character.set_sliding(true));
        assert!(!character.set_sliding(true));
        assert_eq!(character.hitbox_height(&config), config.sliding_height);
    }

    #[test]
    fn test_obstacle_geometry() {
        let config = GameConfig::default();
        let barrier = Obstacle::new(0, ObstacleKind::Barrier, 9, &config);
        assert_eq!(barrier.lane, MAX_LANE);
        assert_eq!(barrier.elevation, 0.0);
        assert_eq!(barrier.height, config.barrier_height);
        assert_eq!(barrier.position_from_far, config.view_depth);

        let train = Obstacle::new(1, ObstacleKind::Train, 0, &config);
        assert_eq!(train.elevation, config.train_elevation);
        assert_eq!(train.height, config.train_height);
        // A sliding runner fits under the train
        assert!(config.sliding_height <= train.elevation);
    }

    #[test]
    fn test_ids_monotonic() {
        let config = GameConfig::default();
        let mut state = SessionState::new(&config, 1);
        let a = state.allocate_id();
        let b = state.allocate_id();
        assert!(b > a);
    }

    #[test]
    fn test_hash_ignores_events_but_not_state() {
        let config = GameConfig::default();
        let mut a = SessionState::started(&config, 99);
        let b = SessionState::started(&config, 99);
        a.take_events();
        assert_eq!(a.compute_hash(), b.compute_hash());

        a.coins = 1;
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_display_score_floors() {
        let config = GameConfig::default();
        let mut state = SessionState::started(&config, 1);
        state.score = 12.99;
        assert_eq!(state.display_score(), 12);
        assert_eq!(state.snapshot().display_score, 12);
    }
}
