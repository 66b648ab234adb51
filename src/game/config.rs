//! Game Tuning and Configuration
//!
//! Every number that shapes how the run feels lives here. The constants
//! are the defaults; [`GameConfig`] carries the values a session actually
//! uses and can be overridden from a JSON file.

use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, warn};

/// Number of lanes. Lanes are indexed 0 (left) to 2 (right).
pub const LANE_COUNT: u8 = 3;

/// Lane the character starts every run in.
pub const START_LANE: u8 = 1;

/// Width of the visible track.
pub const TRACK_WIDTH: f64 = 800.0;

/// Width of a single lane.
pub const LANE_WIDTH: f64 = TRACK_WIDTH / LANE_COUNT as f64;

/// Velocity removed per physics tick while airborne.
pub const GRAVITY: f64 = 1.5;

/// Upward velocity set when a jump starts.
pub const JUMP_FORCE: f64 = 20.0;

/// Physics tick cadence in milliseconds.
pub const PHYSICS_STEP_MS: f64 = 30.0;

/// Speed at the start of every run.
pub const INITIAL_SPEED: f64 = 5.0;

/// Speed added every active tick.
pub const SPEED_GROWTH_RATE: f64 = 0.001;

/// Score gained per elapsed millisecond.
pub const SCORE_RATE: f64 = 0.01;

/// Per-tick chance of spawning an obstacle.
pub const OBSTACLE_SPAWN_PROBABILITY: f64 = 0.02;

/// Per-tick chance of spawning a coin.
pub const COIN_SPAWN_PROBABILITY: f64 = 0.03;

/// Distance at which new entities appear (far edge of the track).
pub const LANE_VIEW_DEPTH: f64 = 500.0;

/// Obstacles are dropped once they fall below this depth.
pub const OBSTACLE_PRUNE_DEPTH: f64 = -100.0;

/// Coins are dropped once they fall below this depth.
pub const COIN_PRUNE_DEPTH: f64 = -50.0;

/// Character hitbox width.
pub const CHARACTER_WIDTH: f64 = 60.0;

/// Character hitbox height while standing or jumping.
pub const STANDING_HEIGHT: f64 = 100.0;

/// Character hitbox height while sliding.
pub const SLIDING_HEIGHT: f64 = 50.0;

/// Obstacle hitbox width (all kinds).
pub const OBSTACLE_WIDTH: f64 = 60.0;

/// Barrier hitbox height. Barriers sit on the ground.
pub const BARRIER_HEIGHT: f64 = 60.0;

/// Train hitbox height.
pub const TRAIN_HEIGHT: f64 = 100.0;

/// Height of the train hitbox floor above the ground.
pub const TRAIN_ELEVATION: f64 = 60.0;

/// Depth in front of the player where entities can touch the character.
pub const CONTACT_DEPTH: f64 = 100.0;

/// Coins are only picked up below this vertical position.
pub const COIN_PICKUP_MAX_HEIGHT: f64 = 150.0;

/// Value of a freshly spawned coin.
pub const COIN_VALUE: u32 = 1;

/// Frame length at which one tick moves entities by exactly `speed`.
pub const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;

/// Pending input intents buffered between ticks.
pub const INPUT_QUEUE_CAPACITY: usize = 64;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value that must be strictly positive was not.
    #[error("{field} must be positive, got {value}")]
    NotPositive {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A probability outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Sliding must shrink the hitbox.
    #[error("sliding height {sliding} must not exceed standing height {standing}")]
    SlideTallerThanStand {
        /// Configured sliding height.
        sliding: f64,
        /// Configured standing height.
        standing: f64,
    },

    /// Entities must be pruned behind the player.
    #[error("prune depth {value} for {field} must be below zero")]
    PruneDepthNotBehind {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Input queue needs room for at least one intent.
    #[error("input queue capacity must be at least 1")]
    ZeroQueueCapacity,

    /// Could not read the config file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for this schema.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tuning for one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Velocity removed per physics tick while airborne.
    pub gravity: f64,
    /// Upward velocity set when a jump starts.
    pub jump_force: f64,
    /// Physics tick cadence (ms).
    pub physics_step_ms: f64,
    /// Speed at the start of every run.
    pub initial_speed: f64,
    /// Speed added every active tick.
    pub speed_growth_rate: f64,
    /// Score per elapsed millisecond.
    pub score_rate: f64,
    /// Per-tick obstacle spawn chance.
    pub obstacle_spawn_probability: f64,
    /// Per-tick coin spawn chance.
    pub coin_spawn_probability: f64,
    /// Depth where entities appear.
    pub view_depth: f64,
    /// Obstacles below this depth are pruned.
    pub obstacle_prune_depth: f64,
    /// Coins below this depth are pruned.
    pub coin_prune_depth: f64,
    /// Lane width, used to project lanes onto x.
    pub lane_width: f64,
    /// Character hitbox width.
    pub character_width: f64,
    /// Character hitbox height standing.
    pub standing_height: f64,
    /// Character hitbox height sliding.
    pub sliding_height: f64,
    /// Obstacle hitbox width.
    pub obstacle_width: f64,
    /// Barrier hitbox height.
    pub barrier_height: f64,
    /// Train hitbox height.
    pub train_height: f64,
    /// Train hitbox floor above ground.
    pub train_elevation: f64,
    /// Depth of the contact zone in front of the player.
    pub contact_depth: f64,
    /// Coins are only collected below this height.
    pub coin_pickup_max_height: f64,
    /// Value of spawned coins.
    pub coin_value: u32,
    /// Frame length that moves entities by exactly `speed`.
    pub reference_frame_ms: f64,
    /// Pending input capacity.
    pub input_queue_capacity: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            jump_force: JUMP_FORCE,
            physics_step_ms: PHYSICS_STEP_MS,
            initial_speed: INITIAL_SPEED,
            speed_growth_rate: SPEED_GROWTH_RATE,
            score_rate: SCORE_RATE,
            obstacle_spawn_probability: OBSTACLE_SPAWN_PROBABILITY,
            coin_spawn_probability: COIN_SPAWN_PROBABILITY,
            view_depth: LANE_VIEW_DEPTH,
            obstacle_prune_depth: OBSTACLE_PRUNE_DEPTH,
            coin_prune_depth: COIN_PRUNE_DEPTH,
            lane_width: LANE_WIDTH,
            character_width: CHARACTER_WIDTH,
            standing_height: STANDING_HEIGHT,
            sliding_height: SLIDING_HEIGHT,
            obstacle_width: OBSTACLE_WIDTH,
            barrier_height: BARRIER_HEIGHT,
            train_height: TRAIN_HEIGHT,
            train_elevation: TRAIN_ELEVATION,
            contact_depth: CONTACT_DEPTH,
            coin_pickup_max_height: COIN_PICKUP_MAX_HEIGHT,
            coin_value: COIN_VALUE,
            reference_frame_ms: REFERENCE_FRAME_MS,
            input_queue_capacity: INPUT_QUEUE_CAPACITY,
        }
    }
}

impl GameConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load config from an optional file, falling back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::from_json_file(path) {
            Ok(config) => {
                info!("Loaded game config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("gravity", self.gravity),
            ("jump_force", self.jump_force),
            ("physics_step_ms", self.physics_step_ms),
            ("initial_speed", self.initial_speed),
            ("view_depth", self.view_depth),
            ("lane_width", self.lane_width),
            ("character_width", self.character_width),
            ("standing_height", self.standing_height),
            ("sliding_height", self.sliding_height),
            ("obstacle_width", self.obstacle_width),
            ("contact_depth", self.contact_depth),
            ("reference_frame_ms", self.reference_frame_ms),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        // Rates may be zero (a flat-speed practice mode) but never negative
        for (field, value) in [
            ("speed_growth_rate", self.speed_growth_rate),
            ("score_rate", self.score_rate),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        for (field, value) in [
            ("obstacle_spawn_probability", self.obstacle_spawn_probability),
            ("coin_spawn_probability", self.coin_spawn_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }

        if self.sliding_height > self.standing_height {
            return Err(ConfigError::SlideTallerThanStand {
                sliding: self.sliding_height,
                standing: self.standing_height,
            });
        }

        for (field, value) in [
            ("obstacle_prune_depth", self.obstacle_prune_depth),
            ("coin_prune_depth", self.coin_prune_depth),
        ] {
            if !(value < 0.0) {
                return Err(ConfigError::PruneDepthNotBehind { field, value });
            }
        }

        if self.coin_value == 0 {
            return Err(ConfigError::NotPositive {
                field: "coin_value",
                value: 0.0,
            });
        }

        if self.input_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        Ok(())
    }

    /// Upper bound on jump height: `jump_force² / (2·gravity)`.
    pub fn peak_height(&self) -> f64 {
        self.jump_force * self.jump_force / (2.0 * self.gravity)
    }

    /// Physics ticks from take-off until landing.
    ///
    /// After `n` ticks the height is `n·F − G·n(n+1)/2`, which first
    /// reaches zero at `n = ⌈2F/G − 1⌉`.
    pub fn flight_ticks(&self) -> u32 {
        let n = (2.0 * self.jump_force / self.gravity - 1.0).ceil();
        n.max(1.0) as u32
    }

    /// Horizontal centre of a lane.
    #[inline]
    pub fn lane_center(&self, lane: u8) -> f64 {
        lane as f64 * self.lane_width + self.lane_width / 2.0
    }
}
