//! Collision Detection
//!
//! Axis-aligned hitbox tests between the character and the entities in
//! its contact zone. Checks are pure; the tick applies the results.

use crate::game::config::GameConfig;
use crate::game::state::{Character, Collectible, EntityId, Obstacle, ObstacleKind, SessionState};

/// Axis-aligned rectangle. `x` is horizontal, `y` is height above ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hitbox {
    /// Left edge
    pub x: f64,
    /// Bottom edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Hitbox {
    /// Strict AABB intersection; touching edges do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Hitbox) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Character hitbox, centred on its lane.
pub fn character_hitbox(character: &Character, config: &GameConfig) -> Hitbox {
    Hitbox {
        x: config.lane_center(character.lane) - config.character_width / 2.0,
        y: character.vertical_position,
        width: config.character_width,
        height: character.hitbox_height(config),
    }
}

/// Obstacle hitbox, centred on its lane and raised by its elevation.
pub fn obstacle_hitbox(obstacle: &Obstacle, config: &GameConfig) -> Hitbox {
    Hitbox {
        x: config.lane_center(obstacle.lane) - obstacle.width / 2.0,
        y: obstacle.elevation,
        width: obstacle.width,
        height: obstacle.height,
    }
}

/// Is an entity at this distance close enough to touch the character?
#[inline]
pub fn in_contact_zone(position_from_far: f64, config: &GameConfig) -> bool {
    position_from_far > 0.0 && position_from_far < config.contact_depth
}

/// The obstacle that ended the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObstacleCollision {
    /// Obstacle hit
    pub obstacle_id: EntityId,
    /// Its kind
    pub kind: ObstacleKind,
    /// Lane of the hit
    pub lane: u8,
}

/// Check one obstacle against the character.
pub fn check_obstacle_collision(
    character: &Character,
    obstacle: &Obstacle,
    config: &GameConfig,
) -> bool {
    obstacle.lane == character.lane
        && in_contact_zone(obstacle.position_from_far, config)
        && character_hitbox(character, config).overlaps(&obstacle_hitbox(obstacle, config))
}

/// First obstacle (in spawn order) hitting the character, if any.
pub fn find_obstacle_collision(state: &SessionState, config: &GameConfig) -> Option<ObstacleCollision> {
    state
        .obstacles
        .iter()
        .find(|o| check_obstacle_collision(&state.character, o, config))
        .map(|o| ObstacleCollision {
            obstacle_id: o.id,
            kind: o.kind,
            lane: o.lane,
        })
}

/// Check whether the character picks up a coin.
pub fn check_coin_pickup(character: &Character, coin: &Collectible, config: &GameConfig) -> bool {
    coin.lane == character.lane
        && in_contact_zone(coin.position_from_far, config)
        && character.vertical_position < config.coin_pickup_max_height
}

/// Ids of every coin picked up this tick, in spawn order.
pub fn find_coin_pickups(state: &SessionState, config: &GameConfig) -> Vec<EntityId> {
    state
        .collectibles
        .iter()
        .filter(|c| check_coin_pickup(&state.character, c, config))
        .map(|c| c.id)
        .collect()
}
