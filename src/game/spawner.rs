//! Entity Spawning and Movement
//!
//! Obstacles and coins appear at the far edge of a random lane, slide
//! towards the player at the current speed, and are pruned once they are
//! behind the player.

use tracing::debug;

use crate::core::rng::SpawnRng;
use crate::game::config::{GameConfig, LANE_COUNT};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::{Collectible, Obstacle, ObstacleKind, SessionState};

/// What a spawn pass created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnOutcome {
    /// An obstacle was added.
    pub obstacle: bool,
    /// A coin was added.
    pub coin: bool,
}

/// Run one spawn trial per entity type.
///
/// Samples are drawn in a fixed order: obstacle trial, then (if it
/// spawns) lane and kind; coin trial, then (if it spawns) lane.
pub fn maybe_spawn<R: SpawnRng + ?Sized>(
    state: &mut SessionState,
    config: &GameConfig,
    rng: &mut R,
) -> SpawnOutcome {
    let mut outcome = SpawnOutcome::default();

    if rng.next_unit() < config.obstacle_spawn_probability {
        let lane = rng.next_index(LANE_COUNT as u32) as u8;
        let kind = ObstacleKind::from_unit(rng.next_unit());
        let id = state.allocate_id();

        state.obstacles.push(Obstacle::new(id, kind, lane, config));
        state.push_event(GameEvent::obstacle_spawned(state.tick, id, kind, lane));
        debug!(id, ?kind, lane, "Obstacle spawned");
        outcome.obstacle = true;
    }

    if rng.next_unit() < config.coin_spawn_probability {
        let lane = rng.next_index(LANE_COUNT as u32) as u8;
        let id = state.allocate_id();

        state.collectibles.push(Collectible::new(id, lane, config));
        state.push_event(GameEvent::new(state.tick, GameEventData::CoinSpawned { id, lane }));
        debug!(id, lane, "Coin spawned");
        outcome.coin = true;
    }

    outcome
}

/// Distance entities travel this tick.
///
/// Exactly `speed` for a reference-length frame, scaled linearly otherwise.
#[inline]
pub fn displacement(speed: f64, elapsed_ms: f64, config: &GameConfig) -> f64 {
    speed * elapsed_ms / config.reference_frame_ms
}

/// Move every entity towards the player and drop the ones left behind.
///
/// Returns the number of entities pruned.
pub fn advance_and_prune(state: &mut SessionState, config: &GameConfig, elapsed_ms: f64) -> usize {
    let delta = displacement(state.speed, elapsed_ms, config);

    for obstacle in &mut state.obstacles {
        obstacle.position_from_far -= delta;
    }
    for coin in &mut state.collectibles {
        coin.position_from_far -= delta;
    }

    let before = state.obstacles.len() + state.collectibles.len();
    state
        .obstacles
        .retain(|o| o.position_from_far >= config.obstacle_prune_depth);
    state
        .collectibles
        .retain(|c| c.position_from_far >= config.coin_prune_depth);

    before - state.obstacles.len() - state.collectibles.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::{DeterministicRng, ScriptedRng};

    #[test]
    fn test_scripted_obstacle_and_coin() {
        let config = GameConfig::default();
        let mut state = SessionState::started(&config, 1);
        state.take_events();

        // obstacle trial hit, lane 2, train; coin trial hit, lane 0
        let mut rng = ScriptedRng::new(vec![0.0, 0.9, 0.7, 0.01, 0.1]);
        let outcome = maybe_spawn(&mut state, &config, &mut rng);

        assert!(outcome.obstacle && outcome.coin);
        assert_eq!(rng.drawn(), 5);

        let obstacle = &state.obstacles[0];
        assert_eq!(obstacle.lane, 2);
        assert_eq!(obstacle.kind, ObstacleKind::Train);
        assert_eq!(obstacle.position_from_far, config.view_depth);

        let coin = &state.collectibles[0];
        assert_eq!(coin.lane, 0);
        assert_eq!(coin.value, 1);
        assert!(coin.id > obstacle.id);

        let events = state.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1].data, GameEventData::CoinSpawned { lane: 0, .. }));
    }

    #[test]
    fn test_misses_draw_two_samples() {
        let config = GameConfig::default();
        let mut state = SessionState::started(&config, 1);

        // 0.02 and 0.03 are exclusive thresholds
        let mut rng = ScriptedRng::new(vec![0.02, 0.03]);
        let outcome = maybe_spawn(&mut state, &config, &mut rng);

        assert_eq!(outcome, SpawnOutcome::default());
        assert_eq!(rng.drawn(), 2);
        assert!(state.obstacles.is_empty());
        assert!(state.collectibles.is_empty());
    }

    #[test]
    fn test_spawn_rates_roughly_match() {
        let config = GameConfig::default();
        let mut state = SessionState::started(&config, 1);
        let mut rng = DeterministicRng::new(2024);

        let mut obstacles = 0;
        let mut coins = 0;
        for _ in 0..20_000 {
            let outcome = maybe_spawn(&mut state, &config, &mut rng);
            obstacles += outcome.obstacle as u32;
            coins += outcome.coin as u32;
        }
        // Expected 400 and 600
        assert!((300..500).contains(&obstacles), "obstacles = {}", obstacles);
        assert!((480..720).contains(&coins), "coins = {}", coins);
    }

    #[test]
    fn test_displacement_scales_with_elapsed() {
        let config = GameConfig::default();
        assert!((displacement(5.0, config.reference_frame_ms, &config) - 5.0).abs() < 1e-12);
        assert!((displacement(5.0, 2.0 * config.reference_frame_ms, &config) - 10.0).abs() < 1e-12);
        assert_eq!(displacement(5.0, 0.0, &config), 0.0);
    }

    #[test]
    fn test_prune_thresholds() {
        let config = GameConfig::default();
        let mut state = SessionState::started(&config, 1);
        state.speed = 10.0;

        let mut keep = Obstacle::new(0, ObstacleKind::Barrier, 0, &config);
        keep.position_from_far = -89.5;
        let mut gone = Obstacle::new(1, ObstacleKind::Barrier, 0, &config);
        gone.position_from_far = -90.5;
        let mut coin_keep = Collectible::new(2, 1, &config);
        coin_keep.position_from_far = -39.5;
        let mut coin_drop = Collectible::new(3, 1, &config);
        coin_drop.position_from_far = -40.5;

        state.obstacles = vec![keep, gone];
        state.collectibles = vec![coin_keep, coin_drop];

        let pruned = advance_and_prune(&mut state, &config, config.reference_frame_ms);
        assert_eq!(pruned, 2);
        assert_eq!(state.obstacles.len(), 1);
        assert_eq!(state.obstacles[0].id, 0);
        assert!((state.obstacles[0].position_from_far + 99.5).abs() < 1e-9);
        assert_eq!(state.collectibles.len(), 1);
        assert_eq!(state.collectibles[0].id, 2);
    }
}
