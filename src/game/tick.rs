//! Simulation Tick
//!
//! One call advances a run by one frame. Given the same state, commands,
//! elapsed times and spawn samples the result is always identical.

use tracing::{debug, info, trace};

use crate::core::clock::clamp_elapsed;
use crate::core::rng::SpawnRng;
use crate::game::collision::{find_coin_pickups, find_obstacle_collision};
use crate::game::config::GameConfig;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::input::{Command, InputRecording, ReplayError};
use crate::game::physics::{self, PhysicsStep};
use crate::game::spawner::{advance_and_prune, maybe_spawn};
use crate::game::state::{SessionState, SessionStatus};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the run is over
    pub game_over: bool,
    /// Physics sub-steps integrated
    pub physics_steps: u32,
}

/// Run one simulation tick using the state's own spawn RNG.
pub fn tick(
    state: &mut SessionState,
    commands: &[Command],
    elapsed_ms: f64,
    config: &GameConfig,
) -> TickResult {
    let mut rng = state.rng.clone();
    let result = tick_with_rng(state, commands, elapsed_ms, config, &mut rng);
    state.rng = rng;
    result
}

/// Run one simulation tick with an injected spawn RNG.
///
/// # Order
///
/// 1. Apply queued commands
/// 2. Accrue score and speed
/// 3. Spawn, then move and prune entities
/// 4. Integrate due physics sub-steps
/// 5. Resolve obstacle hits, then coin pickups
///
/// Does nothing unless the run is active.
pub fn tick_with_rng<R: SpawnRng + ?Sized>(
    state: &mut SessionState,
    commands: &[Command],
    elapsed_ms: f64,
    config: &GameConfig,
    rng: &mut R,
) -> TickResult {
    let mut result = TickResult::default();

    if state.status != SessionStatus::Active {
        result.game_over = state.is_over();
        return result;
    }

    let elapsed_ms = clamp_elapsed(elapsed_ms);

    // 0. Advance tick counter
    state.tick += 1;

    // 1. Apply commands
    for command in commands {
        apply_command(state, *command, config);
    }

    // 2. Difficulty and score
    state.score += elapsed_ms * config.score_rate;
    state.speed += config.speed_growth_rate;
    state.active_ms += elapsed_ms;

    // 3. Entities
    maybe_spawn(state, config, rng);
    advance_and_prune(state, config, elapsed_ms);

    // 4. Physics
    result.physics_steps = update_physics(state, config, elapsed_ms);

    // 5. Collisions
    if !process_obstacle_collisions(state, config) {
        process_coin_pickups(state, config);
    }

    trace!(
        tick = state.tick,
        score = state.score,
        speed = state.speed,
        obstacles = state.obstacles.len(),
        coins = state.collectibles.len(),
        "Tick complete"
    );

    result.game_over = state.is_over();
    result.events = state.take_events();
    result
}

/// Apply one command to the character.
///
/// Returns true if the character changed.
pub fn apply_command(state: &mut SessionState, command: Command, config: &GameConfig) -> bool {
    let tick = state.tick;
    let character = &mut state.character;
    let from = character.lane;

    match command {
        Command::MoveLeft | Command::MoveRight => {
            let moved = if command == Command::MoveLeft {
                character.move_left()
            } else {
                character.move_right()
            };
            match moved {
                Some(to) => {
                    state.push_event(GameEvent::lane_changed(tick, from, to));
                    true
                }
                None => false,
            }
        }
        Command::Jump => {
            if !character.start_jump(config.jump_force) {
                return false;
            }
            // Physics cadence restarts from the take-off
            state.physics.reset();
            state.push_event(GameEvent::new(tick, GameEventData::Jumped));
            true
        }
        Command::SlideStart | Command::SlideEnd => {
            let sliding = command == Command::SlideStart;
            if !character.set_sliding(sliding) {
                return false;
            }
            state.push_event(GameEvent::new(tick, GameEventData::SlideChanged { sliding }));
            true
        }
    }
}

fn update_physics(state: &mut SessionState, config: &GameConfig, elapsed_ms: f64) -> u32 {
    if !state.character.is_jumping {
        return 0;
    }

    let due = state.physics.advance(elapsed_ms);
    let mut steps = 0;
    for _ in 0..due {
        steps += 1;
        if physics::step(&mut state.character, config) == PhysicsStep::Landed {
            state.physics.reset();
            state.push_event(GameEvent::new(state.tick, GameEventData::Landed));
            break;
        }
    }
    steps
}

/// Returns true if the run ended.
fn process_obstacle_collisions(state: &mut SessionState, config: &GameConfig) -> bool {
    let Some(hit) = find_obstacle_collision(state, config) else {
        return false;
    };

    state.status = SessionStatus::GameOver;
    state.push_event(GameEvent::crashed(state.tick, hit.obstacle_id, hit.kind, hit.lane));
    state.push_event(GameEvent::game_over(state.tick, state.display_score(), state.coins));

    info!(
        tick = state.tick,
        obstacle = hit.obstacle_id,
        kind = ?hit.kind,
        score = state.display_score(),
        coins = state.coins,
        "Crashed, game over"
    );
    true
}

fn process_coin_pickups(state: &mut SessionState, config: &GameConfig) {
    let picked = find_coin_pickups(state, config);
    if picked.is_empty() {
        return;
    }

    let mut collected = Vec::with_capacity(picked.len());
    state.collectibles.retain(|coin| {
        if picked.contains(&coin.id) {
            collected.push((coin.id, coin.value));
            false
        } else {
            true
        }
    });

    for (id, value) in collected {
        state.coins = state.coins.saturating_add(value);
        state.push_event(GameEvent::coin_collected(state.tick, id, value, state.coins));
        debug!(id, total = state.coins, "Coin collected");
    }
}

/// Re-run a recorded run from its seed.
///
/// `frames` are the elapsed times of every active tick, in order.
/// Commands recorded for tick `n` are applied at the start of tick `n`.
/// Commands recorded for the tick after the last frame were applied between
/// ticks and are applied once the frames run out. Stops early if the run
/// ends.
pub fn replay_session(
    config: &GameConfig,
    seed: u64,
    recording: &InputRecording,
    frames: &[f64],
) -> Result<SessionState, ReplayError> {
    recording.validate()?;

    let mut state = SessionState::started(config, seed);
    for &elapsed_ms in frames {
        if !state.is_active() {
            break;
        }
        let commands: Vec<Command> = recording.commands_at(state.tick + 1).collect();
        tick(&mut state, &commands, elapsed_ms, config);
    }
    let mut consumed_through = state.tick;
    if state.is_active() {
        consumed_through += 1;
        for command in recording.commands_at(consumed_through) {
            apply_command(&mut state, command, config);
        }
    }
    state.take_events();

    let remaining = recording
        .inputs()
        .iter()
        .filter(|input| input.tick > consumed_through)
        .count();
    if remaining > 0 {
        return Err(ReplayError::Unconsumed {
            remaining,
            stopped_at: state.tick,
        });
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::ScriptedRng;
    use crate::game::config::REFERENCE_FRAME_MS;
    use crate::game::events::SoundEvent;
    use crate::game::state::{Character, Collectible, Obstacle, ObstacleKind};
    use proptest::prelude::*;

    const FRAME: f64 = REFERENCE_FRAME_MS;

    fn quiet_config() -> GameConfig {
        GameConfig {
            obstacle_spawn_probability: 0.0,
            coin_spawn_probability: 0.0,
            ..GameConfig::default()
        }
    }

    fn place_obstacle(state: &mut SessionState, kind: ObstacleKind, lane: u8, position: f64, config: &GameConfig) {
        let id = state.allocate_id();
        let mut obstacle = Obstacle::new(id, kind, lane, config);
        obstacle.position_from_far = position;
        state.obstacles.push(obstacle);
    }

    #[test]
    fn test_tick_determinism() {
        let config = GameConfig::default();
        let mut state1 = SessionState::started(&config, 12345);
        let mut state2 = SessionState::started(&config, 12345);

        let script = [Command::MoveLeft, Command::Jump, Command::MoveRight, Command::SlideStart];
        for i in 0..600 {
            let commands: Vec<Command> = if i % 40 == 0 {
                vec![script[(i / 40) % script.len()]]
            } else {
                Vec::new()
            };
            tick(&mut state1, &commands, FRAME, &config);
            tick(&mut state2, &commands, FRAME, &config);
        }

        assert_eq!(state1.tick, state2.tick);
        assert_eq!(state1.compute_hash(), state2.compute_hash());
    }

    #[test]
    fn test_inactive_tick_is_noop() {
        let config = GameConfig::default();

        let mut fresh = SessionState::new(&config, 5);
        let before = fresh.compute_hash();
        let result = tick(&mut fresh, &[Command::Jump], FRAME, &config);
        assert!(result.events.is_empty());
        assert_eq!(fresh.compute_hash(), before);

        let mut paused = SessionState::started(&config, 5);
        tick(&mut paused, &[], FRAME, &config);
        paused.status = SessionStatus::Paused;
        let before = paused.compute_hash();
        for _ in 0..10 {
            tick(&mut paused, &[Command::MoveLeft], FRAME, &config);
        }
        assert_eq!(paused.compute_hash(), before);
    }

    #[test]
    fn test_score_and_speed_accrue() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);

        tick(&mut state, &[], 100.0, &config);
        assert!((state.score - 1.0).abs() < 1e-12);
        assert!((state.speed - (config.initial_speed + config.speed_growth_rate)).abs() < 1e-12);

        // Huge gaps are clamped
        tick(&mut state, &[], 10_000.0, &config);
        assert!((state.score - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_jump_lands_after_flight_ticks() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);
        let step = config.physics_step_ms;

        let result = tick(&mut state, &[Command::Jump], step, &config);
        assert_eq!(result.physics_steps, 1);
        assert!(result.events.iter().any(|e| e.sound() == Some(SoundEvent::Jump)));

        for _ in 1..config.flight_ticks() - 1 {
            tick(&mut state, &[], step, &config);
            assert!(state.character.is_jumping);
        }

        let result = tick(&mut state, &[], step, &config);
        assert!(result.events.iter().any(|e| e.data == GameEventData::Landed));
        assert!(!state.character.is_jumping);
        assert_eq!(state.character.vertical_position, 0.0);
        assert_eq!(state.physics.accumulated_ms(), 0.0);
    }

    #[test]
    fn test_jump_ignored_while_airborne() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);
        tick(&mut state, &[Command::Jump], 30.0, &config);
        let velocity = state.character.vertical_velocity;

        let result = tick(&mut state, &[Command::Jump], 0.0, &config);
        assert!(result.events.is_empty());
        assert_eq!(state.character.vertical_velocity, velocity);
    }

    #[test]
    fn test_obstacle_in_zone_ends_run() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);
        state.take_events();
        place_obstacle(&mut state, ObstacleKind::Barrier, 1, 50.0, &config);

        let result = tick(&mut state, &[], FRAME, &config);
        assert!(result.game_over);
        assert_eq!(state.status, SessionStatus::GameOver);

        let sounds: Vec<_> = result.events.iter().filter_map(|e| e.sound()).collect();
        assert_eq!(sounds, vec![SoundEvent::Crash]);
        assert!(matches!(
            result.events.last().map(|e| &e.data),
            Some(GameEventData::GameOver { .. })
        ));

        // Terminal
        let frozen = state.compute_hash();
        let result = tick(&mut state, &[Command::MoveLeft], FRAME, &config);
        assert!(result.game_over);
        assert_eq!(state.compute_hash(), frozen);
    }

    #[test]
    fn test_lane_change_dodges() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);
        place_obstacle(&mut state, ObstacleKind::Barrier, 1, 50.0, &config);

        let result = tick(&mut state, &[Command::MoveRight], FRAME, &config);
        assert!(!result.game_over);
        assert_eq!(state.character.lane, 2);
    }

    #[test]
    fn test_slide_under_train() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);
        place_obstacle(&mut state, ObstacleKind::Train, 1, 90.0, &config);

        tick(&mut state, &[Command::SlideStart], FRAME, &config);
        for _ in 0..30 {
            let result = tick(&mut state, &[], FRAME, &config);
            assert!(!result.game_over);
        }
        assert!(state.obstacles[0].position_from_far < 0.0);

        tick(&mut state, &[Command::SlideEnd], FRAME, &config);
        assert!(!state.character.is_sliding);
        assert!(state.is_active());
    }

    #[test]
    fn test_jump_over_barrier() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);
        place_obstacle(&mut state, ObstacleKind::Barrier, 1, 140.0, &config);

        tick(&mut state, &[Command::Jump], FRAME, &config);
        for _ in 0..60 {
            tick(&mut state, &[], FRAME, &config);
        }
        assert!(state.is_active());
        assert!(!state.character.is_jumping);
    }

    #[test]
    fn test_coin_collected_at_fifty() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);
        state.take_events();

        for position in [50.0, 60.0] {
            let id = state.allocate_id();
            let mut coin = Collectible::new(id, 1, &config);
            coin.position_from_far = position;
            state.collectibles.push(coin);
        }

        let result = tick(&mut state, &[], 0.0, &config);
        assert_eq!(state.coins, 2);
        assert!(state.collectibles.is_empty());
        let sounds: Vec<_> = result.events.iter().filter_map(|e| e.sound()).collect();
        assert_eq!(sounds, vec![SoundEvent::Coin, SoundEvent::Coin]);
    }

    #[test]
    fn test_crash_tick_collects_no_coins() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 1);
        place_obstacle(&mut state, ObstacleKind::Barrier, 1, 50.0, &config);
        let id = state.allocate_id();
        let mut coin = Collectible::new(id, 1, &config);
        coin.position_from_far = 40.0;
        state.collectibles.push(coin);

        tick(&mut state, &[], 0.0, &config);
        assert!(state.is_over());
        assert_eq!(state.coins, 0);
    }

    #[test]
    fn test_injected_rng_spawns() {
        let config = GameConfig::default();
        let mut state = SessionState::started(&config, 1);
        state.take_events();

        // Obstacle in lane 0 (barrier), no coin
        let mut rng = ScriptedRng::new(vec![0.0, 0.0, 0.0, 0.99]);
        let result = tick_with_rng(&mut state, &[], 0.0, &config, &mut rng);

        assert_eq!(state.obstacles.len(), 1);
        assert_eq!(state.obstacles[0].lane, 0);
        assert_eq!(state.obstacles[0].kind, ObstacleKind::Barrier);
        assert!(state.collectibles.is_empty());
        assert!(matches!(result.events[0].data, GameEventData::ObstacleSpawned { lane: 0, .. }));
    }

    #[test]
    fn test_replay_determinism() {
        let config = GameConfig::default();
        let seed = 99999;
        let mut state = SessionState::started(&config, seed);
        let mut recording = InputRecording::new();
        let mut frames = Vec::new();

        let plan = [Command::MoveLeft, Command::Jump, Command::MoveRight, Command::MoveRight];
        for i in 0..400u64 {
            if !state.is_active() {
                break;
            }
            let commands: Vec<Command> = if i % 25 == 0 {
                vec![plan[(i / 25) as usize % plan.len()]]
            } else {
                Vec::new()
            };
            for command in &commands {
                recording.record(state.tick + 1, *command);
            }
            let elapsed = 10.0 + (i % 7) as f64;
            frames.push(elapsed);
            tick(&mut state, &commands, elapsed, &config);
        }

        let replayed = replay_session(&config, seed, &recording, &frames).unwrap();
        assert_eq!(replayed.compute_hash(), state.compute_hash());
    }

    #[test]
    fn test_replay_rejects_unused_inputs() {
        let config = quiet_config();
        let mut recording = InputRecording::new();
        recording.record(50, Command::Jump);

        let result = replay_session(&config, 1, &recording, &[FRAME; 10]);
        assert!(matches!(
            result,
            Err(ReplayError::Unconsumed { remaining: 1, stopped_at: 10 })
        ));
    }

    #[test]
    fn test_replay_applies_release_between_ticks() {
        let config = quiet_config();
        let mut state = SessionState::started(&config, 4);
        let mut recording = InputRecording::new();

        recording.record(1, Command::SlideStart);
        tick(&mut state, &[Command::SlideStart], FRAME, &config);
        // Released before tick 2 runs
        recording.record(2, Command::SlideEnd);
        apply_command(&mut state, Command::SlideEnd, &config);

        let replayed = replay_session(&config, 4, &recording, &[FRAME]).unwrap();
        assert_eq!(replayed.tick, 1);
        assert!(!replayed.character.is_sliding);
        assert_eq!(replayed.compute_hash(), state.compute_hash());
    }

    fn command_strategy() -> impl Strategy<Value = Option<Command>> {
        prop_oneof![
            3 => Just(None),
            1 => Just(Some(Command::MoveLeft)),
            1 => Just(Some(Command::MoveRight)),
            1 => Just(Some(Command::Jump)),
            1 => Just(Some(Command::SlideStart)),
            1 => Just(Some(Command::SlideEnd)),
        ]
    }

    proptest! {
        #[test]
        fn prop_invariants_hold(
            seed in any::<u64>(),
            steps in proptest::collection::vec((command_strategy(), 0.0f64..120.0), 1..300),
        ) {
            let config = GameConfig::default();
            let mut state = SessionState::started(&config, seed);
            let mut last_score = state.score;
            let mut last_coins = state.coins;
            let mut last_speed = state.speed;

            for (command, elapsed) in steps {
                let commands: Vec<Command> = command.into_iter().collect();
                tick(&mut state, &commands, elapsed, &config);

                prop_assert!(state.score >= last_score);
                prop_assert!(state.coins >= last_coins);
                prop_assert!(state.speed >= last_speed);
                prop_assert!(state.speed >= config.initial_speed);
                prop_assert!(state.character.lane <= 2);
                prop_assert!(state.character.vertical_position >= 0.0);
                prop_assert!(state.character.vertical_position <= config.peak_height());

                for obstacle in &state.obstacles {
                    prop_assert!(obstacle.position_from_far >= config.obstacle_prune_depth);
                }
                let ids: Vec<_> = state.obstacles.iter().map(|o| o.id).collect();
                prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));

                last_score = state.score;
                last_coins = state.coins;
                last_speed = state.speed;
            }
        }

        #[test]
        fn prop_lane_bounds(moves in proptest::collection::vec(any::<bool>(), 0..50)) {
            let config = quiet_config();
            let mut state = SessionState::started(&config, 0);
            for right in moves {
                let command = if right { Command::MoveRight } else { Command::MoveLeft };
                tick(&mut state, &[command], FRAME, &config);
                prop_assert!(state.character.lane <= 2);
            }
        }

        #[test]
        fn prop_flight_ticks_closed_form(
            jump_force in 1u32..60,
            gravity in prop::sample::select(vec![0.5f64, 1.0, 1.5, 2.0, 2.5, 3.0]),
        ) {
            let config = GameConfig {
                jump_force: jump_force as f64,
                gravity,
                ..quiet_config()
            };
            let mut character = Character::new();
            character.start_jump(config.jump_force);

            let mut ticks = 0;
            let mut peak: f64 = 0.0;
            loop {
                ticks += 1;
                let outcome = physics::step(&mut character, &config);
                peak = peak.max(character.vertical_position);
                if outcome == PhysicsStep::Landed {
                    break;
                }
            }
            prop_assert_eq!(ticks, config.flight_ticks());
            prop_assert!(peak <= config.peak_height());
            prop_assert_eq!(character.vertical_position, 0.0);
        }
    }
}
