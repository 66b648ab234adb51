//! Lane Runner Demo
//!
//! Plays one run headless with a simple autopilot, then replays the
//! recorded inputs and checks that the state hashes match.
//!
//! Environment:
//! - `RUST_LOG`: log filter (default `info`)
//! - `LANE_RUNNER_SEED`: base seed (default 12345)
//! - `LANE_RUNNER_HIGHSCORE`: JSON high score file (default in-memory)
//!
//! The first argument, if any, is a JSON config file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lane_runner::{
    GameConfig, GameSession, HighScoreStore, FileHighScore, MemoryHighScore,
    SessionSnapshot, REFERENCE_FRAME_RATE, VERSION,
    game::{
        input::{InputAction, InputRecording},
        state::ObstacleKind,
    },
};

/// Longest demo run (two minutes of frames).
const MAX_FRAMES: u32 = REFERENCE_FRAME_RATE * 120;

/// Distance at which the autopilot reacts to an obstacle.
const LOOKAHEAD: f64 = 220.0;

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Lane Runner v{}", VERSION);

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = GameConfig::load_or_default(config_path.as_deref());

    let seed = match std::env::var("LANE_RUNNER_SEED") {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("LANE_RUNNER_SEED is not a number: {value}"))?,
        Err(_) => 12345,
    };

    let store: Box<dyn HighScoreStore> = match std::env::var_os("LANE_RUNNER_HIGHSCORE") {
        Some(path) => {
            let store = FileHighScore::open(&path).context("failed to open high score file")?;
            info!("High scores in {}", store.path().display());
            Box::new(store)
        }
        None => Box::new(MemoryHighScore::new()),
    };

    demo_run(config, seed, store)
}

/// Play one autopilot run and verify it replays identically.
fn demo_run(config: GameConfig, seed: u64, store: Box<dyn HighScoreStore>) -> Result<()> {
    info!("=== Starting Demo Run ===");

    let mut session = GameSession::new(config, seed).with_high_scores(store);
    info!("Session ID: {}", session.id());
    info!("Base seed: {}", seed);
    info!("Best so far: {}", session.high_score().unwrap_or(0));

    let jumps = Arc::new(AtomicU32::new(0));
    let coins = Arc::new(AtomicU32::new(0));
    {
        let jumps = jumps.clone();
        let coins = coins.clone();
        session.on_sound_event(move |sound| {
            let counter = match sound.name() {
                "jump" => &jumps,
                "coin" => &coins,
                _ => return,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        });
    }
    session.on_game_over(|score| info!("Game over! Final score: {}", score));

    session.start_session();
    info!("Run seed: {}", session.seed());

    let frame_ms = 1000.0 / REFERENCE_FRAME_RATE as f64;
    let mut last_report = 0;

    for frame in 0..MAX_FRAMES {
        if let Some((action, pressed)) = autopilot(&session.snapshot()) {
            session.submit_input(action, pressed);
        }

        let result = session.on_frame(frame as f64 * frame_ms);

        // Report every 10 seconds
        if frame - last_report >= REFERENCE_FRAME_RATE * 10 {
            let snapshot = session.snapshot();
            info!(
                "Frame {}: score {}, coins {}, speed {:.3}, {} obstacles on track",
                frame,
                snapshot.display_score,
                snapshot.coins,
                snapshot.speed,
                snapshot.obstacles.len()
            );
            last_report = frame;
        }

        if result.game_over {
            info!("Run ended at frame {}", frame);
            break;
        }
    }

    // Print results
    info!("=== Run Results ===");
    let snapshot = session.snapshot();
    info!("Status: {:?}", snapshot.status);
    info!("Score: {}", snapshot.display_score);
    info!("Coins: {}", snapshot.coins);
    info!("Jumps: {}", jumps.load(Ordering::Relaxed));
    info!("Coin sounds: {}", coins.load(Ordering::Relaxed));
    if let Some(summary) = session.last_run() {
        if summary.new_high_score {
            info!("New high score! (previous best {})", summary.previous_best);
        }
    }

    let hash = session.state_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    // Round-trip the recording the way a replay file would be stored
    let bytes = session.recording().to_bytes()?;
    let decoded = InputRecording::from_bytes(&bytes)?;
    info!(
        "Recording: {} inputs over {} frames, {} bytes",
        decoded.len(),
        session.frame_log().len(),
        bytes.len()
    );

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let replay_hash = session.replay_current_run()?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("determinism failure: replay hash differs");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}

/// Pick an input for the current frame.
///
/// Dodges into a clear lane when possible, otherwise jumps barriers and
/// slides under trains.
fn autopilot(snapshot: &SessionSnapshot) -> Option<(InputAction, bool)> {
    let character = &snapshot.character;
    let threat = |lane: u8| {
        snapshot
            .obstacles
            .iter()
            .filter(|o| o.lane == lane && o.position_from_far > 0.0 && o.position_from_far < LOOKAHEAD)
            .min_by(|a, b| a.position_from_far.total_cmp(&b.position_from_far))
    };

    let Some(obstacle) = threat(character.lane) else {
        return character.is_sliding.then_some((InputAction::Slide, false));
    };

    if character.lane > 0 && threat(character.lane - 1).is_none() {
        return Some((InputAction::MoveLeft, true));
    }
    if character.lane < 2 && threat(character.lane + 1).is_none() {
        return Some((InputAction::MoveRight, true));
    }

    match obstacle.kind {
        ObstacleKind::Barrier if !character.is_jumping => {
            if character.is_sliding {
                Some((InputAction::Slide, false))
            } else {
                Some((InputAction::Jump, true))
            }
        }
        ObstacleKind::Train if !character.is_sliding => Some((InputAction::Slide, true)),
        _ => None,
    }
}
