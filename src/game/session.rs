//! Game Session
//!
//! The facade the presentation layer talks to. Owns the authoritative
//! [`SessionState`], the input queue, the frame clock and the outbound
//! collaborators (sound, game over, high score).

use std::fmt;

use serde::{Serialize, Deserialize};
use tracing::{debug, info, info_span, warn, Span};
use uuid::Uuid;

use crate::core::clock::{clamp_elapsed, SessionClock};
use crate::core::hash::StateHash;
use crate::core::rng::derive_run_seed;
use crate::game::config::GameConfig;
use crate::game::events::{GameEvent, GameEventData, SoundEvent};
use crate::game::input::{
    map_key, map_pointer, Command, ControlIntent, InputAction, InputQueue, InputRecording,
    InputSender, PointerDirection, ReplayError,
};
use crate::game::state::{SessionSnapshot, SessionState, SessionStatus};
use crate::game::tick::{apply_command, replay_session, tick, TickResult};
use crate::highscore::HighScoreStore;

/// Callback receiving sounds to play.
pub type SoundCallback = Box<dyn FnMut(SoundEvent) + Send>;

/// Callback receiving the final score of a finished run.
pub type GameOverCallback = Box<dyn FnMut(u64) + Send>;

/// Unique session identifier, used for log correlation only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of the most recent finished run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run number within the session (0 for the first).
    pub run_index: u32,
    /// Seed the run was played with.
    pub seed: u64,
    /// Floored final score.
    pub final_score: u64,
    /// Coins collected.
    pub coins: u32,
    /// Ticks simulated.
    pub ticks: u64,
    /// Best score before this run.
    pub previous_best: u64,
    /// This run set a new best.
    pub new_high_score: bool,
}

/// One player's game: a sequence of runs sharing config and collaborators.
pub struct GameSession {
    id: SessionId,
    span: Span,
    config: GameConfig,
    base_seed: u64,
    run_index: u32,
    state: SessionState,
    queue: InputQueue,
    // Commands queued before a pause, applied on the first tick after it
    held: Vec<Command>,
    clock: SessionClock,
    recording: InputRecording,
    frame_log: Vec<f64>,
    muted: bool,
    sound_listener: Option<SoundCallback>,
    game_over_listener: Option<GameOverCallback>,
    high_scores: Option<Box<dyn HighScoreStore>>,
    last_run: Option<RunSummary>,
}

impl GameSession {
    /// Create a session. Nothing simulates until [`start_session`](Self::start_session).
    pub fn new(config: GameConfig, base_seed: u64) -> Self {
        let id = SessionId::new();
        let span = info_span!("session", id = %id);
        let seed = derive_run_seed(base_seed, 0);
        let queue = InputQueue::new(config.input_queue_capacity);
        let state = SessionState::new(&config, seed);

        Self {
            id,
            span,
            config,
            base_seed,
            run_index: 0,
            state,
            queue,
            held: Vec::new(),
            clock: SessionClock::new(),
            recording: InputRecording::new(),
            frame_log: Vec::new(),
            muted: false,
            sound_listener: None,
            game_over_listener: None,
            high_scores: None,
            last_run: None,
        }
    }

    /// Attach a high score store.
    pub fn with_high_scores(mut self, store: Box<dyn HighScoreStore>) -> Self {
        self.high_scores = Some(store);
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// NotStarted → Active. No-op otherwise.
    pub fn start_session(&mut self) -> bool {
        let span = self.span.clone();
        let _enter = span.enter();
        if self.state.status != SessionStatus::NotStarted {
            return false;
        }
        self.reset_run_io();
        self.state.start();
        info!(run = self.run_index, seed = self.state.seed, "Run started");
        self.dispatch_pending();
        true
    }

    /// Active ⇄ Paused. No-op while NotStarted or GameOver.
    pub fn pause_toggle(&mut self) -> bool {
        let span = self.span.clone();
        let _enter = span.enter();
        match self.state.status {
            SessionStatus::Active => {
                self.held = self.queue.drain();
                self.state.status = SessionStatus::Paused;
                self.state.push_event(GameEvent::new(self.state.tick, GameEventData::Paused));
                info!(tick = self.state.tick, "Paused");
            }
            SessionStatus::Paused => {
                // Directional input sent during the pause is dropped;
                // a slide release still lands so the slide cannot stick.
                for command in self.queue.drain() {
                    if command == Command::SlideEnd {
                        self.release_slide();
                    }
                }
                self.clock.reset();
                self.state.status = SessionStatus::Active;
                self.state.push_event(GameEvent::new(self.state.tick, GameEventData::Resumed));
                info!(tick = self.state.tick, "Resumed");
            }
            SessionStatus::NotStarted | SessionStatus::GameOver => return false,
        }
        self.dispatch_pending();
        true
    }

    /// Throw the current run away and start a fresh one.
    ///
    /// Valid from Active, Paused or GameOver. An unfinished run's score is
    /// not reported.
    pub fn restart_session(&mut self) -> bool {
        let span = self.span.clone();
        let _enter = span.enter();
        if !self.state.status.is_started() {
            return false;
        }
        self.run_index += 1;
        self.state = SessionState::new(&self.config, self.seed_for(self.run_index));
        self.reset_run_io();
        self.state.start();
        info!(run = self.run_index, seed = self.state.seed, "Run restarted");
        self.dispatch_pending();
        true
    }

    /// Leave the run and return to NotStarted.
    pub fn exit_session(&mut self) -> bool {
        let span = self.span.clone();
        let _enter = span.enter();
        if !self.state.status.is_started() {
            return false;
        }
        self.run_index += 1;
        self.state = SessionState::new(&self.config, self.seed_for(self.run_index));
        self.reset_run_io();
        info!(run = self.run_index, "Session exited");
        true
    }

    fn seed_for(&self, run_index: u32) -> u64 {
        derive_run_seed(self.base_seed, run_index)
    }

    fn reset_run_io(&mut self) {
        let dropped = self.queue.drain().len() + self.held.len();
        self.held.clear();
        if dropped > 0 {
            debug!(dropped, "Discarded stale input");
        }
        self.clock.reset();
        self.recording = InputRecording::new();
        self.frame_log.clear();
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Press or release an action.
    ///
    /// Returns true if the input was accepted.
    pub fn submit_input(&mut self, action: InputAction, pressed: bool) -> bool {
        match Command::from_action(action, pressed) {
            Some(command) => self.submit_command(command),
            None => false,
        }
    }

    /// Press or release an action by name; unknown names are ignored.
    pub fn submit_action_name(&mut self, name: &str, pressed: bool) -> bool {
        match InputAction::from_name(name) {
            Some(action) => self.submit_input(action, pressed),
            None => {
                debug!("Ignoring unknown action {:?}", name);
                false
            }
        }
    }

    /// Queue a command for the next tick.
    pub fn submit_command(&mut self, command: Command) -> bool {
        match self.state.status {
            SessionStatus::Active => self.queue.try_submit(command),
            SessionStatus::Paused if command == Command::SlideEnd => {
                let span = self.span.clone();
                let _enter = span.enter();
                self.release_slide();
                self.dispatch_pending();
                true
            }
            _ => false,
        }
    }

    /// Handle a raw key press/release.
    pub fn handle_key(&mut self, key: &str, pressed: bool) -> bool {
        self.handle_intent(map_key(key, pressed))
    }

    /// Handle an on-screen button press/release.
    pub fn handle_pointer(&mut self, direction: PointerDirection, pressed: bool) -> bool {
        self.handle_intent(map_pointer(direction, pressed))
    }

    fn handle_intent(&mut self, intent: Option<ControlIntent>) -> bool {
        match intent {
            Some(ControlIntent::TogglePause) => self.pause_toggle(),
            Some(ControlIntent::Command(command)) => self.submit_command(command),
            None => false,
        }
    }

    /// Producer handle for input from other threads.
    ///
    /// Commands sent while the run is not active are discarded when it
    /// next starts or resumes.
    pub fn input_sender(&self) -> InputSender {
        self.queue.sender()
    }

    /// Release a slide between ticks. A slide press held over the pause is
    /// cancelled with it.
    fn release_slide(&mut self) {
        self.held.retain(|command| *command != Command::SlideStart);
        if apply_command(&mut self.state, Command::SlideEnd, &self.config) {
            self.recording.record(self.state.tick + 1, Command::SlideEnd);
        }
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Advance one tick by `elapsed_ms`.
    pub fn on_tick(&mut self, elapsed_ms: f64) -> TickResult {
        let span = self.span.clone();
        let _enter = span.enter();
        if !self.state.is_active() {
            return TickResult {
                game_over: self.state.is_over(),
                ..TickResult::default()
            };
        }

        let mut commands = std::mem::take(&mut self.held);
        commands.extend(self.queue.drain());
        let next_tick = self.state.tick + 1;
        for command in &commands {
            self.recording.record(next_tick, *command);
        }
        self.frame_log.push(clamp_elapsed(elapsed_ms));

        let result = tick(&mut self.state, &commands, elapsed_ms, &self.config);
        self.dispatch(&result.events);
        result
    }

    /// Advance one tick from an absolute frame timestamp.
    pub fn on_frame(&mut self, timestamp_ms: f64) -> TickResult {
        if !self.state.is_active() {
            return TickResult {
                game_over: self.state.is_over(),
                ..TickResult::default()
            };
        }
        let elapsed = self.clock.frame(timestamp_ms);
        self.on_tick(elapsed)
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    /// Register the sound sink.
    pub fn on_sound_event(&mut self, callback: impl FnMut(SoundEvent) + Send + 'static) {
        self.sound_listener = Some(Box::new(callback));
    }

    /// Register the game over sink.
    pub fn on_game_over(&mut self, callback: impl FnMut(u64) + Send + 'static) {
        self.game_over_listener = Some(Box::new(callback));
    }

    /// Mute or unmute sounds.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Are sounds muted?
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn dispatch_pending(&mut self) {
        let events = self.state.take_events();
        self.dispatch(&events);
    }

    fn dispatch(&mut self, events: &[GameEvent]) {
        for event in events {
            if let Some(sound) = event.sound() {
                if !self.muted {
                    if let Some(listener) = self.sound_listener.as_mut() {
                        listener(sound);
                    }
                }
            }
            if let GameEventData::GameOver { final_score, coins } = event.data {
                self.finish_run(final_score, coins);
            }
        }
    }

    fn finish_run(&mut self, final_score: u64, coins: u32) {
        let (previous_best, new_high_score) = match self.high_scores.as_mut() {
            Some(store) => {
                let previous = store.best();
                let improved = store.update_high_score(final_score).unwrap_or_else(|e| {
                    warn!("Failed to record high score: {}", e);
                    false
                });
                (previous, improved)
            }
            None => (0, false),
        };

        if let Some(listener) = self.game_over_listener.as_mut() {
            listener(final_score);
        }

        info!(
            run = self.run_index,
            score = final_score,
            coins,
            new_high_score,
            "Run finished"
        );

        self.last_run = Some(RunSummary {
            run_index: self.run_index,
            seed: self.state.seed,
            final_score,
            coins,
            ticks: self.state.tick,
            previous_best,
            new_high_score,
        });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Tuning in use.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    /// Read-only state of the current run.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Copy of everything the renderer draws.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    /// Seed of the current run.
    pub fn seed(&self) -> u64 {
        self.state.seed
    }

    /// Index of the current run.
    pub fn run_index(&self) -> u32 {
        self.run_index
    }

    /// Best score from the attached store, if any.
    pub fn high_score(&self) -> Option<u64> {
        self.high_scores.as_ref().map(|store| store.best())
    }

    /// Summary of the last finished run.
    pub fn last_run(&self) -> Option<&RunSummary> {
        self.last_run.as_ref()
    }

    /// Commands applied in the current run.
    pub fn recording(&self) -> &InputRecording {
        &self.recording
    }

    /// Elapsed time of every active tick in the current run.
    pub fn frame_log(&self) -> &[f64] {
        &self.frame_log
    }

    /// Hash of the current run's state.
    pub fn state_hash(&self) -> StateHash {
        self.state.compute_hash()
    }

    /// Re-simulate the current run from its recording.
    ///
    /// Returns the replayed state's hash, which equals
    /// [`state_hash`](Self::state_hash). Pauses are not recorded, so a
    /// paused run is compared with its status carried over.
    pub fn replay_current_run(&self) -> Result<StateHash, ReplayError> {
        let mut replayed = replay_session(&self.config, self.state.seed, &self.recording, &self.frame_log)?;
        if self.state.status == SessionStatus::Paused && replayed.is_active() {
            replayed.status = SessionStatus::Paused;
        }
        Ok(replayed.compute_hash())
    }
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("run_index", &self.run_index)
            .field("status", &self.state.status)
            .field("tick", &self.state.tick)
            .field("muted", &self.muted)
            .finish()
    }
}
