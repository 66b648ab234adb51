//! Frame Driver
//!
//! A fixed-rate tokio loop feeding frame timestamps into a shared session.
//! The session lock is taken once per frame and released before the next
//! await.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::session::GameSession;
use crate::game::state::SessionStatus;

/// Session shared between the driver and the host.
pub type SharedSession = Arc<Mutex<GameSession>>;

/// Default frame rate (Hz).
pub const DEFAULT_FRAME_RATE: u32 = crate::REFERENCE_FRAME_RATE;

/// Why the frame loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was signalled through the handle.
    Shutdown,
    /// The session went back to NotStarted.
    SessionExited,
}

/// Counters reported when the loop stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverStats {
    /// Frames delivered to the session.
    pub frames: u64,
    /// Frames that ended with the run over.
    pub game_over_frames: u64,
    /// Why the loop stopped.
    pub reason: StopReason,
}

/// Builder for the frame loop.
pub struct FrameDriver {
    session: SharedSession,
    frame_rate: u32,
}

impl FrameDriver {
    /// Drive `session` at the default frame rate.
    pub fn new(session: SharedSession) -> Self {
        Self {
            session,
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }

    /// Override the frame rate (clamped to 1..=1000 Hz).
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate.clamp(1, 1000);
        self
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(self) -> DriverHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session = self.session.clone();
        let task = tokio::spawn(run_frame_loop(self.session, self.frame_rate, shutdown_rx));
        DriverHandle {
            session,
            shutdown_tx,
            task,
        }
    }
}

/// Control handle for a running frame loop.
pub struct DriverHandle {
    session: SharedSession,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<DriverStats>,
}

impl DriverHandle {
    /// Signal the loop to stop after the current frame.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for the loop to end on its own.
    pub async fn join(self) -> DriverStats {
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Frame loop task failed: {}", e);
                DriverStats {
                    frames: 0,
                    game_over_frames: 0,
                    reason: StopReason::Shutdown,
                }
            }
        }
    }

    /// Stop the loop and wait for it.
    pub async fn stop(self) -> DriverStats {
        self.shutdown();
        self.join().await
    }

    /// Stop the loop, then tear the session down.
    ///
    /// The loop is gone before the session is reset, so no frame can touch
    /// the discarded run.
    pub async fn exit_session(self) -> DriverStats {
        let session = self.session.clone();
        let stats = self.stop().await;
        session.lock().await.exit_session();
        stats
    }
}

async fn run_frame_loop(
    session: SharedSession,
    frame_rate: u32,
    mut shutdown_rx: watch::Receiver<bool>,
) -> DriverStats {
    let frame_duration = Duration::from_micros(1_000_000 / frame_rate as u64);
    let mut frame_interval = interval(frame_duration);
    frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut frames = 0u64;
    let mut game_over_frames = 0u64;

    info!(frame_rate, "Frame loop started");

    let reason = loop {
        tokio::select! {
            _ = frame_interval.tick() => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break StopReason::Shutdown;
                }
                continue;
            }
        }

        if *shutdown_rx.borrow() {
            break StopReason::Shutdown;
        }

        let timestamp_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut guard = session.lock().await;
        if guard.status() == SessionStatus::NotStarted {
            break StopReason::SessionExited;
        }
        let result = guard.on_frame(timestamp_ms);
        drop(guard);

        frames += 1;
        if result.game_over {
            game_over_frames += 1;
        }
    };

    debug!(frames, game_over_frames, ?reason, "Frame loop stopped");
    DriverStats {
        frames,
        game_over_frames,
        reason,
    }
}
