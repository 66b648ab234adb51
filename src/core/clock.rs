//! Session Clock
//!
//! Turns wall-clock frame timestamps into per-tick elapsed time, and
//! splits elapsed time into fixed physics steps.

use serde::{Serialize, Deserialize};

/// Largest frame delta accepted, in milliseconds.
///
/// A tab switch or a debugger stop can produce a multi-second gap;
/// everything beyond this is dropped rather than simulated.
pub const MAX_FRAME_DELTA_MS: f64 = 250.0;

/// Maximum fixed steps run for a single frame.
pub const MAX_PHYSICS_STEPS: u32 = 8;

/// Converts absolute frame timestamps into clamped deltas.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionClock {
    last_timestamp_ms: Option<f64>,
}

impl SessionClock {
    /// Create a clock that has not seen a frame yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame timestamp and return the elapsed time since the
    /// previous one.
    ///
    /// The first frame after creation or [`reset`](Self::reset) yields 0.
    /// Timestamps going backwards yield 0; gaps are capped at
    /// [`MAX_FRAME_DELTA_MS`]. Non-finite timestamps are ignored.
    pub fn frame(&mut self, timestamp_ms: f64) -> f64 {
        if !timestamp_ms.is_finite() {
            return 0.0;
        }
        let elapsed = match self.last_timestamp_ms {
            Some(last) => clamp_elapsed(timestamp_ms - last),
            None => 0.0,
        };
        self.last_timestamp_ms = Some(timestamp_ms);
        elapsed
    }

    /// Forget the previous timestamp (restart, resume after pause).
    pub fn reset(&mut self) {
        self.last_timestamp_ms = None;
    }
}

/// Clamp a caller-supplied elapsed time into `[0, MAX_FRAME_DELTA_MS]`.
///
/// NaN maps to 0 so a bad delta can never poison the score accumulator.
#[inline]
pub fn clamp_elapsed(elapsed_ms: f64) -> f64 {
    if elapsed_ms.is_nan() || elapsed_ms <= 0.0 {
        0.0
    } else {
        elapsed_ms.min(MAX_FRAME_DELTA_MS)
    }
}

/// Fixed-timestep accumulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedStep {
    step_ms: f64,
    accumulated_ms: f64,
}

impl FixedStep {
    /// Create an accumulator for steps of `step_ms` milliseconds.
    pub fn new(step_ms: f64) -> Self {
        Self {
            step_ms,
            accumulated_ms: 0.0,
        }
    }

    /// Time carried over towards the next step.
    pub fn accumulated_ms(&self) -> f64 {
        self.accumulated_ms
    }

    /// Add elapsed time and return how many whole steps are due.
    ///
    /// At most [`MAX_PHYSICS_STEPS`] are returned; any backlog beyond
    /// that is discarded so a slow frame cannot snowball.
    pub fn advance(&mut self, elapsed_ms: f64) -> u32 {
        if self.step_ms <= 0.0 {
            return 0;
        }
        self.accumulated_ms += clamp_elapsed(elapsed_ms);

        let mut steps = 0;
        while self.accumulated_ms >= self.step_ms && steps < MAX_PHYSICS_STEPS {
            self.accumulated_ms -= self.step_ms;
            steps += 1;
        }
        if steps == MAX_PHYSICS_STEPS && self.accumulated_ms >= self.step_ms {
            self.accumulated_ms %= self.step_ms;
        }
        steps
    }

    /// Drop any carried time.
    pub fn reset(&mut self) {
        self.accumulated_ms = 0.0;
    }
}
