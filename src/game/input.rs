//! Input Mapping, Queueing and Recording
//!
//! Raw key/pointer events become [`ControlIntent`]s. Pause toggles act
//! immediately; character [`Command`]s wait in a bounded [`InputQueue`]
//! that the tick drains at its start. Every applied command is kept in an
//! [`InputRecording`] so a run can be replayed exactly.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

// =============================================================================
// ACTIONS AND COMMANDS
// =============================================================================

/// Logical action a button is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputAction {
    /// Switch one lane left.
    MoveLeft,
    /// Switch one lane right.
    MoveRight,
    /// Jump.
    Jump,
    /// Slide while held.
    Slide,
}

impl InputAction {
    /// Look up an action by name.
    ///
    /// Accepts `moveLeft`, `move_left`, `left` and similar spellings in any
    /// case. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "moveleft" | "left" => Some(InputAction::MoveLeft),
            "moveright" | "right" => Some(InputAction::MoveRight),
            "jump" | "up" => Some(InputAction::Jump),
            "slide" | "down" => Some(InputAction::Slide),
            _ => None,
        }
    }
}

/// A discrete character intent, applied at the start of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    /// Lane - 1, floored at 0.
    MoveLeft = 0,
    /// Lane + 1, capped at the last lane.
    MoveRight = 1,
    /// Jump if grounded.
    Jump = 2,
    /// Start sliding.
    SlideStart = 3,
    /// Stop sliding.
    SlideEnd = 4,
}

impl Command {
    /// Translate an action press or release into a command.
    ///
    /// Only slide has a release command; other releases map to `None`.
    pub fn from_action(action: InputAction, pressed: bool) -> Option<Self> {
        match (action, pressed) {
            (InputAction::MoveLeft, true) => Some(Command::MoveLeft),
            (InputAction::MoveRight, true) => Some(Command::MoveRight),
            (InputAction::Jump, true) => Some(Command::Jump),
            (InputAction::Slide, true) => Some(Command::SlideStart),
            (InputAction::Slide, false) => Some(Command::SlideEnd),
            _ => None,
        }
    }
}

/// Result of mapping a raw input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlIntent {
    /// Character command, queued for the next tick.
    Command(Command),
    /// Flip between Active and Paused, applied immediately.
    TogglePause,
}

// =============================================================================
// RAW EVENT MAPPING
// =============================================================================

/// Map a keyboard key (DOM `key` naming) to an intent.
pub fn map_key(key: &str, pressed: bool) -> Option<ControlIntent> {
    let action = match key {
        "ArrowUp" | "w" | "W" => InputAction::Jump,
        "ArrowDown" | "s" | "S" => InputAction::Slide,
        "ArrowLeft" | "a" | "A" => InputAction::MoveLeft,
        "ArrowRight" | "d" | "D" => InputAction::MoveRight,
        "Escape" | "p" | "P" => {
            return pressed.then_some(ControlIntent::TogglePause);
        }
        _ => return None,
    };
    Command::from_action(action, pressed).map(ControlIntent::Command)
}

/// Direction tag carried by on-screen touch and mouse buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerDirection {
    /// Jump button.
    Up,
    /// Slide button.
    Down,
    /// Left button.
    Left,
    /// Right button.
    Right,
}

impl PointerDirection {
    /// Parse `up|down|left|right`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "up" => Some(PointerDirection::Up),
            "down" => Some(PointerDirection::Down),
            "left" => Some(PointerDirection::Left),
            "right" => Some(PointerDirection::Right),
            _ => None,
        }
    }

    fn action(self) -> InputAction {
        match self {
            PointerDirection::Up => InputAction::Jump,
            PointerDirection::Down => InputAction::Slide,
            PointerDirection::Left => InputAction::MoveLeft,
            PointerDirection::Right => InputAction::MoveRight,
        }
    }
}

/// Map a touch or mouse button press/release to an intent.
///
/// Only `down` has a release action (end of slide).
pub fn map_pointer(direction: PointerDirection, pressed: bool) -> Option<ControlIntent> {
    Command::from_action(direction.action(), pressed).map(ControlIntent::Command)
}

// =============================================================================
// INPUT QUEUE
// =============================================================================

/// Bounded queue of pending commands.
///
/// Producers on any thread hold an [`InputSender`]; the simulation drains
/// everything pending at the start of each tick.
pub struct InputQueue {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
    capacity: usize,
}

impl InputQueue {
    /// Create a queue holding at most `capacity` commands.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Create a sender handle for another thread.
    pub fn sender(&self) -> InputSender {
        InputSender {
            sender: self.sender.clone(),
        }
    }

    /// Try to queue a command (non-blocking).
    ///
    /// Returns false if the queue is full; the command is dropped.
    #[inline]
    pub fn try_submit(&self, command: Command) -> bool {
        submit(&self.sender, command).is_ok()
    }

    /// Drain all pending commands in submission order.
    pub fn drain(&self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }

    /// Number of pending commands.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Check if nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for InputQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputQueue")
            .field("pending", &self.receiver.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Clonable producer handle for an [`InputQueue`].
#[derive(Clone, Debug)]
pub struct InputSender {
    sender: Sender<Command>,
}

impl InputSender {
    /// Queue a command (non-blocking).
    pub fn try_send(&self, command: Command) -> Result<(), InputQueueError> {
        submit(&self.sender, command)
    }

    /// Queue a command, returning false if it was dropped.
    pub fn try_submit(&self, command: Command) -> bool {
        self.try_send(command).is_ok()
    }

    /// Queue the command for an action press or release.
    ///
    /// Releases without a command (everything but slide) are accepted
    /// and do nothing.
    pub fn submit_action(&self, action: InputAction, pressed: bool) -> bool {
        match Command::from_action(action, pressed) {
            Some(command) => self.try_submit(command),
            None => true,
        }
    }
}

fn submit(sender: &Sender<Command>, command: Command) -> Result<(), InputQueueError> {
    sender.try_send(command).map_err(|e| match e {
        TrySendError::Full(command) => {
            debug!("Input queue full, dropping {:?}", command);
            InputQueueError::Full
        }
        TrySendError::Disconnected(_) => InputQueueError::Disconnected,
    })
}

/// Input queue errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputQueueError {
    /// Queue is full (backpressure).
    #[error("input queue is full")]
    Full,
    /// Session dropped.
    #[error("input queue is disconnected")]
    Disconnected,
}

// =============================================================================
// RECORDING
// =============================================================================

/// A command together with the tick it was applied at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedInput {
    /// Tick the command was applied at the start of.
    pub tick: u64,
    /// The command.
    pub command: Command,
}

/// Every command applied during one run, in order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecording {
    inputs: Vec<RecordedInput>,
}

impl InputRecording {
    /// Create an empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command applied at `tick`.
    pub fn record(&mut self, tick: u64, command: Command) {
        self.inputs.push(RecordedInput { tick, command });
    }

    /// All recorded inputs.
    pub fn inputs(&self) -> &[RecordedInput] {
        &self.inputs
    }

    /// Number of recorded inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Commands applied at a specific tick.
    pub fn commands_at(&self, tick: u64) -> impl Iterator<Item = Command> + '_ {
        let start = self.inputs.partition_point(|i| i.tick < tick);
        self.inputs[start..]
            .iter()
            .take_while(move |i| i.tick == tick)
            .map(|i| i.command)
    }

    /// Check that ticks never go backwards.
    pub fn validate(&self) -> Result<(), ReplayError> {
        for pair in self.inputs.windows(2) {
            if pair[1].tick < pair[0].tick {
                return Err(ReplayError::OutOfOrder {
                    previous: pair[0].tick,
                    tick: pair[1].tick,
                });
            }
        }
        Ok(())
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bincode and validate ordering.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReplayError> {
        let recording: Self = bincode::deserialize(bytes)?;
        recording.validate()?;
        Ok(recording)
    }
}

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Recording bytes could not be decoded.
    #[error("failed to decode recording: {0}")]
    Codec(#[from] bincode::Error),

    /// A recorded tick is earlier than the one before it.
    #[error("recorded input at tick {tick} follows tick {previous}")]
    OutOfOrder {
        /// Tick of the earlier entry.
        previous: u64,
        /// Offending tick.
        tick: u64,
    },

    /// Inputs remain after the replayed frames ran out.
    #[error("{remaining} recorded inputs were never applied (replay stopped at tick {stopped_at})")]
    Unconsumed {
        /// Inputs not applied.
        remaining: usize,
        /// Tick the replay stopped at.
        stopped_at: u64,
    },
}

// =============================================================================
// TESTS
// =============================================================================
