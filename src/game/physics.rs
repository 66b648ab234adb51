//! Jump Physics
//!
//! Discrete integrator for the vertical axis. One call to [`step`] is one
//! physics tick; the tick pipeline decides how many are due from the
//! fixed-step accumulator.

use crate::game::config::GameConfig;
use crate::game::state::Character;

/// Outcome of a physics tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhysicsStep {
    /// Character was on the ground; nothing moved.
    Grounded,
    /// Still airborne.
    Airborne,
    /// Touched down this tick.
    Landed,
}

/// Advance the character by one physics tick.
///
/// `v -= gravity; y += v`, landing (clamped to the ground) once `y <= 0`.
pub fn step(character: &mut Character, config: &GameConfig) -> PhysicsStep {
    if !character.is_jumping {
        return PhysicsStep::Grounded;
    }

    character.vertical_velocity -= config.gravity;
    character.vertical_position += character.vertical_velocity;

    if character.vertical_position <= 0.0 {
        character.vertical_position = 0.0;
        character.vertical_velocity = 0.0;
        character.is_jumping = false;
        return PhysicsStep::Landed;
    }

    PhysicsStep::Airborne
}

/// Height after `n` physics ticks of an uninterrupted jump.
///
/// Closed form of the integrator: `n·F − G·n(n+1)/2`, floored at zero.
pub fn height_after(config: &GameConfig, n: u32) -> f64 {
    let n = n as f64;
    (n * config.jump_force - config.gravity * n * (n + 1.0) / 2.0).max(0.0)
}
