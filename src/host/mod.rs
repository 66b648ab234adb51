//! Async Host
//!
//! Runs a [`GameSession`](crate::game::GameSession) on a tokio timer for
//! hosts that do not have a render loop of their own.

pub mod driver;

pub use driver::{DriverHandle, DriverStats, FrameDriver, SharedSession, StopReason};
