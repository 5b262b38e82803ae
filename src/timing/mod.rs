//! Host-clock timer primitives

pub mod timers;

pub use timers::{Firing, TimerHandle, TimerKind, TimerSet};
