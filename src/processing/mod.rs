//! Derived views over tracked positions

pub mod eta;

pub use eta::{arrivals_for_stop, estimate_eta_minutes, Arrival, Stop};
