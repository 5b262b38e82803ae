//! Core types and constants for the tracking engine

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
