//! Built-in data sets

pub mod tracks;

pub use tracks::{demo_track, demo_track_names, DEFAULT_TRACK};
