//! Reconciliation of vehicle positions into animated markers

pub mod engine;
pub mod interpolation;
pub mod registry;
pub mod targets;
pub mod track_player;

pub use engine::{Lifecycle, Marker, TrackingEngine};
pub use interpolation::{FrameOutcome, InterpolationScheduler, SchedulerState};
pub use registry::EntityRegistry;
pub use targets::{TargetStore, TargetWrite};
pub use track_player::{TrackPlayer, TrackSession, TrackStep};
