//! Bus Line Tracker
//!
//! Position reconciliation and interpolation for a live bus map. Vehicle
//! positions arrive from a push stream, a periodic snapshot poll and
//! simulated track playback; the engine merges them into one target per
//! vehicle and animates rendered markers toward those targets frame by frame.

pub mod api;
pub mod core;
pub mod data;
pub mod processing;
pub mod sources;
pub mod timing;
pub mod tracking;
pub mod utils;

// Re-export commonly used types
pub use api::{
    EngineDriver, EngineStats, HostRequest, Notification, PumpReport, SourceMessage, SourceSender,
    TrackerError, TrackerResult,
};
pub use core::{Entity, EntityId, EntityMetadata, EntityUpdate, GeoPoint};
pub use processing::{Arrival, Stop};
pub use sources::{FeedError, FeedParser, MockFeed, UpstreamFeed};
pub use tracking::{FrameOutcome, Marker, SchedulerState, TargetWrite, TrackingEngine};
pub use utils::{ConfigurationManager, TrackerConfig, UpdateOrdering};
