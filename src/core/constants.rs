//! Default tuning values for reconciliation, playback and polling

/// Fraction of the remaining distance closed per animation frame
pub const DEFAULT_CONVERGENCE_FRACTION: f64 = 0.25;

/// Distance (degrees) below which a rendered position snaps to its target
pub const DEFAULT_CONVERGENCE_EPSILON: f64 = 0.00001;

/// Smallest accepted snap distance; finer values are below f64 resolution at map coordinates
pub const MIN_CONVERGENCE_EPSILON: f64 = 1e-12;

/// Animation frame cadence for hosts without a native frame callback (~60 Hz)
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Time between simulated track samples
pub const DEFAULT_TRACK_TICK_INTERVAL_MS: u64 = 5000;

/// Time between full snapshot polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Time between backend health checks
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 10_000;

/// Lifetime of a queued notification
pub const DEFAULT_NOTIFICATION_TTL_MS: u64 = 4000;

/// Placeholder ETA attached to every polled entity
pub const POLL_PLACEHOLDER_ETA_MINUTES: u32 = 5;

/// Average bus speed used by the naive ETA estimate
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 25.0;

/// Rough kilometres per degree of latitude/longitude
pub const DEFAULT_KM_PER_DEGREE: f64 = 111.0;

/// Rows shown on an arrivals board
pub const DEFAULT_MAX_ARRIVALS: usize = 6;
