//! Common API types and data structures

use crate::core::EntityId;
use serde::{Deserialize, Serialize};

/// Result type for engine operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Engine error types.
///
/// None of these are fatal: source-side failures are swallowed before they
/// reach the engine, and track failures surface as a notification.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackerError {
    /// Track requested with an empty path
    #[error("no track data available for {entity}")]
    NoTrackData { entity: EntityId },
    /// Position with NaN or infinite components
    #[error("non-finite position ({latitude}, {longitude})")]
    NonFinitePosition { latitude: f64, longitude: f64 },
    /// Invalid configuration value
    #[error("configuration error: invalid {parameter} = {value} ({reason})")]
    Configuration { parameter: String, value: String, reason: String },
    /// Upstream payload could not be decoded
    #[error("decode failure: {details}")]
    Decode { details: String },
    /// Operation attempted after teardown
    #[error("engine has been torn down")]
    TornDown,
}

/// Work the engine asks its host to perform outside the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostRequest {
    /// Poll the upstream for a full positions snapshot
    FetchSnapshot,
    /// Probe upstream health and version
    CheckHealth,
}

/// Running counters for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Animation frames executed
    pub frames_run: u64,
    /// Target writes applied
    pub targets_accepted: u64,
    /// Target writes refused as stale (timestamp-ordered mode only)
    pub targets_rejected: u64,
    /// Push events applied
    pub stream_events: u64,
    /// Snapshots applied
    pub snapshots: u64,
    /// Payloads dropped at the source boundary
    pub decode_failures: u64,
    /// Track sessions started
    pub tracks_started: u64,
    /// Track sessions that reached the end of their path
    pub tracks_completed: u64,
}
