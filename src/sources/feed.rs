//! Upstream feed abstraction
//!
//! The engine never performs network I/O itself. A host plugs in an
//! [`UpstreamFeed`] implementation (SSE/HTTP client, replay file, mock) and
//! the driver pulls from it on the engine's behalf.

use crate::sources::error::FeedResult;

/// Answer from a health probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    /// Service reported itself healthy
    pub healthy: bool,
    /// Service version string, empty when unknown
    pub version: String,
}

/// Source of raw upstream data
pub trait UpstreamFeed {
    /// Drain push frames received since the last call.
    /// Returns an empty vector when nothing arrived (non-blocking).
    fn poll_stream(&mut self) -> FeedResult<Vec<String>>;

    /// Fetch one full positions snapshot body
    fn fetch_snapshot(&mut self) -> FeedResult<String>;

    /// Probe upstream health and version
    fn check_health(&mut self) -> FeedResult<HealthReport>;

    /// Close any open stream; called on teardown
    fn close(&mut self) {}
}
