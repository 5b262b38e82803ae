//! Backend health bookkeeping

use crate::sources::error::FeedResult;
use crate::sources::feed::HealthReport;

/// Last known upstream status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStatus {
    pub healthy: bool,
    pub version: String,
    /// Consecutive failed probes
    pub consecutive_failures: u32,
}

impl BackendStatus {
    /// Fold a probe result in. Any failure means unhealthy with no version.
    ///
    /// Returns true when the healthy flag flipped.
    pub fn record(&mut self, probe: FeedResult<HealthReport>) -> bool {
        let was_healthy = self.healthy;
        match probe {
            Ok(report) => {
                self.healthy = report.healthy;
                self.version = report.version;
                self.consecutive_failures = if report.healthy { 0 } else { self.consecutive_failures + 1 };
            }
            Err(error) => {
                tracing::debug!(%error, "health probe failed");
                self.healthy = false;
                self.version.clear();
                self.consecutive_failures += 1;
            }
        }
        was_healthy != self.healthy
    }
}
