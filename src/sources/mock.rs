//! Mock upstream feed for testing and demos

use crate::core::EntityId;
use crate::sources::error::{FeedError, FeedResult};
use crate::sources::feed::{HealthReport, UpstreamFeed};
use crate::sources::parser::PositionPayload;
use std::collections::VecDeque;

/// Scriptable in-memory upstream
pub struct MockFeed {
    stream_queue: VecDeque<String>,
    snapshots: VecDeque<FeedResult<String>>,
    /// Served when the snapshot script is exhausted
    fallback_snapshot: String,
    health: HealthReport,
    connected: bool,
    failures_to_inject: u32,
    snapshot_requests: u32,
    health_requests: u32,
    closed: bool,
}

impl MockFeed {
    /// Create a connected, healthy feed with an empty snapshot
    pub fn new() -> Self {
        Self {
            stream_queue: VecDeque::new(),
            snapshots: VecDeque::new(),
            fallback_snapshot: "[]".to_string(),
            health: HealthReport { healthy: true, version: "mock-1.0".to_string() },
            connected: true,
            failures_to_inject: 0,
            snapshot_requests: 0,
            health_requests: 0,
            closed: false,
        }
    }

    /// Queue a raw push frame
    pub fn push_frame(&mut self, frame: impl Into<String>) {
        self.stream_queue.push_back(frame.into());
    }

    /// Queue a well-formed position event
    pub fn push_position(&mut self, bus_id: impl Into<EntityId>, latitude: f64, longitude: f64) {
        let payload = PositionPayload {
            bus_id: bus_id.into(),
            latitude,
            longitude,
            heading: None,
            speed: None,
            timestamp: None,
        };
        let envelope = serde_json::json!({ "type": "position", "payload": payload });
        self.push_frame(format!("data: {}", envelope));
    }

    /// Script the next snapshot response
    pub fn queue_snapshot(&mut self, response: FeedResult<String>) {
        self.snapshots.push_back(response);
    }

    /// Snapshot served once the script runs out
    pub fn set_fallback_snapshot(&mut self, body: impl Into<String>) {
        self.fallback_snapshot = body.into();
    }

    pub fn set_health(&mut self, healthy: bool, version: impl Into<String>) {
        self.health = HealthReport { healthy, version: version.into() };
    }

    /// Make the next `count` requests of any kind fail with a timeout
    pub fn inject_failures(&mut self, count: u32) {
        self.failures_to_inject = count;
    }

    /// Simulate connection loss
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Restore connection
    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    pub fn queued_frame_count(&self) -> usize {
        self.stream_queue.len()
    }

    pub fn snapshot_requests(&self) -> u32 {
        self.snapshot_requests
    }

    pub fn health_requests(&self) -> u32 {
        self.health_requests
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_link(&mut self) -> FeedResult<()> {
        if !self.connected {
            return Err(FeedError::ConnectionLost);
        }
        if self.failures_to_inject > 0 {
            self.failures_to_inject -= 1;
            return Err(FeedError::Timeout { timeout_ms: 1000 });
        }
        Ok(())
    }
}

impl Default for MockFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamFeed for MockFeed {
    fn poll_stream(&mut self) -> FeedResult<Vec<String>> {
        self.check_link()?;
        Ok(self.stream_queue.drain(..).collect())
    }

    fn fetch_snapshot(&mut self) -> FeedResult<String> {
        self.snapshot_requests += 1;
        self.check_link()?;
        match self.snapshots.pop_front() {
            Some(response) => response,
            None => Ok(self.fallback_snapshot.clone()),
        }
    }

    fn check_health(&mut self) -> FeedResult<HealthReport> {
        self.health_requests += 1;
        self.check_link()?;
        Ok(self.health.clone())
    }

    fn close(&mut self) {
        self.closed = true;
        self.stream_queue.clear();
    }
}
