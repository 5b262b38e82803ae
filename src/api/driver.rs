//! Host loop around a [`TrackingEngine`]
//!
//! The driver owns the engine and an [`UpstreamFeed`], measures monotonic
//! time from its own origin, and performs the I/O the engine asks for. Other
//! threads hand data in through a [`SourceSender`]; everything is applied on
//! the thread that calls [`EngineDriver::pump`].

use crate::api::types::{HostRequest, TrackerResult};
use crate::core::{EntityId, EntityUpdate, GeoPoint};
use crate::sources::{RecoveryStrategy, UpstreamFeed};
use crate::tracking::{FrameOutcome, Lifecycle, TrackingEngine};
use crate::utils::config::TrackerConfig;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, info, warn};
use web_time::Instant;

/// Data queued for the engine from outside the pump thread
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMessage {
    /// Raw push frame
    Frame(String),
    /// Raw snapshot body
    Snapshot(String),
    /// Already-decoded update
    Update(EntityUpdate),
    /// Start simulated playback
    StartTrack { entity: EntityId, path: Vec<GeoPoint> },
}

/// Cloneable handle for feeding a driver from other threads
#[derive(Debug, Clone)]
pub struct SourceSender {
    tx: Sender<SourceMessage>,
}

impl SourceSender {
    /// Queue a message; false once the driver is gone
    pub fn send(&self, message: SourceMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn send_frame(&self, frame: impl Into<String>) -> bool {
        self.send(SourceMessage::Frame(frame.into()))
    }

    pub fn send_snapshot(&self, body: impl Into<String>) -> bool {
        self.send(SourceMessage::Snapshot(body.into()))
    }
}

/// What one pump did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PumpReport {
    /// Queued messages and stream frames processed
    pub messages: usize,
    /// Host requests fulfilled
    pub requests: Vec<HostRequest>,
    /// Animation frame run this pump, if one was due
    pub frame: Option<FrameOutcome>,
}

/// Drives one engine against one upstream feed
pub struct EngineDriver<F: UpstreamFeed> {
    engine: TrackingEngine,
    feed: F,
    origin: Instant,
    inbox: Receiver<SourceMessage>,
    tx: Sender<SourceMessage>,
    last_frame: Option<Duration>,
}

impl<F: UpstreamFeed> EngineDriver<F> {
    /// Build a driver and start the periodic poll and health timers
    pub fn new(config: TrackerConfig, feed: F) -> TrackerResult<Self> {
        let mut engine = TrackingEngine::new(config)?;
        engine.start_polling(Duration::ZERO)?;
        let (tx, inbox) = mpsc::channel();
        Ok(Self {
            engine,
            feed,
            origin: Instant::now(),
            inbox,
            tx,
            last_frame: None,
        })
    }

    pub fn sender(&self) -> SourceSender {
        SourceSender { tx: self.tx.clone() }
    }

    pub fn engine(&self) -> &TrackingEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TrackingEngine {
        &mut self.engine
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    /// Time since the driver was created
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Run one host iteration at the current wall-clock time
    pub fn pump(&mut self) -> PumpReport {
        let now = self.elapsed();
        self.pump_at(now)
    }

    /// Run one host iteration at `now`.
    ///
    /// Order: queued messages, pending push frames, elapsed timers (with the
    /// I/O they request), then at most one animation frame per frame interval.
    pub fn pump_at(&mut self, now: Duration) -> PumpReport {
        let mut report = PumpReport::default();
        if self.engine.lifecycle() == Lifecycle::TornDown {
            return report;
        }

        while let Ok(message) = self.inbox.try_recv() {
            self.dispatch(message, now);
            report.messages += 1;
        }

        match self.feed.poll_stream() {
            Ok(frames) => {
                for frame in frames {
                    self.engine.ingest_stream_frame(&frame);
                    report.messages += 1;
                }
            }
            Err(error) => match error.recovery_strategy() {
                RecoveryStrategy::Reconnect => warn!(%error, "stream lost; waiting for reconnect"),
                RecoveryStrategy::RetryNextCycle => debug!(%error, "stream read failed"),
            },
        }

        report.requests = self.engine.advance(now);
        for request in &report.requests {
            match request {
                HostRequest::FetchSnapshot => {
                    let body = self.feed.fetch_snapshot();
                    self.engine.ingest_snapshot_result(body);
                }
                HostRequest::CheckHealth => {
                    let probe = self.feed.check_health();
                    self.engine.record_health(probe);
                }
            }
        }

        if self.engine.wants_frame() && self.frame_due(now) {
            report.frame = Some(self.engine.on_animation_frame());
            self.last_frame = Some(now);
        }
        report
    }

    fn frame_due(&self, now: Duration) -> bool {
        match self.last_frame {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.engine.config().frame_interval(),
        }
    }

    fn dispatch(&mut self, message: SourceMessage, now: Duration) {
        match message {
            SourceMessage::Frame(frame) => {
                self.engine.ingest_stream_frame(&frame);
            }
            SourceMessage::Snapshot(body) => {
                self.engine.ingest_snapshot_body(&body);
            }
            SourceMessage::Update(update) => {
                if let Err(error) = self.engine.apply_stream_update(update) {
                    debug!(%error, "queued update dropped");
                }
            }
            SourceMessage::StartTrack { entity, path } => {
                if let Err(error) = self.engine.start_track(&entity, path, now) {
                    info!(%error, "track not started");
                }
            }
        }
    }

    /// Tear the engine down and close the feed
    pub fn teardown(&mut self) {
        self.engine.teardown();
        self.feed.close();
        while self.inbox.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FeedError, MockFeed};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn driver() -> EngineDriver<MockFeed> {
        EngineDriver::new(TrackerConfig::default(), MockFeed::new()).unwrap()
    }

    #[test]
    fn test_first_pump_polls_and_probes() {
        let mut driver = driver();
        driver.feed_mut().set_fallback_snapshot(r#"[{"bus_id":1,"latitude":15.15,"longitude":76.93}]"#);

        let report = driver.pump_at(ms(0));
        assert_eq!(report.requests, vec![HostRequest::FetchSnapshot, HostRequest::CheckHealth]);
        assert_eq!(driver.feed().snapshot_requests(), 1);
        assert_eq!(driver.feed().health_requests(), 1);
        assert!(driver.engine().backend_status().healthy);
        assert_eq!(driver.engine().entities().len(), 1);
        assert_eq!(
            driver.engine().rendered_position(&"1".into()),
            Some(GeoPoint::new(15.15, 76.93))
        );

        // Nothing due until the next poll period
        assert!(driver.pump_at(ms(5_000)).requests.is_empty());
        assert_eq!(driver.pump_at(ms(10_000)).requests.len(), 2);
    }

    #[test]
    fn test_stream_frames_animate_at_frame_rate() {
        let mut driver = driver();
        driver.pump_at(ms(0));

        driver.feed_mut().push_position(5u64, 15.0, 76.0);
        driver.pump_at(ms(1));
        driver.feed_mut().push_position(5u64, 15.01, 76.0);

        let report = driver.pump_at(ms(2));
        assert_eq!(report.messages, 1);
        assert!(report.frame.is_some());

        // Too soon for another frame
        assert!(driver.pump_at(ms(10)).frame.is_none());
        assert!(driver.pump_at(ms(18)).frame.is_some());
    }

    #[test]
    fn test_sender_queues_from_other_threads() {
        let mut driver = driver();
        let sender = driver.sender();
        let handle = std::thread::spawn(move || {
            sender.send_frame(r#"data: {"type":"position","payload":{"bus_id":"T","latitude":1.0,"longitude":2.0}}"#)
        });
        assert!(handle.join().unwrap());

        let report = driver.pump_at(ms(0));
        assert_eq!(report.messages, 1);
        assert_eq!(driver.engine().target(&"T".into()), Some(GeoPoint::new(1.0, 2.0)));
    }

    #[test]
    fn test_feed_failures_are_swallowed() {
        let mut driver = driver();
        driver.feed_mut().queue_snapshot(Err(FeedError::HttpStatus { status: 503 }));
        driver.feed_mut().disconnect();

        let report = driver.pump_at(ms(0));
        assert_eq!(report.requests.len(), 2);
        assert!(!driver.engine().backend_status().healthy);
        assert!(driver.engine().entities().is_empty());
    }

    #[test]
    fn test_queued_track_plays_through_driver() {
        let config = TrackerConfig { track_tick_interval_ms: 100, ..TrackerConfig::default() };
        let mut driver = EngineDriver::new(config, MockFeed::new()).unwrap();
        let path = vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(1.0, 1.001)];
        driver.sender().send(SourceMessage::StartTrack { entity: "sim".into(), path });

        driver.pump_at(ms(0));
        assert!(driver.engine().active_track().is_some());
        driver.pump_at(ms(100));
        assert_eq!(driver.engine().target(&"sim".into()), Some(GeoPoint::new(1.0, 1.001)));
        driver.pump_at(ms(200));
        assert!(driver.engine().active_track().is_none());
        assert_eq!(driver.engine().stats().tracks_completed, 1);
    }

    #[test]
    fn test_teardown_closes_feed_and_stops_pumping() {
        let mut driver = driver();
        driver.pump_at(ms(0));
        driver.teardown();

        assert!(driver.feed().is_closed());
        let report = driver.pump_at(ms(60_000));
        assert!(report.requests.is_empty());
        assert_eq!(driver.feed().snapshot_requests(), 1);
    }
}
