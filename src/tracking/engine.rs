//! Position reconciliation engine
//!
//! Owns the entity registry, the target store and the rendered positions for
//! one viewing session, plus every timer that mutates them. Sources write
//! through the engine; the rendering layer reads snapshots from it.
//!
//! The engine is single-threaded and never blocks. Hosts drive it with three
//! callbacks:
//!
//! * [`TrackingEngine::advance`] with the current monotonic time, which fires
//!   elapsed timers and returns any [`HostRequest`] to fulfil;
//! * [`TrackingEngine::on_animation_frame`] once per display frame while
//!   [`TrackingEngine::wants_frame`] is true;
//! * the `ingest_*` / `apply_*` methods whenever upstream data arrives.

use crate::api::notifications::{CallbackHandle, Notification, NotificationCallback, NotificationHub, QueuedNotification};
use crate::api::types::{EngineStats, HostRequest, TrackerError, TrackerResult};
use crate::core::{Entity, EntityId, EntityUpdate, GeoPoint};
use crate::data::tracks::demo_track;
use crate::processing::eta::{arrivals_for_stop, Arrival, Stop};
use crate::sources::{BackendStatus, FeedParser, FeedResult, HealthReport};
use crate::timing::{TimerHandle, TimerKind, TimerSet};
use crate::tracking::interpolation::{FrameOutcome, InterpolationScheduler, SchedulerState};
use crate::tracking::registry::EntityRegistry;
use crate::tracking::targets::{TargetStore, TargetWrite};
use crate::tracking::track_player::{TrackPlayer, TrackSession, TrackStep};
use crate::utils::config::TrackerConfig;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    /// All timers cancelled; further writes are dropped
    TornDown,
}

/// A marker ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: EntityId,
    pub label: Option<String>,
    pub position: GeoPoint,
}

/// Reconciles push, poll and simulated updates into animated positions
pub struct TrackingEngine {
    config: TrackerConfig,
    registry: EntityRegistry,
    targets: TargetStore,
    scheduler: InterpolationScheduler,
    player: TrackPlayer,
    timers: TimerSet,
    notifications: NotificationHub,
    parser: FeedParser,
    backend: BackendStatus,
    stats: EngineStats,
    lifecycle: Lifecycle,
    poll_timer: Option<TimerHandle>,
    health_timer: Option<TimerHandle>,
    now: Duration,
}

impl TrackingEngine {
    /// Create an engine for one session
    pub fn new(config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        Ok(Self {
            registry: EntityRegistry::new(),
            targets: TargetStore::new(config.update_ordering),
            scheduler: InterpolationScheduler::new(config.convergence_fraction, config.convergence_epsilon),
            player: TrackPlayer::new(),
            timers: TimerSet::new(),
            notifications: NotificationHub::new(config.notification_ttl()),
            parser: FeedParser::new(),
            backend: BackendStatus::default(),
            stats: EngineStats::default(),
            lifecycle: Lifecycle::Active,
            poll_timer: None,
            health_timer: None,
            now: Duration::ZERO,
            config,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Swap tuning at runtime. Running poll/health timers are re-armed with
    /// the new intervals; an active track keeps the cadence it started with.
    pub fn update_config(&mut self, config: TrackerConfig) -> TrackerResult<()> {
        config.validate()?;
        self.scheduler.set_tuning(config.convergence_fraction, config.convergence_epsilon);
        self.targets.set_ordering(config.update_ordering);
        self.notifications.set_ttl(config.notification_ttl());
        let polling = self.poll_timer.is_some() || self.health_timer.is_some();
        self.config = config;
        if polling {
            self.stop_polling();
            self.start_polling(self.now)?;
        }
        Ok(())
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn ensure_active(&self) -> TrackerResult<()> {
        match self.lifecycle {
            Lifecycle::Active => Ok(()),
            Lifecycle::TornDown => {
                warn!("write after teardown ignored");
                Err(TrackerError::TornDown)
            }
        }
    }

    // Periodic sources

    /// Schedule the snapshot poll and the health probe, both due immediately.
    /// A no-op for timers that are already running.
    pub fn start_polling(&mut self, now: Duration) -> TrackerResult<()> {
        self.ensure_active()?;
        self.observe_time(now);
        if self.poll_timer.is_none() {
            self.poll_timer =
                Some(self.timers.schedule_every(TimerKind::Poll, self.config.poll_interval(), now));
        }
        if self.health_timer.is_none() {
            self.health_timer = Some(self.timers.schedule_every(
                TimerKind::HealthCheck,
                self.config.health_check_interval(),
                now,
            ));
        }
        Ok(())
    }

    /// Cancel the poll and health timers
    pub fn stop_polling(&mut self) {
        if let Some(handle) = self.poll_timer.take() {
            self.timers.cancel(handle);
        }
        if let Some(handle) = self.health_timer.take() {
            self.timers.cancel(handle);
        }
    }

    /// Fire every timer period elapsed up to `now`, in deadline order.
    ///
    /// Returns the I/O the host should perform, deduplicated.
    pub fn advance(&mut self, now: Duration) -> Vec<HostRequest> {
        let mut requests = Vec::new();
        if self.lifecycle == Lifecycle::TornDown {
            return requests;
        }
        self.observe_time(now);

        while let Some(firing) = self.timers.pop_due(now) {
            match firing.kind {
                TimerKind::Poll => push_unique(&mut requests, HostRequest::FetchSnapshot),
                TimerKind::HealthCheck => push_unique(&mut requests, HostRequest::CheckHealth),
                TimerKind::TrackTick => self.on_track_tick(firing.handle, firing.at),
            }
        }

        self.notifications.expire(now);
        requests
    }

    /// Earliest time `advance` has work to do
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    fn observe_time(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    // Reconciliation

    /// Record a convergence target for `id` (last write wins by default).
    ///
    /// A first-ever target seeds the rendered position directly; otherwise the
    /// interpolation loop is started if it is idle and the marker is not
    /// already there.
    pub fn assert_target(&mut self, id: &EntityId, position: GeoPoint) -> TrackerResult<TargetWrite> {
        self.ensure_active()?;
        let position = finite(id, position)?;
        Ok(self.apply_target(id, position, None))
    }

    fn apply_target(&mut self, id: &EntityId, position: GeoPoint, source_timestamp: Option<f64>) -> TargetWrite {
        let write = self.targets.assert_target(id, position, source_timestamp);
        match write {
            TargetWrite::Stale => {
                self.stats.targets_rejected += 1;
                warn!(entity = %id, ?source_timestamp, "stale target write refused");
            }
            TargetWrite::Created => {
                self.stats.targets_accepted += 1;
                self.scheduler.seed_if_absent(id, position);
                self.kick_if_needed(id, position);
            }
            TargetWrite::Replaced => {
                self.stats.targets_accepted += 1;
                self.kick_if_needed(id, position);
            }
        }
        write
    }

    fn kick_if_needed(&mut self, id: &EntityId, target: GeoPoint) {
        if self.scheduler.rendered(id) != Some(target) {
            self.scheduler.request_start();
        }
    }

    /// Insert or merge a registry record
    pub fn upsert(&mut self, update: EntityUpdate) -> TrackerResult<bool> {
        self.ensure_active()?;
        finite(&update.id, update.position)?;
        Ok(self.registry.upsert(update))
    }

    /// Replace the registry wholesale (rendered positions are untouched)
    pub fn replace_all(&mut self, snapshot: Vec<EntityUpdate>) -> TrackerResult<()> {
        self.ensure_active()?;
        for update in &snapshot {
            finite(&update.id, update.position)?;
        }
        self.registry.replace_all(snapshot);
        Ok(())
    }

    /// Apply one decoded push event: assert its target, then merge it into the
    /// registry unless the write was refused as stale
    pub fn apply_stream_update(&mut self, update: EntityUpdate) -> TrackerResult<TargetWrite> {
        self.ensure_active()?;
        finite(&update.id, update.position)?;
        let id = update.id.clone();
        let position = update.position;
        let source_timestamp = update.metadata.source_timestamp;

        let write = self.apply_target(&id, position, source_timestamp);
        if write.is_accepted() {
            self.registry.upsert(update);
        }
        self.stats.stream_events += 1;
        Ok(write)
    }

    /// Apply one decoded snapshot.
    ///
    /// Every item's target is asserted and the registry is replaced with the
    /// accepted items. An item refused as stale keeps its current registry
    /// record, so registry and target never disagree. Only vehicles without a
    /// rendered position are seeded; existing markers keep animating from
    /// where they are.
    pub fn apply_snapshot(&mut self, snapshot: Vec<EntityUpdate>) -> TrackerResult<usize> {
        self.ensure_active()?;
        for update in &snapshot {
            finite(&update.id, update.position)?;
        }

        let items = snapshot.len();
        let mut records = Vec::with_capacity(items);
        for update in snapshot {
            self.scheduler.seed_if_absent(&update.id, update.position);
            let write = self.apply_target(&update.id, update.position, update.metadata.source_timestamp);
            if write.is_accepted() {
                records.push(update);
            } else if let Some(kept) = self.registry.get(&update.id) {
                records.push(EntityUpdate::from(kept.clone()));
            }
        }
        self.registry.replace_all(records);

        self.stats.snapshots += 1;
        debug!(items, "snapshot applied");
        Ok(items)
    }

    /// Decode and apply a raw push frame. Failures are logged and dropped.
    ///
    /// Returns true if a position was applied.
    pub fn ingest_stream_frame(&mut self, frame: &str) -> bool {
        match self.parser.parse_stream_frame(frame) {
            Ok(Some(update)) => match self.apply_stream_update(update) {
                Ok(write) => write.is_accepted(),
                Err(error) => {
                    debug!(%error, "stream update dropped");
                    false
                }
            },
            Ok(None) => false,
            Err(error) => {
                self.stats.decode_failures += 1;
                debug!(%error, "stream frame dropped");
                false
            }
        }
    }

    /// Decode and apply a raw snapshot body. Failures are logged and dropped.
    ///
    /// Returns true if the snapshot was applied.
    pub fn ingest_snapshot_body(&mut self, body: &str) -> bool {
        let applied = self.parser.parse_snapshot(body).and_then(|updates| self.apply_snapshot(updates));
        match applied {
            Ok(_) => true,
            Err(error) => {
                if matches!(error, TrackerError::Decode { .. } | TrackerError::NonFinitePosition { .. }) {
                    self.stats.decode_failures += 1;
                }
                debug!(%error, "snapshot dropped");
                false
            }
        }
    }

    /// Fold a snapshot fetch result in; transport errors are swallowed
    pub fn ingest_snapshot_result(&mut self, result: FeedResult<String>) -> bool {
        match result {
            Ok(body) => self.ingest_snapshot_body(&body),
            Err(error) => {
                debug!(%error, "snapshot fetch failed; keeping last state");
                false
            }
        }
    }

    /// Fold a health probe result in, notifying on a flip
    pub fn record_health(&mut self, probe: FeedResult<HealthReport>) {
        if self.lifecycle == Lifecycle::TornDown {
            return;
        }
        if self.backend.record(probe) {
            info!(healthy = self.backend.healthy, version = %self.backend.version, "backend health changed");
            self.notifications.post(
                Notification::HealthChanged {
                    healthy: self.backend.healthy,
                    version: self.backend.version.clone(),
                },
                self.now,
            );
        }
    }

    pub fn backend_status(&self) -> &BackendStatus {
        &self.backend
    }

    // Animation

    /// Whether the host should deliver an animation frame
    pub fn wants_frame(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Advance every rendered position one step toward its target
    pub fn on_animation_frame(&mut self) -> FrameOutcome {
        let was_running = self.scheduler.is_running();
        let outcome = self.scheduler.step(&self.targets);
        if was_running {
            self.stats.frames_run += 1;
        }
        outcome
    }

    /// Stop the interpolation loop without waiting for convergence
    pub fn force_stop_animation(&mut self) -> bool {
        self.scheduler.force_stop()
    }

    // Simulated playback

    /// Replay `path` for `id`, one point per track tick.
    ///
    /// An empty path posts a "no track data" notification and fails without
    /// touching any state. Otherwise any running playback is cancelled first,
    /// the vehicle is registered if unknown, and its marker and target jump to
    /// `path[0]`.
    pub fn start_track(&mut self, id: &EntityId, path: Vec<GeoPoint>, now: Duration) -> TrackerResult<()> {
        self.ensure_active()?;
        self.observe_time(now);

        if path.is_empty() {
            self.notifications.post(Notification::NoTrackData { entity: id.clone() }, now);
            info!(entity = %id, "track requested without data");
            return Err(TrackerError::NoTrackData { entity: id.clone() });
        }
        for point in &path {
            finite(id, *point)?;
        }

        if let Some(replaced) = self.player.stop() {
            self.timers.cancel(replaced.timer);
            info!(entity = %replaced.entity, "track replaced");
        }

        let start = path[0];
        self.registry.ensure(id, start);
        self.scheduler.place(id, start);
        self.apply_target(id, start, None);

        let timer = self.timers.schedule_every(
            TimerKind::TrackTick,
            self.config.track_tick_interval(),
            now + self.config.track_tick_interval(),
        );
        let points = path.len();
        self.player.begin(id.clone(), path, timer);
        self.stats.tracks_started += 1;

        self.notifications.post(Notification::TrackStarted { entity: id.clone() }, now);
        info!(entity = %id, points, "track started");
        Ok(())
    }

    /// Start one of the built-in demo tracks (unknown names use the default loop)
    pub fn start_demo_track(&mut self, id: &EntityId, track_name: &str, now: Duration) -> TrackerResult<()> {
        self.start_track(id, demo_track(track_name), now)
    }

    /// Cancel the running playback without a completion notification
    pub fn stop_track(&mut self) -> Option<TrackSession> {
        let session = self.player.stop()?;
        self.timers.cancel(session.timer);
        info!(entity = %session.entity, "track stopped");
        Some(session)
    }

    pub fn active_track(&self) -> Option<&TrackSession> {
        self.player.active()
    }

    fn on_track_tick(&mut self, timer: TimerHandle, at: Duration) {
        match self.player.tick(timer) {
            TrackStep::Advance { entity, point, index } => {
                debug!(entity = %entity, index, "track tick");
                self.apply_target(&entity, point, None);
            }
            TrackStep::Completed { entity, timer } => {
                self.timers.cancel(timer);
                self.stats.tracks_completed += 1;
                self.notifications.post(Notification::TrackFinished { entity: entity.clone() }, at);
                info!(entity = %entity, "track finished");
            }
            TrackStep::Ignored => {
                // Orphaned timer; make sure it cannot fire again
                self.timers.cancel(timer);
            }
        }
    }

    // Notifications

    pub fn subscribe(&mut self, callback: NotificationCallback) -> CallbackHandle {
        self.notifications.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, handle: CallbackHandle) -> bool {
        self.notifications.unsubscribe(handle)
    }

    /// Take every queued, unexpired notification
    pub fn drain_notifications(&mut self) -> Vec<QueuedNotification> {
        self.notifications.drain()
    }

    pub fn pending_notifications(&self) -> impl Iterator<Item = &QueuedNotification> {
        self.notifications.pending()
    }

    // Read side

    pub fn rendered_position(&self, id: &EntityId) -> Option<GeoPoint> {
        self.scheduler.rendered(id)
    }

    pub fn rendered_positions(&self) -> HashMap<EntityId, GeoPoint> {
        self.scheduler.rendered_snapshot()
    }

    pub fn target(&self, id: &EntityId) -> Option<GeoPoint> {
        self.targets.get(id)
    }

    pub fn all_targets(&self) -> HashMap<EntityId, GeoPoint> {
        self.targets.all_targets()
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    pub fn entities(&self) -> &[Entity] {
        self.registry.entities()
    }

    /// Registry entries in order, positioned at their rendered location
    pub fn markers(&self) -> Vec<Marker> {
        self.registry
            .entities()
            .iter()
            .map(|e| Marker {
                id: e.id.clone(),
                label: e.label.clone(),
                position: self.scheduler.rendered(&e.id).unwrap_or(e.position),
            })
            .collect()
    }

    /// Soonest arrivals at `stop`
    pub fn arrivals_for_stop(&self, stop: &Stop) -> Vec<Arrival> {
        arrivals_for_stop(
            self.registry.entities(),
            &self.scheduler.rendered_snapshot(),
            stop,
            &self.config.eta,
        )
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn active_timer_count(&self) -> usize {
        self.timers.active_count()
    }

    // Teardown

    /// End the session: cancel every timer and the track, stop animating, and
    /// drop any later writes. Returns the number of timers cancelled.
    pub fn teardown(&mut self) -> usize {
        if self.lifecycle == Lifecycle::TornDown {
            return 0;
        }
        self.player.stop();
        self.poll_timer = None;
        self.health_timer = None;
        let cancelled = self.timers.cancel_all();
        self.scheduler.force_stop();
        self.notifications.clear();
        self.lifecycle = Lifecycle::TornDown;
        info!(cancelled, "tracking session torn down");
        cancelled
    }
}

fn finite(id: &EntityId, position: GeoPoint) -> TrackerResult<GeoPoint> {
    GeoPoint::checked(position.lat, position.lng).inspect_err(|_| {
        warn!(entity = %id, lat = position.lat, lng = position.lng, "non-finite position rejected");
    })
}

fn push_unique(requests: &mut Vec<HostRequest>, request: HostRequest) {
    if !requests.contains(&request) {
        requests.push(request);
    }
}
