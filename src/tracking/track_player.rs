//! Simulated playback of a pre-authored path for one vehicle

use crate::core::{EntityId, GeoPoint};
use crate::timing::TimerHandle;

/// The single live playback
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSession {
    pub entity: EntityId,
    pub path: Vec<GeoPoint>,
    /// Index of the point most recently asserted
    pub index: usize,
    /// Tick timer driving this session
    pub timer: TimerHandle,
}

impl TrackSession {
    pub fn current_point(&self) -> Option<GeoPoint> {
        self.path.get(self.index).copied()
    }

    pub fn remaining(&self) -> usize {
        self.path.len().saturating_sub(self.index + 1)
    }
}

/// What a tick asks the engine to do
#[derive(Debug, Clone, PartialEq)]
pub enum TrackStep {
    /// Assert this point as the vehicle's target
    Advance { entity: EntityId, point: GeoPoint, index: usize },
    /// Path exhausted: the session is gone and its timer must be cancelled
    Completed { entity: EntityId, timer: TimerHandle },
    /// Tick from a timer that no longer drives a session
    Ignored,
}

/// Holds at most one [`TrackSession`]
#[derive(Debug, Default)]
pub struct TrackPlayer {
    session: Option<TrackSession>,
}

impl TrackPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new session positioned at `path[0]`, returning the one it replaces.
    ///
    /// The caller cancels the replaced session's timer. `path` must be non-empty.
    pub fn begin(
        &mut self,
        entity: EntityId,
        path: Vec<GeoPoint>,
        timer: TimerHandle,
    ) -> Option<TrackSession> {
        debug_assert!(!path.is_empty());
        self.session.replace(TrackSession { entity, path, index: 0, timer })
    }

    /// Remove the current session without completing it
    pub fn stop(&mut self) -> Option<TrackSession> {
        self.session.take()
    }

    pub fn active(&self) -> Option<&TrackSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Handle one tick of `timer`.
    ///
    /// Advances the index; when it runs past the last point the session is
    /// cleared and `Completed` is returned exactly once.
    pub fn tick(&mut self, timer: TimerHandle) -> TrackStep {
        let Some(session) = self.session.as_mut() else {
            return TrackStep::Ignored;
        };
        if session.timer != timer {
            return TrackStep::Ignored;
        }

        session.index += 1;
        if let Some(point) = session.path.get(session.index).copied() {
            return TrackStep::Advance {
                entity: session.entity.clone(),
                point,
                index: session.index,
            };
        }

        match self.session.take() {
            Some(done) => TrackStep::Completed { entity: done.entity, timer: done.timer },
            None => TrackStep::Ignored,
        }
    }
}
