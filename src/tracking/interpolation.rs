//! Frame-by-frame convergence of rendered positions toward their targets
//!
//! The scheduler is a two-state machine. `request_start` is the only way
//! into [`SchedulerState::Running`] and is a no-op when a loop is already
//! live, so any number of target writes between two frames still leaves
//! exactly one frame pending. Each `step` closes a fixed fraction of every
//! remaining gap and drops back to [`SchedulerState::Idle`] once a frame
//! moves nothing. The host re-invokes `step` once per animation frame while
//! the state is `Running`; there is no recursion.

use crate::core::{EntityId, GeoPoint};
use crate::tracking::targets::TargetStore;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Whether an animation frame is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No frame scheduled
    Idle,
    /// One frame scheduled; the host must call `step` on the next frame
    Running,
}

/// Result of one animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Vehicles moved by a fractional step this frame
    pub moved: usize,
    /// Vehicles snapped exactly onto their target this frame
    pub snapped: usize,
    /// State after the frame
    pub state: SchedulerState,
}

/// Interpolates rendered positions toward the target store
#[derive(Debug, Clone)]
pub struct InterpolationScheduler {
    rendered: HashMap<EntityId, GeoPoint>,
    state: SchedulerState,
    fraction: f64,
    epsilon: f64,
    frames_run: u64,
}

impl InterpolationScheduler {
    /// Create an idle scheduler.
    ///
    /// `fraction` must lie in (0, 1] and `epsilon` must be positive; both are
    /// enforced by [`crate::utils::config::TrackerConfig::validate`].
    pub fn new(fraction: f64, epsilon: f64) -> Self {
        Self {
            rendered: HashMap::new(),
            state: SchedulerState::Idle,
            fraction,
            epsilon,
            frames_run: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }

    pub fn set_tuning(&mut self, fraction: f64, epsilon: f64) {
        self.fraction = fraction;
        self.epsilon = epsilon;
    }

    /// Enter `Running` if idle. Returns true only on the Idle -> Running edge,
    /// i.e. when the host must schedule a new frame.
    pub fn request_start(&mut self) -> bool {
        match self.state {
            SchedulerState::Running => false,
            SchedulerState::Idle => {
                self.state = SchedulerState::Running;
                debug!("interpolation loop started");
                true
            }
        }
    }

    /// Stop the loop regardless of outstanding work. Returns true if it was running.
    pub fn force_stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.state = SchedulerState::Idle;
        if was_running {
            debug!("interpolation loop force-stopped");
        }
        was_running
    }

    /// Seed a rendered position unless one already exists. Returns true if seeded.
    pub fn seed_if_absent(&mut self, id: &EntityId, position: GeoPoint) -> bool {
        if self.rendered.contains_key(id) {
            return false;
        }
        self.rendered.insert(id.clone(), position);
        true
    }

    /// Place a rendered position directly, bypassing animation
    pub fn place(&mut self, id: &EntityId, position: GeoPoint) {
        self.rendered.insert(id.clone(), position);
    }

    pub fn rendered(&self, id: &EntityId) -> Option<GeoPoint> {
        self.rendered.get(id).copied()
    }

    /// Owned copy of every rendered position
    pub fn rendered_snapshot(&self) -> HashMap<EntityId, GeoPoint> {
        self.rendered.clone()
    }

    /// Run one animation frame against the current targets.
    ///
    /// A frame delivered while idle (e.g. after `force_stop`) does nothing.
    pub fn step(&mut self, targets: &TargetStore) -> FrameOutcome {
        if self.state == SchedulerState::Idle {
            return FrameOutcome { moved: 0, snapped: 0, state: SchedulerState::Idle };
        }

        self.frames_run += 1;
        let mut moved = 0;
        let mut snapped = 0;

        for (id, target) in targets.iter() {
            let current = self.rendered.get(id).copied().unwrap_or(target);
            let delta = target.to_vector() - current.to_vector();
            let distance = delta.norm();

            let next = GeoPoint::from_vector(current.to_vector() + delta * self.fraction);
            // A gap below f64 resolution no longer shrinks; treat it as converged
            if distance > self.epsilon && next != current {
                self.rendered.insert(id.clone(), next);
                moved += 1;
            } else {
                if current != target {
                    snapped += 1;
                }
                self.rendered.insert(id.clone(), target);
            }
        }

        if moved == 0 {
            self.state = SchedulerState::Idle;
            debug!(frames = self.frames_run, "interpolation loop converged");
        } else {
            trace!(moved, snapped, "interpolation frame");
        }

        FrameOutcome { moved, snapped, state: self.state }
    }
}
