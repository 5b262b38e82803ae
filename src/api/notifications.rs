//! User-visible notifications (toast equivalents)
//!
//! Notifications are queued with an expiry for pull-style consumers and are
//! also pushed synchronously to any registered callback.

use crate::core::EntityId;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

/// Callback function type for notifications
pub type NotificationCallback = Box<dyn Fn(&Notification) + Send>;

/// Events surfaced to the rendering layer
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Simulated playback started
    TrackStarted { entity: EntityId },
    /// Simulated playback reached the end of its path
    TrackFinished { entity: EntityId },
    /// Playback was requested without any path data
    NoTrackData { entity: EntityId },
    /// Backend health flipped
    HealthChanged { healthy: bool, version: String },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::TrackStarted { entity } => write!(f, "Tracking {}…", entity),
            Notification::TrackFinished { entity } => write!(f, "Finished tracking {}", entity),
            Notification::NoTrackData { .. } => {
                write!(f, "No track data available for this bus yet.")
            }
            Notification::HealthChanged { healthy: true, version } if version.is_empty() => {
                write!(f, "Backend online")
            }
            Notification::HealthChanged { healthy: true, version } => {
                write!(f, "Backend online (v{})", version)
            }
            Notification::HealthChanged { healthy: false, .. } => write!(f, "Backend unreachable"),
        }
    }
}

/// A notification waiting in the queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedNotification {
    pub id: u64,
    pub notification: Notification,
    pub posted_at: Duration,
    pub expires_at: Duration,
}

/// Callback registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u32);

impl CallbackHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Queue plus subscriber list
pub struct NotificationHub {
    pending: VecDeque<QueuedNotification>,
    callbacks: HashMap<CallbackHandle, NotificationCallback>,
    callback_counter: u32,
    notification_counter: u64,
    ttl: Duration,
}

impl NotificationHub {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            callbacks: HashMap::new(),
            callback_counter: 0,
            notification_counter: 0,
            ttl,
        }
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    /// Register a callback invoked for every posted notification
    pub fn subscribe(&mut self, callback: NotificationCallback) -> CallbackHandle {
        self.callback_counter += 1;
        let handle = CallbackHandle(self.callback_counter);
        self.callbacks.insert(handle, callback);
        handle
    }

    /// Unregister a callback; false if the handle is unknown
    pub fn unsubscribe(&mut self, handle: CallbackHandle) -> bool {
        self.callbacks.remove(&handle).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Queue a notification and deliver it to every subscriber
    pub fn post(&mut self, notification: Notification, now: Duration) -> u64 {
        self.notification_counter += 1;
        let id = self.notification_counter;

        for callback in self.callbacks.values() {
            callback(&notification);
        }

        self.pending.push_back(QueuedNotification {
            id,
            notification,
            posted_at: now,
            expires_at: now + self.ttl,
        });
        id
    }

    /// Drop notifications whose lifetime has passed; returns how many
    pub fn expire(&mut self, now: Duration) -> usize {
        let before = self.pending.len();
        self.pending.retain(|n| n.expires_at > now);
        before - self.pending.len()
    }

    /// Take every queued notification, oldest first
    pub fn drain(&mut self) -> Vec<QueuedNotification> {
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &QueuedNotification> {
        self.pending.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop queued notifications and subscribers
    pub fn clear(&mut self) {
        self.pending.clear();
        self.callbacks.clear();
    }
}
