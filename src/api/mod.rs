//! Host-facing API
//!
//! Error and result types, user notifications, and the driver that runs an
//! engine against an upstream feed.

pub mod driver;
pub mod notifications;
pub mod types;

pub use driver::{EngineDriver, PumpReport, SourceMessage, SourceSender};
pub use notifications::{CallbackHandle, Notification, NotificationCallback, NotificationHub, QueuedNotification};
pub use types::{EngineStats, HostRequest, TrackerError, TrackerResult};
