//! Update sources: upstream feed seam, payload decoding, health
//!
//! Everything that can fail on the way in fails here. The engine only ever
//! receives validated, finite positions.

pub mod error;
pub mod feed;
pub mod health;
pub mod mock;
pub mod parser;

pub use error::{FeedError, FeedResult, RecoveryStrategy};
pub use feed::{HealthReport, UpstreamFeed};
pub use health::BackendStatus;
pub use mock::MockFeed;
pub use parser::{FeedParser, PositionPayload};
