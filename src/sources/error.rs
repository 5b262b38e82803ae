//! Upstream feed error types

/// Failures talking to the upstream position service
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    /// Stream or connection dropped
    #[error("connection to upstream lost")]
    ConnectionLost,
    /// No answer in time
    #[error("upstream timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// Response arrived without a body
    #[error("upstream returned an empty body")]
    EmptyBody,
    /// Non-success HTTP status
    #[error("upstream returned HTTP {status}")]
    HttpStatus { status: u16 },
}

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// What to do after a feed failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Keep last known state and try again next cycle
    RetryNextCycle,
    /// Re-open the connection before the next cycle
    Reconnect,
}

impl FeedError {
    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            FeedError::ConnectionLost => RecoveryStrategy::Reconnect,
            FeedError::Timeout { .. } => RecoveryStrategy::RetryNextCycle,
            FeedError::EmptyBody => RecoveryStrategy::RetryNextCycle,
            FeedError::HttpStatus { status } if *status >= 500 => RecoveryStrategy::Reconnect,
            FeedError::HttpStatus { .. } => RecoveryStrategy::RetryNextCycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_strategy() {
        assert_eq!(FeedError::ConnectionLost.recovery_strategy(), RecoveryStrategy::Reconnect);
        assert_eq!(
            FeedError::HttpStatus { status: 503 }.recovery_strategy(),
            RecoveryStrategy::Reconnect
        );
        assert_eq!(
            FeedError::HttpStatus { status: 404 }.recovery_strategy(),
            RecoveryStrategy::RetryNextCycle
        );
        assert_eq!(FeedError::EmptyBody.recovery_strategy(), RecoveryStrategy::RetryNextCycle);
    }
}
