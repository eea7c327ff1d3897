// ABOUTME: Defines all error types for the pacer library using thiserror.
// ABOUTME: Interruption is the only runtime failure; config errors are construction-time.

/// Why a wait ended before permission was granted.
///
/// The reason comes from the caller's context and is passed through unchanged,
/// so explicit cancellation and deadline expiry stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Interrupted {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Errors from validating a [`RateConfig`](crate::limiter::RateConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("count must be at least 1")]
    ZeroCount,

    #[error("period must be longer than zero")]
    ZeroPeriod,
}
