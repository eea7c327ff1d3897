// ABOUTME: Cancellation trait and the token-backed Context implementation.
// ABOUTME: A context signals "done", reports why, and may carry a deadline.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::Interrupted;

/// An external signal that can end a wait early.
///
/// Implementors expose three capabilities: whether they are done (and why),
/// a future that resolves once they become done, and an optional deadline.
#[async_trait]
pub trait Cancellation: Send + Sync {
    /// Returns the interruption reason if the context is already done.
    fn err(&self) -> Option<Interrupted>;

    /// Resolves once the context is done, yielding the reason.
    ///
    /// Must be cancel-safe: dropping the future has no side effects.
    async fn done(&self) -> Interrupted;

    /// The instant after which this context reports `DeadlineExceeded`.
    fn deadline(&self) -> Option<Instant> {
        None
    }
}

#[async_trait]
impl Cancellation for CancellationToken {
    fn err(&self) -> Option<Interrupted> {
        self.is_cancelled().then_some(Interrupted::Cancelled)
    }

    async fn done(&self) -> Interrupted {
        self.cancelled().await;
        Interrupted::Cancelled
    }
}

/// Standard cancellation context.
///
/// Cloning is cheap and every clone observes the same signal. Children
/// derived with [`with_cancel`](Context::with_cancel),
/// [`with_deadline`](Context::with_deadline) or
/// [`with_timeout`](Context::with_timeout) are cancelled along with their parent.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a child context plus a handle that cancels it.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token = self.token.child_token();
        let handle = CancelHandle {
            token: token.clone(),
        };
        let ctx = Self {
            token,
            deadline: self.deadline,
        };
        (ctx, handle)
    }

    /// Derive a child context that expires at `deadline`.
    ///
    /// If the parent already has an earlier deadline, that one is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

#[async_trait]
impl Cancellation for Context {
    fn err(&self) -> Option<Interrupted> {
        if self.token.is_cancelled() {
            return Some(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupted::DeadlineExceeded),
            _ => None,
        }
    }

    async fn done(&self) -> Interrupted {
        let Some(deadline) = self.deadline else {
            self.token.cancelled().await;
            return Interrupted::Cancelled;
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Interrupted::Cancelled,
            () = sleep_until(deadline) => Interrupted::DeadlineExceeded,
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Cancels the [`Context`] it was created with.
///
/// Dropping the handle does not cancel the context.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Cancel the associated context and all of its children. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once `cancel` has been called (or the parent was cancelled).
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
