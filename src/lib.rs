// ABOUTME: Root module for pacer - average-rate pacing for shared resources.
// ABOUTME: Re-exports all public types from submodules.

//! Pace calls to a shared resource at an average rate.
//!
//! A [`Limiter`] hands out evenly spaced slots to any number of concurrent
//! callers. Each [`Limiter::wait`] either returns once the caller may proceed
//! or fails with the reason its [`Cancellation`] context ended.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use pacer::prelude::*;
//!
//! # async fn run() -> Result<(), Interrupted> {
//! // 10 calls per second
//! let limiter = Arc::new(Limiter::new(10, Duration::from_secs(1)));
//!
//! limiter.wait(&Context::background()).await?;
//! // do rate limited operation...
//!
//! let ctx = Context::background().with_timeout(Duration::from_millis(200));
//! match limiter.wait(&ctx).await {
//!     Ok(()) => { /* proceed */ }
//!     Err(Interrupted::DeadlineExceeded) => { /* gave up waiting */ }
//!     Err(Interrupted::Cancelled) => { /* caller cancelled */ }
//! }
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod limiter;
pub mod prelude;

pub use context::{CancelHandle, Cancellation, Context};
pub use error::{ConfigError, Interrupted};
pub use limiter::{Limiter, MAX_NEXT_CALL_LAG_STREAK, RateConfig};
