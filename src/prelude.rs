// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use pacer::prelude::*;` to get started quickly.

pub use crate::context::{CancelHandle, Cancellation, Context};
pub use crate::error::{ConfigError, Interrupted};
pub use crate::limiter::{Limiter, RateConfig};
