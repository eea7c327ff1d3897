// ABOUTME: Limiter module - paced rate limiting and its configuration.
// ABOUTME: Re-exports the Limiter, RateConfig, and the lag streak constant.

mod config;
mod limiter;

pub use config::RateConfig;
pub use limiter::{Limiter, MAX_NEXT_CALL_LAG_STREAK};
