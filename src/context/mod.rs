// ABOUTME: Context module - cooperative cancellation for blocking waits.
// ABOUTME: Defines the Cancellation capability set and a standard Context.

mod context;

pub use context::{CancelHandle, Cancellation, Context};
