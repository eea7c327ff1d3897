// ABOUTME: Paced rate limiter that spaces calls to an average interval.
// ABOUTME: Each wait reserves the next slot under a lock, then sleeps unlocked.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use super::RateConfig;
use crate::context::Cancellation;
use crate::error::{ConfigError, Interrupted};

/// How many intervals the schedule may fall behind the clock.
///
/// Bounds the burst of immediately granted calls after an idle period.
pub const MAX_NEXT_CALL_LAG_STREAK: u32 = 10;

/// Paced rate limiter for a single shared resource.
///
/// Enforces an average of `count` calls per `per` across any number of
/// concurrent callers. Share it by reference (or `Arc`) with everything that
/// touches the guarded resource.
///
/// # Scheduling
///
/// - **First call is free:** the very first `wait()` returns immediately.
/// - **Slots are reserved before sleeping:** concurrent callers each claim a
///   distinct slot under the lock, then sleep independently.
/// - **Bounded catch-up:** after an idle period at most
///   [`MAX_NEXT_CALL_LAG_STREAK`] calls pass without normal spacing.
/// - **Best-effort rollback:** a caller interrupted mid-sleep, or whose `wait`
///   future is dropped, hands its slot back. Other callers already sleeping
///   keep the delays they computed.
#[derive(Debug)]
pub struct Limiter {
    /// Earliest instant the next call may proceed. `None` until the first call.
    next_call: Mutex<Option<Instant>>,
    interval: Duration,
    max_lag: Duration,
}

impl Limiter {
    /// Create a limiter allowing `count` calls per `per` on average.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero. Use [`Limiter::from_config`] for a checked path.
    pub fn new(count: u32, per: Duration) -> Self {
        let interval = per / count;

        Self {
            next_call: Mutex::new(None),
            interval,
            max_lag: interval * MAX_NEXT_CALL_LAG_STREAK,
        }
    }

    /// Limiter allowing `rps` calls per second.
    pub fn with_rps(rps: u32) -> Self {
        Self::new(rps, Duration::from_secs(1))
    }

    /// Limiter allowing `rpm` calls per minute.
    pub fn with_rpm(rpm: u32) -> Self {
        Self::new(rpm, Duration::from_secs(60))
    }

    /// Create a limiter from a validated configuration.
    pub fn from_config(config: &RateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.count, config.per()))
    }

    /// Target spacing between permitted calls.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How far the schedule may lag behind the clock.
    pub fn max_lag(&self) -> Duration {
        self.max_lag
    }

    /// Wait until the caller may proceed.
    ///
    /// Returns `Ok(())` once permitted. Returns the context's reason if it is
    /// done before permission is granted; an already-done context fails
    /// without touching the schedule.
    ///
    /// Cancel safe: dropping the returned future before it completes hands
    /// the reserved slot back, exactly as an interrupted context does.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Cancellation context. Its error is passed through unchanged.
    pub async fn wait<C>(&self, ctx: &C) -> Result<(), Interrupted>
    where
        C: Cancellation + ?Sized,
    {
        if let Some(reason) = ctx.err() {
            return Err(reason);
        }

        let Some(sleep_time) = self.reserve() else {
            return Ok(());
        };

        if sleep_time.is_zero() {
            return Ok(());
        }

        let reservation = Reservation { limiter: self };

        tokio::select! {
            biased;
            reason = ctx.done() => {
                drop(reservation);
                Err(reason)
            }
            () = sleep(sleep_time) => {
                reservation.consume();
                Ok(())
            }
        }
    }

    /// Claim the next slot and return how long to sleep until it.
    ///
    /// Returns `None` for the very first call, which is granted outright.
    fn reserve(&self) -> Option<Duration> {
        let mut next_call = self.next_call.lock();
        let now = Instant::now();

        let Some(scheduled) = *next_call else {
            *next_call = Some(now + self.interval);
            trace!("first call granted");
            return None;
        };

        let sleep_time = scheduled.saturating_duration_since(now);

        // Reserve before sleeping so concurrent callers queue onto successive slots.
        let mut advanced = scheduled + self.interval;

        let behind = now.saturating_duration_since(advanced);
        if behind > self.max_lag
            && let Some(floor) = now.checked_sub(self.max_lag)
        {
            debug!(
                behind_ms = behind.as_millis() as u64,
                "schedule fell behind, clamping catch-up"
            );
            advanced = floor;
        }
        *next_call = Some(advanced);

        trace!(sleep_ms = sleep_time.as_millis() as u64, "slot reserved");
        Some(sleep_time)
    }

    /// Hand an unconsumed slot back to the schedule.
    fn roll_back(&self) {
        let mut next_call = self.next_call.lock();

        if let Some(scheduled) = next_call.as_mut()
            && let Some(previous) = scheduled.checked_sub(self.interval)
        {
            *scheduled = previous;
            debug!("wait abandoned, reservation rolled back");
        }
    }

    /// Current schedule (for testing).
    #[cfg(test)]
    pub(crate) fn next_call(&self) -> Option<Instant> {
        *self.next_call.lock()
    }
}

/// A reserved slot that has not been slept out yet.
///
/// Rolls the schedule back when dropped, whether the context fired or the
/// `wait` future itself was dropped.
struct Reservation<'a> {
    limiter: &'a Limiter,
}

impl Reservation<'_> {
    /// The slot was used; keep it on the schedule.
    fn consume(self) {
        std::mem::forget(self);
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.limiter.roll_back();
    }
}
