//! Injectable time source
//!
//! The link task stamps every packet with a send-time and paces delivery
//! against a computed deliver-time (see [`crate::link`]). Both of those
//! need "the current time" and "wait until a time". Routing both through
//! a [`Clock`] trait, rather than calling `Instant::now`/`thread::sleep`
//! directly, means a test harness can swap in a [`VirtualClock`] and drive
//! latency/bandwidth scenarios deterministically instead of depending on
//! wall-clock scheduling jitter.
//!
//! Production code always uses [`SystemClock`]; [`pipe`](crate::pipe)
//! constructs one implicitly. [`VirtualClock`] is exported behind the
//! `test-util` feature (and always available to this crate's own tests)
//! for use with [`pipe_with_clock`](crate::pipe_with_clock).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic time, injectable so that tests can control pacing.
///
/// Implementors must guarantee `now()` is monotonically non-decreasing.
pub trait Clock: Send + Sync + 'static {
    /// The current instant, as seen by this clock.
    fn now(&self) -> Instant;

    /// Block the calling thread until `deadline` is reached, or return
    /// early if `cancel` becomes true in the meantime. Implementations
    /// must re-check `cancel` at least once every `poll_interval`.
    fn sleep_until(&self, deadline: Instant, cancel: &dyn Fn() -> bool);
}

/// Real wall-clock time, backed by [`std::time::Instant`] and
/// [`std::thread::sleep`].
///
/// This is the default clock used by [`pipe`](crate::pipe). Sleeps are
/// chopped into short slices so that a cancellation request (the
/// destination queue closing) is noticed promptly rather than only after
/// the full delay has elapsed.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

/// How finely a [`SystemClock`] sleep is sliced so that cancellation is
/// noticed promptly. A long `latency` should not make a reader-close take
/// longer than this to wake a blocked link task.
const SLEEP_SLICE: Duration = Duration::from_millis(5);

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant, cancel: &dyn Fn() -> bool) {
        loop {
            if cancel() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// A manually-advanced clock for deterministic tests.
///
/// `now()` returns an epoch plus however much virtual time has been
/// advanced via [`VirtualClock::advance`]. `sleep_until` busy-polls the
/// virtual time (checking `cancel` on every poll) rather than sleeping in
/// wall-clock terms, so a test thread calling `advance` from elsewhere
/// wakes blocked link tasks promptly.
#[derive(Clone)]
pub struct VirtualClock {
    epoch: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl VirtualClock {
    /// Create a new virtual clock whose `now()` starts at the real instant
    /// this call was made, with zero virtual time elapsed.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advance virtual time by `step`, waking any `sleep_until` callers
    /// whose deadline has now passed.
    pub fn advance(&self, step: Duration) {
        self.elapsed_nanos
            .fetch_add(step.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.epoch + Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    fn sleep_until(&self, deadline: Instant, cancel: &dyn Fn() -> bool) {
        loop {
            if cancel() || self.now() >= deadline {
                return;
            }
            std::thread::sleep(Duration::from_micros(100));
        }
    }
}
