//! Fixed minimum spacing between outbound requests.

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;

const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Blocks callers so consecutive requests start at least `interval` apart.
///
/// The first request is never delayed. A zero interval disables pacing.
pub struct RequestPacer {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    clock: DefaultClock,
    interval: Duration,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval).map(|quota| {
            RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN))
        });
        Self {
            limiter,
            clock: DefaultClock::default(),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleeps until the next request slot is available, then claims it.
    pub fn wait_turn(&self) -> Duration {
        let Some(limiter) = self.limiter.as_ref() else {
            return Duration::ZERO;
        };
        let started = Instant::now();
        loop {
            match limiter.check() {
                Ok(()) => break,
                Err(not_until) => {
                    let wait = not_until.wait_time_from(self.clock.now()).max(MIN_SLEEP);
                    std::thread::sleep(wait);
                }
            }
        }
        let waited = started.elapsed();
        if waited >= MIN_SLEEP {
            debug!("RAWG: paced request by {waited:?}");
        }
        waited
    }
}
