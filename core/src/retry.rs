//! Retry schedules for hooks, actions and remote providers.
//!
//! A [`BackOff`] is a stateless schedule: given the retry number and the time
//! spent so far it returns the next delay, or `None` to give up. The loop
//! itself lives in [`retry_notify`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use cmdkit_core::{retry_notify, ConstantBackOff};
//!
//! let schedule = ConstantBackOff::new(Duration::ZERO).with_max_retries(2);
//! let mut calls = 0;
//! let result: Result<(), &str> = retry_notify(&schedule, || {
//!     calls += 1;
//!     Err("unavailable")
//! }, |_, _| {});
//! assert_eq!(result, Err("unavailable"));
//! assert_eq!(calls, 3);
//! ```

use std::thread;
use std::time::{Duration, Instant};

/// Schedule of delays between attempts.
pub trait BackOff: Send + Sync {
    /// Delay before retry number `attempt` (starting at 1), given the time
    /// elapsed since the first attempt. `None` stops retrying.
    fn next_delay(&self, attempt: u32, elapsed: Duration) -> Option<Duration>;
}

/// Delays growing by `multiplier` from `initial_interval`, capped at
/// `max_interval`, until `max_elapsed_time` would be exceeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackOff {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    /// `None` retries forever.
    pub max_elapsed_time: Option<Duration>,
}

impl Default for ExponentialBackOff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Some(Duration::from_secs(15 * 60)),
        }
    }
}

impl ExponentialBackOff {
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            ..Self::default()
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    pub fn with_max_elapsed_time(mut self, max_elapsed_time: Option<Duration>) -> Self {
        self.max_elapsed_time = max_elapsed_time;
        self
    }
}

impl BackOff for ExponentialBackOff {
    fn next_delay(&self, attempt: u32, elapsed: Duration) -> Option<Duration> {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_interval.as_secs_f64());
        let delay = if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_interval
        };

        match self.max_elapsed_time {
            Some(max) if elapsed.saturating_add(delay) > max => None,
            _ => Some(delay),
        }
    }
}

/// The same delay every time, optionally for a bounded number of retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackOff {
    pub interval: Duration,
    pub max_retries: Option<u32>,
}

impl ConstantBackOff {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_retries: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

impl BackOff for ConstantBackOff {
    fn next_delay(&self, attempt: u32, _elapsed: Duration) -> Option<Duration> {
        match self.max_retries {
            Some(max) if attempt > max => None,
            _ => Some(self.interval),
        }
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopBackOff;

impl BackOff for StopBackOff {
    fn next_delay(&self, _attempt: u32, _elapsed: Duration) -> Option<Duration> {
        None
    }
}

/// Runs `op` until it succeeds or `backoff` gives up, calling `notify` with
/// each failure and the delay before the next attempt. Returns the last error.
pub fn retry_notify<T, E, F, N>(backoff: &dyn BackOff, mut op: F, mut notify: N) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    N: FnMut(&E, Duration),
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let err = match op() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt = attempt.saturating_add(1);
        match backoff.next_delay(attempt, started.elapsed()) {
            Some(delay) => {
                notify(&err, delay);
                thread::sleep(delay);
            }
            None => return Err(err),
        }
    }
}
