//! Fixed-duration waits.
//!
//! Stages never wait for events; they sleep for a configured time and then
//! look at what the observer collected. The wait goes through [`Sleeper`] so
//! tests can stand in for the passage of time.

use std::time::Duration;

/// Blocks the calling thread for a duration.
pub trait Sleeper {
    /// Wait for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<F> Sleeper for F
where
    F: Fn(Duration),
{
    fn sleep(&self, duration: Duration) {
        self(duration);
    }
}
