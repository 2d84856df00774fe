use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Matches the provider's native `tasksStopped` waiter delay.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(6);
/// Matches the provider's native waiter limit of 100 attempts.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

const SLEEP_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` waits until the tasks stop or the run is cancelled.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(DEFAULT_WAIT_TIMEOUT),
        }
    }
}

impl PollPolicy {
    pub fn deadline_passed(&self, started_at: Instant) -> bool {
        self.timeout
            .is_some_and(|timeout| started_at.elapsed() >= timeout)
    }
}

/// Shared flag set from outside the pipeline (Ctrl-C) and observed between polls.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` in short slices, returning early once cancelled.
    pub fn sleep(&self, duration: Duration) {
        let wake_at = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= wake_at {
                return;
            }
            std::thread::sleep((wake_at - now).min(SLEEP_SLICE));
        }
    }
}
