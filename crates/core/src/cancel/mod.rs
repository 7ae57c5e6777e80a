use std::{
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

/// Cancellation flag that background loops check at every sleep.
///
/// Once cancelled it stays cancelled. Sleeping through
/// [`CancelToken::wait_timeout`] returns as soon as the flag is raised, so a
/// loop sleeping for one period notices a request within that period at
/// worst. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag and wakes every waiter.
    pub fn cancel(&self) {
        // A poisoned flag is still a flag; keep raising it.
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleeps for `timeout` unless cancelled first. Returns `true` when the
    /// token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }

    /// Sleeps until `deadline` unless cancelled first. Returns `true` when the
    /// token is cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = match self.inner.wake.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

/// Fixed-rate schedule that measures each period from the previous deadline,
/// so time spent between sleeps does not accumulate as drift.
#[derive(Debug, Clone)]
pub struct Periodic {
    period: Duration,
    next: Instant,
}

impl Periodic {
    /// Schedule whose first deadline is one `period` from now.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    /// Sleeps until the next deadline. Returns `true` when `token` was
    /// cancelled instead.
    pub fn wait(&mut self, token: &CancelToken) -> bool {
        if token.wait_until(self.next) {
            return true;
        }
        self.next += self.period;
        // Skip deadlines that already passed rather than bursting to catch up.
        let now = Instant::now();
        if self.next < now {
            self.next = now + self.period;
        }
        false
    }
}
