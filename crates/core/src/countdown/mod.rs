use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{cancel::Periodic, CancelToken, ClockId, DigitValue, Result};

/// Clocks that reached exactly zero on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroCrossings([bool; 2]);

impl ZeroCrossings {
    /// Whether `clock` crossed zero on this tick.
    pub fn contains(&self, clock: ClockId) -> bool {
        self.0[clock.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|crossed| *crossed)
    }

    /// Crossed clocks in service order, Left before Right.
    pub fn iter(&self) -> impl Iterator<Item = ClockId> + '_ {
        ClockId::ALL
            .into_iter()
            .filter(move |clock| self.contains(*clock))
    }
}

/// Remaining seconds of both clocks.
///
/// A clock is armed once, when the countdown starts, and only if it had time
/// left. An armed clock keeps decrementing past zero; the negative value is
/// the overtime. An unarmed clock stays at zero for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: [i32; 2],
    armed: [bool; 2],
}

impl Countdown {
    /// Both clocks at zero and unarmed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the configured durations and decides which clocks count.
    pub fn arm(&mut self, values: &[DigitValue; 2]) {
        for clock in ClockId::ALL {
            let seconds = values[clock.index()].total_seconds() as i32;
            self.remaining[clock.index()] = seconds;
            self.armed[clock.index()] = seconds > 0;
        }
    }

    /// Removes one second from every armed clock and reports the clocks that
    /// landed exactly on zero.
    pub fn tick(&mut self) -> ZeroCrossings {
        let mut crossings = ZeroCrossings::default();
        for clock in ClockId::ALL {
            let i = clock.index();
            if !self.armed[i] {
                continue;
            }
            self.remaining[i] -= 1;
            crossings.0[i] = self.remaining[i] == 0;
        }
        crossings
    }

    /// Seconds left on `clock`; negative once it is in overtime.
    pub fn remaining(&self, clock: ClockId) -> i32 {
        self.remaining[clock.index()]
    }

    /// Seconds left on both clocks, Left first.
    pub fn remaining_all(&self) -> [i32; 2] {
        self.remaining
    }

    /// Whether `clock` counts in the current run.
    pub fn is_armed(&self, clock: ClockId) -> bool {
        self.armed[clock.index()]
    }

    /// Whether neither clock has time left.
    pub fn all_expired(&self) -> bool {
        self.remaining.iter().all(|seconds| *seconds <= 0)
    }
}

/// Periodic countdown thread.
///
/// Each run gets its own [`CancelToken`], which is handed to the tick
/// callback so the callback can re-check it under whatever lock it takes.
/// Stopping never blocks: a stopped thread exits on its own within one period
/// and can be joined later through [`CountdownEngine::take_threads`].
#[derive(Debug, Default)]
pub struct CountdownEngine {
    current: Option<CancelToken>,
    threads: Vec<JoinHandle<()>>,
}

impl CountdownEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a run that calls `on_tick` once per `period`, starting one
    /// period from now. A run that is still active is stopped first.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F) -> Result<()>
    where
        F: FnMut(&CancelToken) -> Result<()> + Send + 'static,
    {
        self.stop();
        self.threads.retain(|handle| !handle.is_finished());

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name("countdown".to_string())
            .spawn(move || {
                let mut periodic = Periodic::new(period);
                while !periodic.wait(&token) {
                    if let Err(err) = on_tick(&token) {
                        tracing::error!(%err, "countdown tick failed, stopping");
                        break;
                    }
                }
                tracing::debug!("countdown thread exited");
            })?;

        self.current = Some(cancel);
        self.threads.push(handle);
        Ok(())
    }

    /// Requests the active run to stop. Returns immediately.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.current.take() {
            cancel.cancel();
        }
    }

    /// Whether a run is active and not yet asked to stop.
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Hands out the threads of all runs so the caller can join them once it
    /// no longer holds anything the threads might wait for.
    pub fn take_threads(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.threads)
    }
}

impl Drop for CountdownEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
