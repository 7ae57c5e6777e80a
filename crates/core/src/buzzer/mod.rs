use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{CancelToken, ClockId, Result};

/// How many on/off cycles a pattern plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuzzRepeat {
    Times(u32),
    /// Plays until stopped.
    Forever,
}

/// Pulse duration plus repeat count of an audible sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuzzPattern {
    /// Length of both the on and the off half of one cycle.
    pub pulse: Duration,
    pub repeat: BuzzRepeat,
}

impl BuzzPattern {
    /// Short chirp for a button pressed in the wrong state.
    pub const WARNING: BuzzPattern = BuzzPattern {
        pulse: Duration::from_millis(250),
        repeat: BuzzRepeat::Times(1),
    };

    /// Alarm of the left clock: twenty quick beeps.
    pub const ALARM_LEFT: BuzzPattern = BuzzPattern {
        pulse: Duration::from_millis(250),
        repeat: BuzzRepeat::Times(20),
    };

    /// Alarm of the right clock: slow beeps until acknowledged.
    pub const ALARM_RIGHT: BuzzPattern = BuzzPattern {
        pulse: Duration::from_millis(500),
        repeat: BuzzRepeat::Forever,
    };

    /// Alarm pattern played when `clock` crosses zero.
    pub fn alarm_for(clock: ClockId) -> Self {
        match clock {
            ClockId::Left => Self::ALARM_LEFT,
            ClockId::Right => Self::ALARM_RIGHT,
        }
    }
}

/// The physical buzzer. Only ever driven from the sequencer's own thread.
pub trait BuzzerOutput: Send {
    /// Switches the buzzer on or off. Must be idempotent.
    fn set_on(&mut self, on: bool);
}

/// Shared handle to a buzzer output.
pub type SharedBuzzer = Arc<Mutex<dyn BuzzerOutput>>;

struct Sequence {
    pattern: BuzzPattern,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Plays [`BuzzPattern`]s, one at a time, each on its own thread.
pub struct BuzzSequencer {
    output: SharedBuzzer,
    active: Mutex<Option<Sequence>>,
}

impl BuzzSequencer {
    /// Creates an idle sequencer driving `output`.
    pub fn new(output: SharedBuzzer) -> Self {
        Self {
            output,
            active: Mutex::new(None),
        }
    }

    /// Starts `pattern` unless another pattern is still playing. Returns
    /// whether the pattern was started.
    pub fn start(&self, pattern: BuzzPattern) -> Result<bool> {
        let mut active = self.lock_active();
        if Self::still_playing(&mut active) {
            tracing::debug!(?pattern, "buzzer busy, pattern dropped");
            return Ok(false);
        }
        *active = Some(self.spawn(pattern)?);
        Ok(true)
    }

    /// Cancels the running pattern, if any, and waits until its thread has
    /// switched the buzzer off.
    pub fn stop(&self) {
        let mut active = self.lock_active();
        Self::stop_locked(&mut active);
    }

    /// Stops whatever is playing and starts `pattern` in its place. Nothing
    /// else can start a pattern in between.
    pub fn replace(&self, pattern: BuzzPattern) -> Result<()> {
        let mut active = self.lock_active();
        Self::stop_locked(&mut active);
        *active = Some(self.spawn(pattern)?);
        Ok(())
    }

    /// Pattern that is currently playing.
    pub fn active_pattern(&self) -> Option<BuzzPattern> {
        let mut active = self.lock_active();
        if Self::still_playing(&mut active) {
            active.as_ref().map(|sequence| sequence.pattern)
        } else {
            None
        }
    }

    /// Whether a pattern is currently playing.
    pub fn is_active(&self) -> bool {
        self.active_pattern().is_some()
    }

    fn spawn(&self, pattern: BuzzPattern) -> Result<Sequence> {
        let cancel = CancelToken::new();
        let handle = {
            let cancel = cancel.clone();
            let output = Arc::clone(&self.output);
            thread::Builder::new()
                .name("buzzer".to_string())
                .spawn(move || play(&output, pattern, &cancel))?
        };
        tracing::debug!(?pattern, "buzzer pattern started");
        Ok(Sequence {
            pattern,
            cancel,
            handle,
        })
    }

    /// Clears a sequence that ran to completion. Returns whether a sequence is
    /// still playing.
    fn still_playing(active: &mut Option<Sequence>) -> bool {
        let finished = match active.as_ref() {
            Some(sequence) => sequence.handle.is_finished(),
            None => return false,
        };
        if !finished {
            return true;
        }
        if let Some(sequence) = active.take() {
            if sequence.handle.join().is_err() {
                tracing::error!("buzzer thread panicked");
            }
        }
        false
    }

    fn stop_locked(active: &mut Option<Sequence>) {
        if let Some(sequence) = active.take() {
            sequence.cancel.cancel();
            if sequence.handle.join().is_err() {
                tracing::error!("buzzer thread panicked");
            }
            tracing::debug!(pattern = ?sequence.pattern, "buzzer pattern stopped");
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Sequence>> {
        // The guarded slot is always left consistent, so a poisoned lock is
        // safe to keep using.
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for BuzzSequencer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for BuzzSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuzzSequencer")
            .field("active", &self.active_pattern())
            .finish()
    }
}

fn play(output: &SharedBuzzer, pattern: BuzzPattern, cancel: &CancelToken) {
    let mut remaining = pattern.repeat;
    while remaining != BuzzRepeat::Times(0) {
        set_output(output, true);
        if cancel.wait_timeout(pattern.pulse) {
            break;
        }
        set_output(output, false);
        if cancel.wait_timeout(pattern.pulse) {
            break;
        }
        if let BuzzRepeat::Times(count) = remaining {
            remaining = BuzzRepeat::Times(count - 1);
        }
    }
    set_output(output, false);
}

fn set_output(output: &SharedBuzzer, on: bool) {
    let mut output = output
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    output.set_on(on);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[derive(Default)]
    struct Recorder {
        levels: Vec<bool>,
    }

    impl BuzzerOutput for Recorder {
        fn set_on(&mut self, on: bool) {
            self.levels.push(on);
        }
    }

    fn sequencer() -> (BuzzSequencer, Arc<Mutex<Recorder>>) {
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        let output: SharedBuzzer = recorder.clone();
        (BuzzSequencer::new(output), recorder)
    }

    fn fast(repeat: BuzzRepeat) -> BuzzPattern {
        BuzzPattern {
            pulse: Duration::from_millis(5),
            repeat,
        }
    }

    fn wait_idle(sequencer: &BuzzSequencer) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while sequencer.is_active() {
            assert!(Instant::now() < deadline, "pattern never finished");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn finite_pattern_completes_and_self_clears() {
        let (sequencer, recorder) = sequencer();
        assert!(sequencer.start(fast(BuzzRepeat::Times(2))).unwrap());
        wait_idle(&sequencer);

        let levels = recorder.lock().unwrap().levels.clone();
        assert_eq!(levels, vec![true, false, true, false, false]);
        assert!(sequencer.start(fast(BuzzRepeat::Times(1))).unwrap());
    }

    #[test]
    fn second_start_is_ignored_while_playing() {
        let (sequencer, _) = sequencer();
        assert!(sequencer.start(BuzzPattern::ALARM_RIGHT).unwrap());
        assert!(!sequencer.start(BuzzPattern::WARNING).unwrap());
        assert_eq!(sequencer.active_pattern(), Some(BuzzPattern::ALARM_RIGHT));
        sequencer.stop();
    }

    #[test]
    fn stop_leaves_the_buzzer_off() {
        let (sequencer, recorder) = sequencer();
        sequencer.start(fast(BuzzRepeat::Forever)).unwrap();
        thread::sleep(Duration::from_millis(30));
        sequencer.stop();

        assert!(!sequencer.is_active());
        let levels = recorder.lock().unwrap().levels.clone();
        assert_eq!(levels.last(), Some(&false));
        let count = levels.len();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(recorder.lock().unwrap().levels.len(), count);
    }

    #[test]
    fn replace_swaps_the_running_pattern() {
        let (sequencer, _) = sequencer();
        sequencer.start(BuzzPattern::WARNING).unwrap();
        sequencer.replace(BuzzPattern::ALARM_LEFT).unwrap();
        assert_eq!(sequencer.active_pattern(), Some(BuzzPattern::ALARM_LEFT));
        sequencer.stop();
        assert_eq!(sequencer.active_pattern(), None);
    }

    #[test]
    fn alarm_patterns_follow_clock_identity() {
        assert_eq!(BuzzPattern::alarm_for(ClockId::Left).repeat, BuzzRepeat::Times(20));
        assert_eq!(BuzzPattern::alarm_for(ClockId::Right).repeat, BuzzRepeat::Forever);
    }
}
