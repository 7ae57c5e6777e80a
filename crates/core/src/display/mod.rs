use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    cancel::Periodic, CancelToken, ClockId, DeviceSnapshot, DeviceState, DigitValue, Result,
};

/// Brightness level used for the one-frame cue when a clock hits zero.
pub const DIM_BRIGHTNESS: u8 = 0;

/// A four-digit seven-segment display per clock.
pub trait DisplayDriver: Send {
    fn set_brightness(&mut self, clock: ClockId, level: u8);
    /// Shows four characters, most significant first. A space leaves the
    /// position dark.
    fn show_digits(&mut self, clock: ClockId, text: &str, colon: bool);
}

/// What one display should show for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderInstruction {
    /// Remaining or overtime seconds as `MMSS`, optionally dimmed.
    Time { minutes: u32, seconds: u32, dim: bool },
    /// Configured digits, seconds-ones first. `None` is a blanked digit.
    Digits([Option<u8>; 4]),
    Blank,
}

impl RenderInstruction {
    /// Time display for a remaining-seconds counter. Overtime shows the
    /// magnitude; anything past 99:59 saturates there.
    pub fn time(remaining: i32) -> Self {
        let total = remaining.unsigned_abs();
        let (minutes, seconds) = if total >= 100 * 60 {
            (99, 59)
        } else {
            (total / 60, total % 60)
        };
        Self::Time {
            minutes,
            seconds,
            dim: remaining == 0,
        }
    }

    /// Stored digits, optionally with one position blanked.
    pub fn digits(value: DigitValue, blank: Option<usize>) -> Self {
        let mut digits = value.digits().map(Some);
        if let Some(position) = blank {
            digits[position % digits.len()] = None;
        }
        Self::Digits(digits)
    }

    /// The four characters sent to the display.
    pub fn text(&self) -> String {
        match self {
            Self::Time {
                minutes, seconds, ..
            } => format!("{minutes:02}{seconds:02}"),
            Self::Digits(digits) => digits
                .iter()
                .rev()
                .map(|digit| match digit {
                    Some(d) => char::from(b'0' + d),
                    None => ' ',
                })
                .collect(),
            Self::Blank => " ".repeat(4),
        }
    }

    /// Whether the minutes/seconds separator is lit.
    pub fn colon(&self) -> bool {
        !matches!(self, Self::Blank)
    }

    /// Sends the instruction to `driver`, using at most two driver calls.
    pub fn apply(&self, driver: &mut dyn DisplayDriver, clock: ClockId, brightness: u8) {
        match self {
            Self::Time { dim, .. } => {
                driver.show_digits(clock, &self.text(), true);
                driver.set_brightness(clock, if *dim { DIM_BRIGHTNESS } else { brightness });
            }
            Self::Digits(_) => {
                driver.set_brightness(clock, brightness);
                driver.show_digits(clock, &self.text(), true);
            }
            Self::Blank => driver.show_digits(clock, &self.text(), false),
        }
    }
}

/// Turns device snapshots into per-clock render instructions.
///
/// Holds the blink phase, which flips on every frame.
#[derive(Debug, Default)]
pub struct Presenter {
    blink_off: bool,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions for the next frame of both displays, Left first. Flips
    /// the blink phase.
    pub fn frame(&mut self, snapshot: &DeviceSnapshot) -> [RenderInstruction; 2] {
        let blink_off = self.blink_off;
        self.blink_off = !self.blink_off;

        ClockId::ALL.map(|clock| {
            let i = clock.index();
            match snapshot.state {
                DeviceState::Running | DeviceState::Alarm => {
                    RenderInstruction::time(snapshot.remaining[i])
                }
                DeviceState::Setup => {
                    let blank = (blink_off && snapshot.active == clock).then_some(snapshot.cursors[i]);
                    RenderInstruction::digits(snapshot.values[i], blank)
                }
                DeviceState::Init | DeviceState::Ready => {
                    RenderInstruction::digits(snapshot.values[i], None)
                }
            }
        })
    }
}

/// Thread that renders a frame every period until stopped, then blanks both
/// displays once.
#[derive(Debug)]
pub struct PresentationScheduler {
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl PresentationScheduler {
    /// Renders one frame immediately and then one per `period` until stopped.
    pub fn start<S>(
        period: Duration,
        brightness: u8,
        mut driver: Box<dyn DisplayDriver>,
        mut snapshot: S,
    ) -> Result<Self>
    where
        S: FnMut() -> Result<DeviceSnapshot> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name("presentation".to_string())
            .spawn(move || {
                let mut presenter = Presenter::new();
                let mut periodic = Periodic::new(period);
                loop {
                    match snapshot() {
                        Ok(snapshot) => {
                            let frame = presenter.frame(&snapshot);
                            for clock in ClockId::ALL {
                                frame[clock.index()].apply(driver.as_mut(), clock, brightness);
                            }
                        }
                        Err(err) => {
                            tracing::error!(%err, "cannot read device state, stopping display");
                            break;
                        }
                    }
                    if periodic.wait(&token) {
                        break;
                    }
                }
                for clock in ClockId::ALL {
                    RenderInstruction::Blank.apply(driver.as_mut(), clock, brightness);
                }
                tracing::debug!("presentation thread exited");
            })?;

        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits until the displays have been blanked.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("presentation thread panicked");
            }
        }
    }
}

impl Drop for PresentationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
