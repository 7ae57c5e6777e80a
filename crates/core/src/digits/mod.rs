use serde::{Deserialize, Serialize};

use crate::{ClockId, DoubleClockError, Result};

/// Number of digit positions per clock.
pub const DIGIT_COUNT: usize = 4;

/// Position of the seconds-tens digit, the only one that wraps at six.
const SECONDS_TENS: usize = 1;

/// Configured duration of one clock as four decimal digits.
///
/// Index 0 is seconds-ones, 1 seconds-tens, 2 minutes-ones and 3
/// minutes-tens, so the largest value is 99:59.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitValue([u8; DIGIT_COUNT]);

impl DigitValue {
    pub const ZERO: DigitValue = DigitValue([0; DIGIT_COUNT]);

    /// Builds a value from digits ordered seconds-ones first.
    pub fn new(digits: [u8; DIGIT_COUNT]) -> Result<Self> {
        let value = Self(digits);
        if value.is_valid() {
            Ok(value)
        } else {
            Err(DoubleClockError::InvalidInput("digit outside its positional range"))
        }
    }

    /// Builds the value showing `minutes:seconds`.
    pub fn from_minutes_seconds(minutes: u8, seconds: u8) -> Result<Self> {
        if minutes > 99 || seconds > 59 {
            return Err(DoubleClockError::InvalidInput("time exceeds 99:59"));
        }
        Ok(Self([seconds % 10, seconds / 10, minutes % 10, minutes / 10]))
    }

    /// Digit at `position`, 0 being seconds-ones.
    pub fn digit(&self, position: usize) -> u8 {
        self.0[position % DIGIT_COUNT]
    }

    /// All four digits, seconds-ones first.
    pub fn digits(&self) -> [u8; DIGIT_COUNT] {
        self.0
    }

    /// Whether every digit lies inside the range of its position.
    pub fn is_valid(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(position, digit)| *digit < modulus(position))
    }

    pub fn total_seconds(&self) -> u32 {
        let [s1, s10, m1, m10] = self.0.map(u32::from);
        600 * m10 + 60 * m1 + 10 * s10 + s1
    }

    fn step(&mut self, position: usize, up: bool) {
        let m = modulus(position);
        let old = self.0[position];
        self.0[position] = if up { (old + 1) % m } else { (old + m - 1) % m };
    }
}

fn modulus(position: usize) -> u8 {
    if position == SECONDS_TENS {
        6
    } else {
        10
    }
}

/// Per-clock digit values and edit cursors.
///
/// Each clock keeps its own cursor so it remembers the last edited digit
/// while the slider points at the other clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitEditor {
    values: [DigitValue; 2],
    cursors: [usize; 2],
}

impl DigitEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor starting from remembered values with both cursors at 0.
    pub fn with_values(values: [DigitValue; 2]) -> Self {
        Self {
            values,
            cursors: [0; 2],
        }
    }

    /// Values of both clocks, Left first.
    pub fn values(&self) -> [DigitValue; 2] {
        self.values
    }

    /// Value being edited for `clock`.
    pub fn value(&self, clock: ClockId) -> DigitValue {
        self.values[clock.index()]
    }

    /// Digit position the clock's cursor is on, 0 being seconds-ones.
    pub fn cursor(&self, clock: ClockId) -> usize {
        self.cursors[clock.index()]
    }

    /// Cursor positions of both clocks, Left first.
    pub fn cursors(&self) -> [usize; 2] {
        self.cursors
    }

    /// Digit currently under the clock's cursor.
    pub fn selected_digit(&self, clock: ClockId) -> u8 {
        self.value(clock).digit(self.cursor(clock))
    }

    /// Steps the digit under the cursor up, wrapping at its modulus.
    pub fn increment(&mut self, clock: ClockId) {
        let cursor = self.cursor(clock);
        self.values[clock.index()].step(cursor, true);
    }

    /// Steps the digit under the cursor down, wrapping at its modulus.
    pub fn decrement(&mut self, clock: ClockId) {
        let cursor = self.cursor(clock);
        self.values[clock.index()].step(cursor, false);
    }

    /// Moves the cursor one position towards the more significant digits.
    pub fn cursor_forward(&mut self, clock: ClockId) {
        let cursor = &mut self.cursors[clock.index()];
        *cursor = (*cursor + 1) % DIGIT_COUNT;
    }

    /// Moves the cursor one position towards the seconds-ones digit.
    pub fn cursor_back(&mut self, clock: ClockId) {
        let cursor = &mut self.cursors[clock.index()];
        *cursor = (*cursor + DIGIT_COUNT - 1) % DIGIT_COUNT;
    }

    /// Zeroes the clock's value and returns its cursor to 0.
    pub fn reset(&mut self, clock: ClockId) {
        self.values[clock.index()] = DigitValue::ZERO;
        self.cursors[clock.index()] = 0;
    }

    /// Resets both clocks.
    pub fn reset_all(&mut self) {
        for clock in ClockId::ALL {
            self.reset(clock);
        }
    }

    pub fn total_seconds(&self) -> u32 {
        self.values.iter().map(DigitValue::total_seconds).sum()
    }
}
