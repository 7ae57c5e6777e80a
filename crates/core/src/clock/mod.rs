use serde::{Deserialize, Serialize};

/// Identity of one of the two countdown clocks.
///
/// The declaration order matters: when both clocks reach zero on the same
/// tick, they are serviced in the order of [`ClockId::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockId {
    Left,
    Right,
}

impl ClockId {
    pub const ALL: [ClockId; 2] = [ClockId::Left, ClockId::Right];

    /// Position of the clock in per-clock arrays.
    pub fn index(self) -> usize {
        match self {
            ClockId::Left => 0,
            ClockId::Right => 1,
        }
    }

    /// Maps the slider's pin level to the clock it selects. The pin is pulled
    /// up, so the slider pulls it low in the left position.
    pub fn from_slider_level(high: bool) -> Self {
        if high {
            ClockId::Right
        } else {
            ClockId::Left
        }
    }
}
