use std::sync::mpsc::{SyncSender, TrySendError};

use serde::{Deserialize, Serialize};

use crate::{DoubleClockError, Result};

/// Debounced events from the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    /// The push button (center of the five-way switch).
    Push,
    Up,
    Down,
    Left,
    Right,
    /// The start / acknowledge button.
    Start,
    /// The slider moved; `true` is the high pin level (Right clock).
    SliderChanged(bool),
}

/// Source of input events that can report the slider position on demand.
pub trait InputSource {
    /// Current slider pin level, `true` when high.
    fn slider_level(&self) -> bool;
}

/// Producer side of the controller's bounded event queue.
///
/// Sending never blocks: an edge that arrives while the queue is full is
/// dropped, like a press the hardware never saw.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: SyncSender<InputEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: SyncSender<InputEvent>) -> Self {
        Self { tx }
    }

    /// Queues `event` without blocking. A press that finds the queue full is
    /// dropped.
    pub fn send(&self, event: InputEvent) -> Result<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                tracing::debug!(?event, "event queue full, input dropped");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(DoubleClockError::ChannelClosed),
        }
    }
}
