use std::{path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{DoubleClockError, Result};

/// Top-level configuration structure for the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timing: TimingConfig,
    pub display: DisplayConfig,
    pub storage: StorageConfig,
    pub input: InputConfig,
}

impl AppConfig {
    /// Reads a configuration file. Missing sections fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the background loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.timing.tick_ms == 0 || self.timing.frame_ms == 0 {
            return Err(DoubleClockError::InvalidInput(
                "timing periods must be at least 1 ms",
            ));
        }
        Ok(())
    }

    /// Pretty-printed JSON form, suitable as a starting point for a config
    /// file.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Periods of the two background loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Countdown period in milliseconds. One tick removes one second from a
    /// running clock.
    pub tick_ms: u64,
    /// Presentation period in milliseconds. Two frames make one blink cycle.
    pub frame_ms: u64,
}

impl TimingConfig {
    /// Countdown period as a duration.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Presentation period as a duration.
    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            frame_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Brightness used for everything except the dim cue at zero.
    pub brightness: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { brightness: 7 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File the configured digit values are remembered in.
    pub state_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("doubleclock.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Capacity of the bounded button-event queue.
    pub queue_capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { queue_capacity: 16 }
    }
}
