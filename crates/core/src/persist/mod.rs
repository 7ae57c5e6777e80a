use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};

use crate::{DigitValue, DoubleClockError, Result};

/// Remembers the configured digit values across restarts.
///
/// Storage is best effort: implementations swallow their own failures, and a
/// failed load simply means starting from zero.
pub trait PersistenceStore: Send {
    fn load(&self) -> Option<[DigitValue; 2]>;
    fn save(&self, values: &[DigitValue; 2]);
}

/// On-disk layout of the stored values.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValues {
    left: DigitValue,
    right: DigitValue,
}

/// Stores the values as a small JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`; the file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads and validates the stored values, reporting every failure.
    pub fn read(&self) -> Result<[DigitValue; 2]> {
        let raw = std::fs::read_to_string(&self.path)?;
        let stored: StoredValues = serde_json::from_str(&raw)?;
        if !stored.left.is_valid() || !stored.right.is_valid() {
            return Err(DoubleClockError::InvalidInput("stored digit out of range"));
        }
        Ok([stored.left, stored.right])
    }

    /// Overwrites the file with `values`.
    pub fn write(&self, values: &[DigitValue; 2]) -> Result<()> {
        let stored = StoredValues {
            left: values[0],
            right: values[1],
        };
        std::fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;
        Ok(())
    }
}

impl PersistenceStore for JsonFileStore {
    fn load(&self) -> Option<[DigitValue; 2]> {
        match self.read() {
            Ok(values) => Some(values),
            Err(DoubleClockError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no stored values");
                None
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "ignoring stored values");
                None
            }
        }
    }

    fn save(&self, values: &[DigitValue; 2]) {
        if let Err(err) = self.write(values) {
            tracing::warn!(path = %self.path.display(), %err, "could not store values");
        }
    }
}

/// In-process store. Clones share the same slot, which lets a test play the
/// role of a restart by handing a clone to a new controller.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<[DigitValue; 2]>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceStore for MemoryStore {
    fn load(&self) -> Option<[DigitValue; 2]> {
        self.slot.lock().ok().and_then(|slot| *slot)
    }

    fn save(&self, values: &[DigitValue; 2]) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(*values);
        }
    }
}
