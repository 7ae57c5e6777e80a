pub mod buzzer;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod digits;
pub mod display;
pub mod error;
pub mod input;
pub mod persist;

pub use buzzer::{BuzzPattern, BuzzRepeat, BuzzSequencer, BuzzerOutput, SharedBuzzer};
pub use cancel::CancelToken;
pub use clock::ClockId;
pub use config::{AppConfig, DisplayConfig, InputConfig, StorageConfig, TimingConfig};
pub use controller::{DeviceController, DeviceSnapshot, DeviceState, Hardware};
pub use countdown::{Countdown, CountdownEngine, ZeroCrossings};
pub use digits::{DigitEditor, DigitValue};
pub use display::{DisplayDriver, PresentationScheduler, Presenter, RenderInstruction};
pub use error::{DoubleClockError, Result};
pub use input::{EventSender, InputEvent, InputSource};
pub use persist::{JsonFileStore, MemoryStore, PersistenceStore};
