/// Result alias that carries the custom [`DoubleClockError`] type.
pub type Result<T> = std::result::Result<T, DoubleClockError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum DoubleClockError {
    /// Free-form failure that does not warrant its own variant.
    #[error("{0}")]
    Message(String),
    /// A mutex guarding shared device state was poisoned by a panicking
    /// thread. The payload names the guarded resource.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// A value handed to the core was outside its permitted range.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The controller's event queue is gone, usually because the controller
    /// has shut down.
    #[error("controller event channel is closed")]
    ChannelClosed,
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl DoubleClockError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for DoubleClockError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}
