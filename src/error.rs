//! Error types for gaze-shim

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// gaze-shim error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (socket bind, wake-up send, config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lifecycle operation called in the wrong state
    #[error("Invalid lifecycle state: {0}")]
    InvalidState(String),

    /// Receiver thread already running
    #[error("Receiver already running")]
    AlreadyRunning,

    /// Host property/input registry rejected a call
    #[error("Host error: {0}")]
    Host(String),

    /// Wrapped device reported a failure
    #[error("Device error: {0}")]
    Device(String),

    /// Background thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
