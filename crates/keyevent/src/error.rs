use thiserror::Error;

/// The main error type for keyevent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Error parsing or validating a key combination
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The OS refused to install or remove a hotkey hook
    #[error("Hotkey install error: {0}")]
    Install(String),

    /// A proxy clashes with a different registered proxy on identifier or name
    #[error("Registry conflict: {0}")]
    Conflict(String),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<global_hotkey::Error> for Error {
    fn from(err: global_hotkey::Error) -> Self {
        Error::Install(err.to_string())
    }
}
