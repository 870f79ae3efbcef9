use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("No bits were found. Bad swipe or microphone level is wrong?")]
    NoBits,

    /// Framing stopped on a short or even-parity group. Reported as a
    /// diagnostic, never returned as the result of a decode.
    #[error("Malformed byte {group} with {remaining} bits left")]
    MalformedByte { group: String, remaining: usize },

    #[error("No start sentinel")]
    NoStartSentinel,

    #[error("Bad LRC: expected {expected}, found {found}")]
    BadLrc { expected: String, found: String },

    #[error("No end sentinel")]
    NoEndSentinel,

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Swipe exceeded {limit} samples ({samples} buffered)")]
    SwipeTooLong { samples: usize, limit: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Device(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
