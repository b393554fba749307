//! Error types for the feed engine.

use thiserror::Error;

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors that can occur while talking to the photo API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Network or transport error, including timeouts.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a status outside `200..300`.
    #[error("unexpected http status {0}")]
    Status(u16),

    /// The body could not be decoded into the expected record.
    #[error("decode error: {message}")]
    Decode {
        /// Decoder message.
        message: String,
        /// Bounded preview of the raw body, kept for diagnostics.
        body_preview: String,
    },

    /// An identical request is already in flight.
    #[error("duplicate request")]
    DuplicateRequest,

    /// No bearer credential is stored.
    #[error("no credential stored")]
    NoCredential,

    /// The request was superseded or the engine was reset before it finished.
    #[error("stale result discarded")]
    Stale,

    /// A like or unlike request failed; the photo was left unchanged.
    #[error("like mutation failed: {0}")]
    MutationFailed(#[source] Box<FeedError>),

    /// The user record carries no small avatar URL.
    #[error("profile has no avatar")]
    MissingAvatar,

    /// A row index outside the collection.
    #[error("index {index} out of range for {len} photos")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Collection length at the time of the request.
        len: usize,
    },

    /// Invalid configuration, detected at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// The credential store could not be read or written.
    #[error("credential storage error: {0}")]
    Storage(String),

    /// Services were used outside a tokio runtime.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The main loop has shut down.
    #[error("main loop shut down")]
    Shutdown,
}

impl FeedError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true if this error must never reach the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, FeedError::Stale)
    }

    /// Returns true if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Transport(_) => true,
            FeedError::Status(code) => matches!(code, 408 | 429 | 500..=599),
            FeedError::MutationFailed(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        FeedError::Storage(err.to_string())
    }
}
