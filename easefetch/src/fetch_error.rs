use thiserror::Error;

/// Errors surfaced by the fetch hooks.
///
/// Only [`FetchError::Fetch`] ever lands in a hook's `error` state. Cancellation
/// of a superseded attempt is discarded silently and never stored.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum FetchError {
    /// The fetcher failed with the given message.
    #[error("{0}")]
    Fetch(String),

    /// The attempt was cancelled, or the hook was disposed before it settled.
    #[error("Fetch was cancelled!")]
    Cancelled,

    /// The key could not be serialized, so it cannot be compared.
    #[error("Key is not serializable: {0}")]
    Key(String),

    /// A configuration record could not be parsed or holds an invalid value.
    #[error("Invalid fetch configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Shorthand for building a [`FetchError::Fetch`].
    pub fn fetch(message: impl Into<String>) -> Self {
        FetchError::Fetch(message.into())
    }

    /// Returns true if this error came from the fetcher.
    pub fn is_fetch(&self) -> bool {
        matches!(self, FetchError::Fetch(_))
    }

    /// Returns true if this error represents a cancelled attempt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    /// Returns true if the key could not be serialized.
    pub fn is_key(&self) -> bool {
        matches!(self, FetchError::Key(_))
    }

    /// The message carried by a fetch failure.
    pub fn message(&self) -> Option<&str> {
        match self {
            FetchError::Fetch(message) => Some(message),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::Key(error.to_string())
    }
}
