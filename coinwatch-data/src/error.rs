use smol_str::SmolStr;
use thiserror::Error;

/// All errors generated in `coinwatch-data`.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FeedError {
    #[error("upstream transport failure: {0}")]
    Network(String),

    #[error("request deadline exceeded: {0}")]
    Timeout(String),

    #[error("malformed upstream payload: {0}")]
    Decode(String),

    #[error("unsupported interval label: {0}")]
    UnknownInterval(SmolStr),

    #[error("subscriber connection broken: {0}")]
    ClientDisconnected(String),
}

impl FeedError {
    /// Determine if an error was caused by the caller's request rather than
    /// the upstream or our own handling of it.
    pub fn is_request_error(&self) -> bool {
        matches!(self, FeedError::UnknownInterval(_))
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}
