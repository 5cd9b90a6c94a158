/// Why a remote resource behind a layer could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Status(u16),
    Network(String),
    Timeout,
}

impl FetchError {
    /// Classifies a transport failure. A request cancelled by its own
    /// deadline surfaces as a generic abort, so the caller says whether the
    /// deadline had already fired.
    pub fn from_failure(message: impl Into<String>, deadline_passed: bool) -> Self {
        if deadline_passed {
            FetchError::Timeout
        } else {
            FetchError::Network(message.into())
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status(code) => write!(f, "server responded with HTTP {code}"),
            FetchError::Network(msg) => write!(f, "network error: {msg}"),
            FetchError::Timeout => write!(f, "request timed out"),
        }
    }
}

impl std::error::Error for FetchError {}
