use thiserror::Error;

/// `PostgREST` code returned when a single-row request matched nothing.
pub const NO_MATCHING_ROW: &str = "PGRST116";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Displays the backend message verbatim so it can be shown to the user.
    #[error("{message}")]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("no matching row")]
    NotFound,
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl BackendError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// HTTP status of the failed call, if the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout("Request timed out. Please try again.".to_string())
        } else if err.is_decode() {
            Self::Parse(format!("Failed to decode response: {err}"))
        } else if err.is_builder() {
            Self::Serialization(format!("Failed to build request: {err}"))
        } else {
            Self::Network(format!("Unable to reach the server: {err}"))
        }
    }
}
