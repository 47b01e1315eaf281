use crate::api::{errors::BackendError, ApiConfig};
use crate::auth::rest::{RestBackend, SessionFile};
use std::path::PathBuf;

#[derive(Clone)]
pub struct GlobalArgs {
    pub api: ApiConfig,
    pub session_file: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api: ApiConfig, session_file: Option<PathBuf>) -> Self {
        Self {
            api,
            session_file: session_file.unwrap_or_else(default_session_file),
        }
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn backend(&self) -> Result<RestBackend, BackendError> {
        RestBackend::new(
            self.api.clone(),
            Some(SessionFile::new(self.session_file.clone())),
        )
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("api_url", &self.api.base_url.as_str())
            .field("api_key", &"***")
            .field("timeout", &self.api.timeout)
            .field("session_file", &self.session_file)
            .finish()
    }
}

/// `$HOME/.ecocampus/session.json`, or relative to the working directory
/// when `HOME` is unset.
#[must_use]
pub fn default_session_file() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".ecocampus")
        .join("session.json")
}
