//! HTTP helpers shared by the backend clients. They build endpoint URLs from the
//! configured base, enforce one timeout policy and turn error bodies into
//! [`BackendError`] values whose message can be shown to users. The helpers
//! never log request bodies; callers attach the auth headers they need.

pub mod errors;

use errors::{BackendError, NO_MATCHING_ROW};
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default request timeout (seconds) applied to every backend call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

/// Connection settings for the hosted backend. The API key is the public
/// (anon) key; it is still kept out of logs.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: Url,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl ApiConfig {
    /// # Errors
    /// Returns an error if `base_url` cannot be parsed, has no host, or uses an unsupported scheme.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, BackendError> {
        let url = Url::parse(base_url)
            .map_err(|err| BackendError::Config(format!("invalid API URL {base_url}: {err}")))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(BackendError::Config(format!(
                    "unsupported scheme {scheme}"
                )))
            }
        }

        if url.host().is_none() {
            return Err(BackendError::Config(
                "invalid API URL: no host specified".to_string(),
            ));
        }

        Ok(Self {
            base_url: url,
            api_key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL for a backend path such as `/auth/v1/signup`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        build_url_with_base(self.base_url.as_str(), path)
    }
}

/// # Errors
/// Returns an error if the underlying HTTP client cannot be constructed.
pub fn client(user_agent: &str, timeout: Duration) -> Result<Client, BackendError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|err| BackendError::Config(format!("Failed to build HTTP client: {err}")))
}

/// Builds a URL from an explicit base URL and the provided path.
#[must_use]
pub fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Picks the human-readable message out of an auth or row API error body.
fn error_message(json: &Value) -> Option<&str> {
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| json.get(key).and_then(Value::as_str))
        .filter(|message| !message.trim().is_empty())
}

/// Machine-readable error code; the auth API uses `error_code`, the row API `code`.
fn error_code(json: &Value) -> Option<String> {
    ["error_code", "code"]
        .iter()
        .find_map(|key| json.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Converts a non-success response into a [`BackendError`], mapping the
/// "no matching row" code to [`BackendError::NotFound`].
pub async fn error_from_response(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    error_from_body(status, &body)
}

/// The message taken from a JSON error body is kept verbatim; only raw bodies
/// are truncated.
fn error_from_body(status: u16, body: &str) -> BackendError {
    let json: Option<Value> = serde_json::from_str(body).ok();

    let code = json.as_ref().and_then(error_code);
    if code.as_deref() == Some(NO_MATCHING_ROW) {
        return BackendError::NotFound;
    }

    let message = json
        .as_ref()
        .and_then(error_message)
        .map_or_else(|| sanitize_body(body), |message| message.trim().to_string());

    BackendError::Http {
        status,
        code,
        message,
    }
}

/// Parses JSON responses and surfaces HTTP errors with sanitized bodies.
///
/// # Errors
/// Returns an error on a non-success status or an undecodable body.
pub async fn json_response<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| BackendError::Parse(format!("Failed to decode response: {err}")))
    } else {
        Err(error_from_response(response).await)
    }
}

/// Handles responses whose body is ignored.
///
/// # Errors
/// Returns an error on a non-success status.
pub async fn empty_response(response: Response) -> Result<(), BackendError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from_response(response).await)
    }
}

/// Sanitizes HTTP error bodies for user-facing messages by trimming and truncating.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
