//! HTTP implementation of the backend contracts against the hosted service:
//! GoTrue-style endpoints under `/auth/v1` and PostgREST-style row endpoints
//! under `/rest/v1`. The session is cached in memory and, when a session file
//! is configured, persisted between runs with owner-only permissions.

use crate::api::{self, errors::BackendError, ApiConfig};
use crate::auth::backend::{AuthBackend, AuthSubscription, AUTH_CHANNEL_CAPACITY};
use crate::auth::types::{
    AuthChange, AuthEvent, Identity, Profile, ProfileUpdate, Session, SignUpDetails, UserId,
};
use crate::reports::types::{NewWasteReport, WasteReport};
use crate::reports::ReportBackend;
use crate::APP_USER_AGENT;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

/// Access tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 30;
/// Asks the row API for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Identity,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|expires_in| Utc::now().timestamp().saturating_add(expires_in))
        });
        Session {
            user: self.user,
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
        }
    }
}

/// On-disk form of a session.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
    user: Identity,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.expose_secret().to_string(),
            refresh_token: session.refresh_token.expose_secret().to_string(),
            expires_at: session.expires_at,
            user: session.user.clone(),
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            user: stored.user,
            access_token: SecretString::from(stored.access_token),
            refresh_token: SecretString::from(stored.refresh_token),
            expires_at: stored.expires_at,
        }
    }
}

/// File the session survives in between runs.
#[derive(Clone, Debug)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn load(&self) -> Result<Option<Session>, BackendError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(BackendError::Storage(format!(
                    "{}: {err}",
                    self.path.display()
                )))
            }
        };

        let stored: StoredSession = serde_json::from_slice(&bytes).map_err(|err| {
            BackendError::Storage(format!("{}: {err}", self.path.display()))
        })?;

        Ok(Some(stored.into()))
    }

    /// # Errors
    /// Returns an error if the file or its directory cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), BackendError> {
        let storage_error =
            |err: std::io::Error| BackendError::Storage(format!("{}: {err}", self.path.display()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(storage_error)?;
            }
        }

        let payload = serde_json::to_vec(&StoredSession::from(session))
            .map_err(|err| BackendError::Serialization(err.to_string()))?;
        tokio::fs::write(&self.path, payload)
            .await
            .map_err(storage_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(storage_error)?;
        }

        Ok(())
    }

    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<(), BackendError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BackendError::Storage(format!(
                "{}: {err}",
                self.path.display()
            ))),
        }
    }
}

pub struct RestBackend {
    config: ApiConfig,
    http: Client,
    session: Mutex<Option<Session>>,
    storage: Option<SessionFile>,
    events: broadcast::Sender<AuthChange>,
}

impl RestBackend {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ApiConfig, storage: Option<SessionFile>) -> Result<Self, BackendError> {
        let http = api::client(APP_USER_AGENT, config.timeout)?;
        let (events, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            http,
            session: Mutex::new(None),
            storage,
            events,
        })
    }

    fn cached(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds the API key and the bearer token: the user's access token when
    /// signed in, the API key otherwise.
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self.cached().as_ref().map_or_else(
            || self.config.api_key.expose_secret().to_string(),
            |session| session.access_token.expose_secret().to_string(),
        );
        builder
            .header("apikey", self.config.api_key.expose_secret())
            .bearer_auth(bearer)
    }

    fn broadcast(&self, event: AuthEvent, session: Option<Session>) {
        // No subscribers is fine: nobody is watching the session yet.
        let _ = self.events.send(AuthChange { event, session });
    }

    async fn store_session(&self, session: Session, event: AuthEvent) {
        *self.cached() = Some(session.clone());

        if let Some(storage) = &self.storage {
            if let Err(err) = storage.save(&session).await {
                warn!("session not persisted: {}", err);
            }
        }

        self.broadcast(event, Some(session));
    }

    async fn clear_session(&self) {
        *self.cached() = None;

        if let Some(storage) = &self.storage {
            if let Err(err) = storage.clear().await {
                warn!("stale session file left behind: {}", err);
            }
        }

        self.broadcast(AuthEvent::SignedOut, None);
    }

    async fn token_request(&self, grant_type: &str, body: Value) -> Result<Session, BackendError> {
        let url = self.config.endpoint("/auth/v1/token");
        let response = self
            .http
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .header("apikey", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let token: TokenResponse = api::json_response(response).await?;
        Ok(token.into_session())
    }

    #[instrument(skip_all, fields(user = %session.user.id))]
    async fn refresh(&self, session: &Session) -> Result<Session, BackendError> {
        let body = json!({ "refresh_token": session.refresh_token.expose_secret() });
        let refreshed = self.token_request("refresh_token", body).await?;
        debug!("access token refreshed");
        self.store_session(refreshed.clone(), AuthEvent::TokenRefreshed)
            .await;
        Ok(refreshed)
    }
}

#[async_trait]
impl AuthBackend for RestBackend {
    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        let cached = self.cached().clone();
        let session = match (cached, &self.storage) {
            (Some(session), _) => Some(session),
            (None, Some(storage)) => storage.load().await?,
            (None, None) => None,
        };

        let Some(session) = session else {
            return Ok(None);
        };

        if !session.is_expired(Utc::now().timestamp(), EXPIRY_MARGIN_SECS) {
            *self.cached() = Some(session.clone());
            return Ok(Some(session));
        }

        match self.refresh(&session).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(BackendError::Http { status, .. }) if (400..500).contains(&status) => {
                warn!("refresh token rejected ({}), signing out", status);
                self.clear_session().await;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, BackendError> {
        let body = json!({ "email": email, "password": password.expose_secret() });
        let session = self.token_request("password", body).await?;
        self.store_session(session.clone(), AuthEvent::SignedIn).await;
        Ok(session)
    }

    #[instrument(skip(self, password, details))]
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        details: &SignUpDetails,
    ) -> Result<(), BackendError> {
        let url = self.config.endpoint("/auth/v1/signup");
        let body = json!({
            "email": email,
            "password": password.expose_secret(),
            "data": details,
        });

        let response = self
            .http
            .post(&url)
            .header("apikey", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let created: Value = api::json_response(response).await?;

        // Without email confirmation the backend signs the account in right away.
        if created.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(created)
                .map_err(|err| BackendError::Parse(format!("Failed to decode response: {err}")))?;
            self.store_session(token.into_session(), AuthEvent::SignedIn)
                .await;
        } else {
            debug!("account created, awaiting email confirmation");
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), BackendError> {
        let signed_in = self.cached().is_some();

        if signed_in {
            let url = self.config.endpoint("/auth/v1/logout");
            let response = self.authorize(self.http.post(&url)).send().await?;
            match api::empty_response(response).await {
                Ok(()) => {}
                // The session is already gone on the backend side.
                Err(BackendError::Http { status, .. }) if matches!(status, 401 | 403 | 404) => {
                    debug!("session already revoked ({})", status);
                }
                Err(err) => return Err(err),
            }
        }

        self.clear_session().await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self, id: &UserId) -> Result<Profile, BackendError> {
        let url = self.config.endpoint("/rest/v1/profiles");
        let request = self
            .http
            .get(&url)
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())])
            .header("Accept", SINGLE_OBJECT);

        let response = self.authorize(request).send().await?;
        api::json_response(response).await
    }

    #[instrument(skip(self, update))]
    async fn update_profile(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let mut body = serde_json::to_value(update)
            .map_err(|err| BackendError::Serialization(err.to_string()))?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("updated_at".to_string(), json!(updated_at.to_rfc3339()));
        }

        let url = self.config.endpoint("/rest/v1/profiles");
        let request = self
            .http
            .patch(&url)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(&body);

        let response = self.authorize(request).send().await?;
        api::empty_response(response).await
    }
}

#[async_trait]
impl ReportBackend for RestBackend {
    #[instrument(skip_all, fields(waste_type = %report.waste_type))]
    async fn insert_report(&self, report: &NewWasteReport) -> Result<WasteReport, BackendError> {
        let url = self.config.endpoint("/rest/v1/waste_reports");
        let request = self
            .http
            .post(&url)
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(report);

        let response = self.authorize(request).send().await?;
        api::json_response(response).await
    }

    #[instrument(skip(self))]
    async fn recent_reports(&self, limit: usize) -> Result<Vec<WasteReport>, BackendError> {
        let url = self.config.endpoint("/rest/v1/waste_reports");
        let request = self.http.get(&url).query(&[
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]);

        let response = self.authorize(request).send().await?;
        api::json_response(response).await
    }
}
