//! Scripted in-memory backend for exercising the session store. Every reply
//! can be held back behind a oneshot gate so tests decide the order in which
//! concurrent resolutions land.

use crate::api::errors::BackendError;
use crate::auth::backend::{AuthBackend, AuthSubscription, AUTH_CHANNEL_CAPACITY};
use crate::auth::types::{
    AuthChange, AuthEvent, Identity, Profile, ProfileUpdate, Role, Session, SignUpDetails, UserId,
};
use crate::reports::types::{NewWasteReport, ReportStatus, WasteReport};
use crate::reports::ReportBackend;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

type InitialReply = Result<Option<Session>, BackendError>;

pub(crate) enum ProfileReply {
    Ready(Result<Profile, BackendError>),
    Gated(oneshot::Receiver<Result<Profile, BackendError>>),
    /// Never answers.
    Pending,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn identity(email: &str) -> Identity {
    Identity {
        id: UserId(Uuid::new_v4()),
        email: Some(email.to_string()),
    }
}

pub(crate) fn session_for(identity: &Identity) -> Session {
    Session {
        user: identity.clone(),
        access_token: SecretString::from("access"),
        refresh_token: SecretString::from("refresh"),
        expires_at: None,
    }
}

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0)
        .single()
        .unwrap_or_default()
}

pub(crate) fn profile_for(identity: &Identity, role: Role, points: u32) -> Profile {
    Profile {
        id: identity.id,
        email: identity.email.clone().unwrap_or_default(),
        full_name: Some("Ada Lovelace".to_string()),
        student_id: Some("S-1815".to_string()),
        role,
        points,
        created_at: created_at(),
        updated_at: created_at(),
    }
}

pub(crate) struct ScriptedBackend {
    events: broadcast::Sender<AuthChange>,
    initial: Mutex<Option<oneshot::Receiver<InitialReply>>>,
    profiles: Mutex<HashMap<UserId, VecDeque<ProfileReply>>>,
    sign_in: Mutex<Option<Result<Session, BackendError>>>,
    update_result: Mutex<Result<(), BackendError>>,
    updates: Mutex<Vec<(UserId, ProfileUpdate)>>,
    profile_calls: Mutex<usize>,
}

impl ScriptedBackend {
    /// Backend whose initial session check answers `session` right away.
    pub(crate) fn with_session(session: Option<Session>) -> Arc<Self> {
        let (backend, gate) = Self::gated();
        let _ = gate.send(Ok(session));
        backend
    }

    /// Backend whose initial session check waits for the returned gate.
    pub(crate) fn gated() -> (Arc<Self>, oneshot::Sender<InitialReply>) {
        let (events, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);
        let (gate, initial) = oneshot::channel();
        let backend = Arc::new(Self {
            events,
            initial: Mutex::new(Some(initial)),
            profiles: Mutex::new(HashMap::new()),
            sign_in: Mutex::new(None),
            update_result: Mutex::new(Ok(())),
            updates: Mutex::new(Vec::new()),
            profile_calls: Mutex::new(0),
        });
        (backend, gate)
    }

    pub(crate) fn queue_profile(&self, id: UserId, reply: ProfileReply) {
        lock(&self.profiles).entry(id).or_default().push_back(reply);
    }

    /// Queues a profile reply that is held until the returned gate fires.
    pub(crate) fn gate_profile(
        &self,
        id: UserId,
    ) -> oneshot::Sender<Result<Profile, BackendError>> {
        let (gate, reply) = oneshot::channel();
        self.queue_profile(id, ProfileReply::Gated(reply));
        gate
    }

    pub(crate) fn set_sign_in(&self, result: Result<Session, BackendError>) {
        *lock(&self.sign_in) = Some(result);
    }

    pub(crate) fn set_update_result(&self, result: Result<(), BackendError>) {
        *lock(&self.update_result) = result;
    }

    pub(crate) fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let _ = self.events.send(AuthChange { event, session });
    }

    pub(crate) fn updates(&self) -> Vec<(UserId, ProfileUpdate)> {
        lock(&self.updates).clone()
    }

    pub(crate) fn profile_calls(&self) -> usize {
        *lock(&self.profile_calls)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        let initial = lock(&self.initial).take();
        match initial {
            Some(reply) => reply.await.unwrap_or(Ok(None)),
            None => Ok(None),
        }
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &SecretString,
    ) -> Result<Session, BackendError> {
        let scripted = lock(&self.sign_in).take();
        let result = scripted.unwrap_or_else(|| {
            Err(BackendError::Http {
                status: 400,
                code: Some("invalid_credentials".to_string()),
                message: "Invalid login credentials".to_string(),
            })
        });
        if let Ok(session) = &result {
            self.emit(AuthEvent::SignedIn, Some(session.clone()));
        }
        result
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &SecretString,
        _details: &SignUpDetails,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn fetch_profile(&self, id: &UserId) -> Result<Profile, BackendError> {
        *lock(&self.profile_calls) += 1;
        let reply = lock(&self.profiles)
            .get_mut(id)
            .and_then(VecDeque::pop_front);

        match reply {
            Some(ProfileReply::Ready(result)) => result,
            Some(ProfileReply::Gated(reply)) => reply
                .await
                .unwrap_or_else(|_| Err(BackendError::Network("gate dropped".to_string()))),
            Some(ProfileReply::Pending) => std::future::pending().await,
            None => Err(BackendError::NotFound),
        }
    }

    async fn update_profile(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        lock(&self.updates).push((*id, update.clone()));
        lock(&self.update_result).clone()
    }
}

/// Report table double: records inserts and answers with a scripted result.
pub(crate) struct ScriptedReports {
    insert_error: Mutex<Option<BackendError>>,
    inserted: Mutex<Vec<NewWasteReport>>,
}

impl ScriptedReports {
    pub(crate) fn new() -> Self {
        Self {
            insert_error: Mutex::new(None),
            inserted: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(err: BackendError) -> Self {
        let reports = Self::new();
        *lock(&reports.insert_error) = Some(err);
        reports
    }

    pub(crate) fn inserted(&self) -> Vec<NewWasteReport> {
        lock(&self.inserted).clone()
    }
}

fn row(report: &NewWasteReport) -> WasteReport {
    WasteReport {
        id: Uuid::new_v4(),
        user_id: report.user_id,
        title: report.title.clone(),
        description: Some(report.description.clone()),
        waste_type: report.waste_type,
        location_name: Some(report.location_name.clone()),
        status: ReportStatus::Pending,
        points_awarded: None,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ReportBackend for ScriptedReports {
    async fn insert_report(&self, report: &NewWasteReport) -> Result<WasteReport, BackendError> {
        if let Some(err) = lock(&self.insert_error).clone() {
            return Err(err);
        }
        lock(&self.inserted).push(report.clone());
        Ok(row(report))
    }

    async fn recent_reports(&self, limit: usize) -> Result<Vec<WasteReport>, BackendError> {
        Ok(lock(&self.inserted).iter().rev().take(limit).map(row).collect())
    }
}
