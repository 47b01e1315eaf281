//! Identity, session and profile types. Sessions carry bearer tokens, so they
//! only expose them through `secrecy` and must never be logged.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Backend-issued account identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Authenticated account as reported by the auth API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Live session: identity plus the bearer tokens that authorize row requests.
#[derive(Clone, Debug)]
pub struct Session {
    pub user: Identity,
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Unix timestamp (seconds) after which the access token is rejected.
    pub expires_at: Option<i64>,
}

impl Session {
    /// True once the access token is expired or within `leeway_secs` of it.
    #[must_use]
    pub fn is_expired(&self, now: i64, leeway_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= now.saturating_add(leeway_secs))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
        };
        f.write_str(name)
    }
}

/// Auth-state change notification delivered to subscribers.
#[derive(Clone, Debug)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.session.as_ref().map(|session| session.user.clone())
    }
}

/// Account role. `Admin` passes every role requirement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Student,
    Staff,
    Admin,
    Recycler,
}

impl Role {
    pub const ALL: [Self; 4] = [Self::Student, Self::Staff, Self::Admin, Self::Recycler];

    /// Whether an account holding `self` may access content requiring `required`.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self == required || self == Self::Admin
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Admin => "admin",
            Self::Recycler => "recycler",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Application-level user record stored in the `profiles` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub role: Role,
    pub points: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile record; only the fields that are `Some` are sent and merged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Copies the supplied fields into `profile` and leaves everything else alone.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(email) = &self.email {
            profile.email.clone_from(email);
        }
        if let Some(full_name) = &self.full_name {
            profile.full_name = Some(full_name.clone());
        }
        if let Some(student_id) = &self.student_id {
            profile.student_id = Some(student_id.clone());
        }
        if let Some(role) = self.role {
            profile.role = role;
        }
        if let Some(points) = self.points {
            profile.points = points;
        }
    }
}

/// Metadata attached to a new account; the backend provisions the profile from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignUpDetails {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub role: Role,
}

impl SignUpDetails {
    #[must_use]
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            student_id: None,
            role: Role::default(),
        }
    }

    #[must_use]
    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}
