//! Per-command session context: builds the backend, starts the session store
//! with a console notifier and runs the command through its guard. The store
//! is torn down when the context is dropped.

use crate::auth::guards::{Gate, OptionalAuth, RequireAuth};
use crate::auth::rest::RestBackend;
use crate::auth::state::{SessionHandle, SessionState, SessionStore};
use crate::auth::types::Profile;
use crate::cli::globals::GlobalArgs;
use crate::notify::{Notification, Notifier};
use crate::reports::ReportBackend;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Prints notifications: successes to stdout, errors to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            eprintln!("✗ {notification}");
        } else {
            println!("✓ {notification}");
        }
    }
}

pub struct Console {
    backend: Arc<RestBackend>,
    handle: SessionHandle,
    timeout: Duration,
}

impl Console {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn open(globals: &GlobalArgs) -> Result<Self> {
        let backend = Arc::new(globals.backend()?);
        let store = SessionStore::new(backend.clone(), Arc::new(ConsoleNotifier));
        let handle = store.start();

        Ok(Self {
            backend,
            handle,
            timeout: globals.api.timeout,
        })
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        self.handle.store()
    }

    #[must_use]
    pub fn reports(&self) -> &dyn ReportBackend {
        self.backend.as_ref()
    }

    /// Runs the mandatory guard and returns the authorized session.
    ///
    /// # Errors
    /// Returns an error when nobody is signed in or the role does not match.
    pub async fn require(&self, guard: RequireAuth) -> Result<SessionState> {
        match guard.settle(self.store()).await {
            Gate::Authorized => Ok(self.store().snapshot()),
            Gate::Unauthenticated => Err(anyhow!(
                "Please sign in first: ecocampus signin --email <email>"
            )),
            Gate::Forbidden { required } => Err(anyhow!(
                "Access denied: this command requires the {required} role"
            )),
            Gate::Loading => Err(anyhow!("session is still loading")),
        }
    }

    /// Runs the optional guard: waits for the session for at most the grace
    /// period, then continues whatever the outcome.
    pub async fn optional(&self) -> SessionState {
        let mut guard = OptionalAuth::mount(self.store());
        guard.revealed().await;
        guard.unmount();
        self.store().snapshot()
    }

    /// Waits for the identity announced by a successful sign-in to settle.
    pub async fn signed_in(&self) -> SessionState {
        let mut receiver = self.store().subscribe();
        let settled = tokio::time::timeout(
            self.timeout,
            receiver.wait_for(|state| state.identity.is_some() && !state.loading),
        )
        .await
        .is_ok();
        if !settled {
            debug!("sign-in did not settle within {:?}", self.timeout);
        }
        self.store().snapshot()
    }

    pub fn close(self) {
        self.handle.shutdown();
    }
}

#[must_use]
pub fn display_name(profile: &Profile) -> &str {
    profile
        .full_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&profile.email)
}

pub fn print_profile(profile: &Profile) {
    println!("Name:       {}", display_name(profile));
    println!("Email:      {}", profile.email);
    println!(
        "Student ID: {}",
        profile.student_id.as_deref().unwrap_or("-")
    );
    println!("Role:       {}", profile.role);
    println!("Points:     {}", profile.points);
    println!("Member since {}", profile.created_at.format("%Y-%m-%d"));
}
