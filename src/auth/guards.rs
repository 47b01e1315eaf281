//! Route guards. `RequireAuth` is re-evaluated on every session change and
//! blocks content until the user is signed in (and holds the required role).
//! `OptionalAuth` never blocks: it only holds content back until the session
//! settles or the grace period runs out, whichever comes first.
//!
//! Guards are UX only; the backend enforces access on its rows.

use crate::auth::state::{SessionState, SessionStore};
use crate::auth::types::Role;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Longest time the optional guard holds content back.
pub const OPTIONAL_AUTH_GRACE: Duration = Duration::from_millis(3000);

/// Decision of the mandatory guard for one session snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    Loading,
    Unauthenticated,
    Forbidden { required: Role },
    Authorized,
}

/// What a guard renders in place of, or as, its content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered<T> {
    Loading,
    SignInForm,
    AccessDenied { required: Role },
    Content(T),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequireAuth {
    required_role: Option<Role>,
}

impl RequireAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_role(role: Role) -> Self {
        Self {
            required_role: Some(role),
        }
    }

    #[must_use]
    pub fn required_role(&self) -> Option<Role> {
        self.required_role
    }

    #[must_use]
    pub fn evaluate(&self, state: &SessionState) -> Gate {
        if state.loading {
            return Gate::Loading;
        }

        let (Some(_), Some(profile)) = (&state.identity, &state.profile) else {
            return Gate::Unauthenticated;
        };

        match self.required_role {
            Some(required) if !profile.role.satisfies(required) => Gate::Forbidden { required },
            _ => Gate::Authorized,
        }
    }

    /// Renders `content` only when the session is authorized.
    pub fn wrap<T>(&self, state: &SessionState, content: impl FnOnce() -> T) -> Rendered<T> {
        match self.evaluate(state) {
            Gate::Loading => Rendered::Loading,
            Gate::Unauthenticated => Rendered::SignInForm,
            Gate::Forbidden { required } => Rendered::AccessDenied { required },
            Gate::Authorized => Rendered::Content(content()),
        }
    }

    /// Waits for the session to settle, then decides.
    pub async fn settle(&self, store: &SessionStore) -> Gate {
        let state = store.settled().await;
        self.evaluate(&state)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reveal {
    Loading,
    Revealed,
}

/// Mounted optional guard. Owns a single timer that is cancelled on drop.
pub struct OptionalAuth {
    session: watch::Receiver<SessionState>,
    revealed: watch::Receiver<bool>,
    timer: JoinHandle<()>,
}

impl OptionalAuth {
    #[must_use]
    pub fn mount(store: &SessionStore) -> Self {
        Self::with_grace(store, OPTIONAL_AUTH_GRACE)
    }

    #[must_use]
    pub fn with_grace(store: &SessionStore, grace: Duration) -> Self {
        let session = store.subscribe();
        let (reveal, revealed) = watch::channel(false);

        let mut settled = session.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(grace) => {
                    debug!("optional auth grace period elapsed, revealing content");
                }
                _ = settled.wait_for(|state| !state.loading) => {}
            }
            reveal.send_replace(true);
        });

        Self {
            session,
            revealed,
            timer,
        }
    }

    /// Current decision; once revealed it stays revealed.
    #[must_use]
    pub fn state(&self) -> Reveal {
        if *self.revealed.borrow() || !self.session.borrow().loading {
            Reveal::Revealed
        } else {
            Reveal::Loading
        }
    }

    /// Renders `content` once revealed, whatever the authentication outcome.
    pub fn wrap<T>(&self, content: impl FnOnce() -> T) -> Rendered<T> {
        match self.state() {
            Reveal::Loading => Rendered::Loading,
            Reveal::Revealed => Rendered::Content(content()),
        }
    }

    /// Resolves once content may be shown.
    pub async fn revealed(&mut self) {
        if self.state() == Reveal::Revealed {
            return;
        }
        // The timer task always reveals before it ends, so an error here
        // means the guard is being torn down.
        let _ = self.revealed.wait_for(|revealed| *revealed).await;
    }

    pub fn unmount(self) {}
}

impl Drop for OptionalAuth {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
