//! Process-wide auth session state. The store subscribes to backend auth
//! changes before it asks for the current session, and every resolution is
//! tagged with a monotonic version so a late answer about an older identity
//! never overwrites a newer one. Observers read snapshots through a `watch`
//! channel; only the store's own handlers and the profile merge of
//! [`SessionStore::update_profile`] write to it.

use crate::auth::backend::AuthBackend;
use crate::auth::profile::{fetch_profile, ProfileOutcome};
use crate::auth::types::{Identity, Profile, ProfileUpdate, UserId};
use crate::notify::{Notification, Notifier};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Read-only view of the session exposed to guards and UI.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    /// `None` until fetched; may lag `identity` while the fetch is in flight.
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.profile.as_ref().map_or(0, |profile| profile.points)
    }
}

struct Inner {
    state: SessionState,
    version: u64,
    closed: bool,
}

pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<Inner>,
    watch: watch::Sender<SessionState>,
}

impl SessionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        let (watch, _) = watch::channel(SessionState::initial());
        Arc::new(Self {
            backend,
            notifier,
            inner: Mutex::new(Inner {
                state: SessionState::initial(),
                version: 0,
                closed: false,
            }),
            watch,
        })
    }

    /// Registers the auth-change listener, then issues the initial session
    /// check. The returned handle unregisters the listener when dropped.
    #[must_use]
    pub fn start(self: &Arc<Self>) -> SessionHandle {
        debug!("setting up auth state listener");
        let mut subscription = self.backend.subscribe();

        // Any change delivered after this point supersedes the initial check.
        let issued = self.lock().version;

        let store = Arc::clone(self);
        let listener = tokio::spawn(async move {
            while let Some(change) = subscription.recv().await {
                debug!(
                    "auth state changed: {} user: {}",
                    change.event,
                    change.session.is_some()
                );
                store.resolve(change.identity(), None);
            }
        });

        let store = Arc::clone(self);
        tokio::spawn(async move {
            let identity = match store.backend.current_session().await {
                Ok(session) => session.map(|session| session.user),
                Err(err) => {
                    warn!("initial session check failed: {}", err);
                    None
                }
            };
            debug!("initial session check: {}", identity.is_some());
            store.resolve(identity, Some(issued));
        });

        SessionHandle {
            store: Arc::clone(self),
            listener,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.watch.subscribe()
    }

    /// Number of live state observers (guards, UI bindings).
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.watch.receiver_count()
    }

    /// Waits until the current sign-in cycle has settled.
    pub async fn settled(&self) -> SessionState {
        let mut receiver = self.watch.subscribe();
        let settled = receiver
            .wait_for(|state| !state.loading)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.lock().state.identity.clone()
    }

    /// Re-fetches the profile of the current identity, e.g. after the backend
    /// awarded points. A newer auth change during the fetch wins.
    pub async fn refresh_profile(&self) {
        let target = {
            let inner = self.lock();
            inner
                .state
                .identity
                .as_ref()
                .map(|identity| (identity.id, inner.version))
        };

        if let Some((id, version)) = target {
            self.load_profile(id, version).await;
        }
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    /// Merges a confirmed partial update into the local profile, provided the
    /// identity it was issued for is still the current one.
    pub(crate) fn merge_profile(&self, id: UserId, update: &ProfileUpdate) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        let current = inner.state.identity.as_ref().map(|identity| identity.id);
        if current != Some(id) {
            debug!("identity changed during profile update, skipping merge");
            return;
        }
        if let Some(profile) = inner.state.profile.as_mut() {
            update.apply_to(profile);
        }
        self.publish(&inner);
    }

    fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.watch.send_replace(inner.state.clone());
    }

    /// Applies an identity resolution. `issued` is set for the initial check:
    /// the version it was issued at, so it is discarded if anything newer
    /// arrived while it was in flight.
    fn resolve(self: &Arc<Self>, identity: Option<Identity>, issued: Option<u64>) {
        let fetch = {
            let mut inner = self.lock();
            if inner.closed {
                return;
            }
            if let Some(issued) = issued {
                if inner.version != issued {
                    warn!("discarding stale initial session check");
                    return;
                }
            }

            inner.version += 1;
            let version = inner.version;

            match identity {
                None => {
                    inner.state.identity = None;
                    inner.state.profile = None;
                    inner.state.loading = false;
                    self.publish(&inner);
                    None
                }
                Some(identity) => {
                    let current = inner.state.identity.as_ref().map(|current| current.id);
                    if current != Some(identity.id) {
                        // New sign-in cycle: the old profile belongs to someone else.
                        inner.state.profile = None;
                        inner.state.loading = true;
                    }
                    let id = identity.id;
                    inner.state.identity = Some(identity);
                    self.publish(&inner);
                    Some((id, version))
                }
            }
        };

        if let Some((id, version)) = fetch {
            let store = Arc::clone(self);
            tokio::spawn(async move {
                store.load_profile(id, version).await;
            });
        }
    }

    async fn load_profile(&self, id: UserId, version: u64) {
        let outcome = fetch_profile(self.backend.as_ref(), &id).await;

        let failed = {
            let mut inner = self.lock();
            if inner.closed {
                return;
            }
            if inner.version != version {
                debug!("discarding stale profile resolution for user {}", id);
                return;
            }

            let failed = match outcome {
                ProfileOutcome::Found(profile) => {
                    inner.state.profile = Some(profile);
                    false
                }
                ProfileOutcome::NotFound => {
                    inner.state.profile = None;
                    false
                }
                ProfileOutcome::Failed(_) => true,
            };
            inner.state.loading = false;
            self.publish(&inner);
            failed
        };

        if failed {
            self.notify(Notification::error("Error", "Failed to load user profile"));
        }
    }
}

/// Scoped registration of the store's auth listener. Dropping the handle
/// unsubscribes; resolutions still in flight become no-ops.
pub struct SessionHandle {
    store: Arc<SessionStore>,
    listener: JoinHandle<()>,
}

impl SessionHandle {
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn shutdown(self) {}
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        debug!("cleaning up auth subscription");
        self.store.close();
        self.listener.abort();
    }
}
