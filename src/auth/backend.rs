//! Contract of the hosted auth/profile backend. The session core only talks to
//! the backend through [`AuthBackend`], which keeps it testable against a
//! scripted implementation and independent of the wire protocol.

use crate::api::errors::BackendError;
use crate::auth::types::{AuthChange, Profile, ProfileUpdate, Session, SignUpDetails, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::broadcast;
use tracing::warn;

/// Capacity of the auth-change fan-out; slow subscribers skip older events.
pub const AUTH_CHANNEL_CAPACITY: usize = 32;

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Registers for auth-state changes. Dropping the subscription unregisters.
    fn subscribe(&self) -> AuthSubscription;

    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        details: &SignUpDetails,
    ) -> Result<(), BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Fetches exactly one profile; a missing row is [`BackendError::NotFound`].
    async fn fetch_profile(&self, id: &UserId) -> Result<Profile, BackendError>;

    async fn update_profile(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), BackendError>;
}

/// Unsubscribe token for auth-state changes.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<AuthChange>) -> Self {
        Self { receiver }
    }

    /// Next change, or `None` once the backend is gone.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // The latest event is still delivered, which is the one that matters.
                    warn!("auth subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Explicit form of dropping the subscription.
    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{AuthEvent, Identity};
    use uuid::Uuid;

    fn change(event: AuthEvent) -> AuthChange {
        AuthChange {
            event,
            session: Some(Session {
                user: Identity {
                    id: UserId(Uuid::new_v4()),
                    email: None,
                },
                access_token: SecretString::from("a"),
                refresh_token: SecretString::from("r"),
                expires_at: None,
            }),
        }
    }

    #[tokio::test]
    async fn subscription_survives_lag() {
        let (tx, rx) = broadcast::channel(2);
        let mut subscription = AuthSubscription::new(rx);
        for _ in 0..4 {
            let _ = tx.send(change(AuthEvent::TokenRefreshed));
        }
        let _ = tx.send(change(AuthEvent::SignedOut));

        let mut last = None;
        while let Ok(Some(next)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), subscription.recv()).await
        {
            last = Some(next.event);
        }
        assert_eq!(last, Some(AuthEvent::SignedOut));
    }

    #[tokio::test]
    async fn subscription_ends_when_sender_dropped() {
        let (tx, rx) = broadcast::channel::<AuthChange>(2);
        let mut subscription = AuthSubscription::new(rx);
        drop(tx);
        assert!(subscription.recv().await.is_none());
    }

    #[tokio::test]
    async fn unsubscribe_releases_receiver() {
        let (tx, rx) = broadcast::channel::<AuthChange>(2);
        let subscription = AuthSubscription::new(rx);
        assert_eq!(tx.receiver_count(), 1);
        subscription.unsubscribe();
        assert_eq!(tx.receiver_count(), 0);
    }
}
