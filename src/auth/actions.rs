//! Sign-in, sign-up, sign-out and profile updates. Each action surfaces a
//! notification and hands the backend error back to the caller so a form can
//! reset its own submitting state. Identity changes are not written here: they
//! arrive through the auth-change subscription of the store.

use crate::api::errors::BackendError;
use crate::auth::state::SessionStore;
use crate::auth::types::{ProfileUpdate, SignUpDetails};
use crate::notify::Notification;
use chrono::Utc;
use secrecy::SecretString;
use tracing::{debug, instrument};

impl SessionStore {
    /// # Errors
    /// Returns the backend rejection; its message is also shown verbatim.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), BackendError> {
        match self.backend().sign_in_with_password(email, password).await {
            Ok(_) => {
                self.notify(Notification::success("Success", "Signed in successfully!"));
                Ok(())
            }
            Err(err) => {
                self.notify(Notification::error("Error", err.to_string()));
                Err(err)
            }
        }
    }

    /// Creates an account; depending on backend policy the user still has to
    /// confirm the email address before signing in.
    ///
    /// # Errors
    /// Returns the backend rejection; its message is also shown verbatim.
    #[instrument(skip(self, password, details), fields(role = %details.role))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        details: &SignUpDetails,
    ) -> Result<(), BackendError> {
        match self.backend().sign_up(email, password, details).await {
            Ok(()) => {
                self.notify(Notification::success(
                    "Success",
                    "Account created successfully! Please check your email to confirm your account.",
                ));
                Ok(())
            }
            Err(err) => {
                self.notify(Notification::error("Error", err.to_string()));
                Err(err)
            }
        }
    }

    /// # Errors
    /// Returns the backend rejection; its message is also shown verbatim.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        match self.backend().sign_out().await {
            Ok(()) => {
                self.notify(Notification::success("Success", "Signed out successfully!"));
                Ok(())
            }
            Err(err) => {
                self.notify(Notification::error("Error", err.to_string()));
                Err(err)
            }
        }
    }

    /// Sends a partial profile update. Without an active identity this is a
    /// no-op. On success the supplied fields are merged into the local profile
    /// without re-fetching it.
    ///
    /// # Errors
    /// Returns the backend rejection; local state is left untouched.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), BackendError> {
        match self.apply_profile_update(&update).await {
            Ok(false) => Ok(()),
            Ok(true) => {
                self.notify(Notification::success(
                    "Success",
                    "Profile updated successfully!",
                ));
                Ok(())
            }
            Err(err) => {
                self.notify(Notification::error("Error", "Failed to update profile"));
                Err(err)
            }
        }
    }

    /// Writes and merges `update` without notifying. Returns `false` when
    /// there was no identity to update.
    pub(crate) async fn apply_profile_update(
        &self,
        update: &ProfileUpdate,
    ) -> Result<bool, BackendError> {
        let Some(identity) = self.current_identity() else {
            debug!("no active identity, ignoring profile update");
            return Ok(false);
        };

        self.backend()
            .update_profile(&identity.id, update, Utc::now())
            .await?;
        self.merge_profile(identity.id, update);
        Ok(true)
    }
}
