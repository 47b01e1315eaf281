use crate::api::errors::BackendError;
use crate::auth::backend::AuthBackend;
use crate::auth::types::{Profile, UserId};
use tracing::{debug, error, instrument};

/// Result of a single profile lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileOutcome {
    Found(Profile),
    /// No row yet; new accounts are provisioned asynchronously by the backend.
    NotFound,
    Failed(BackendError),
}

/// Retrieves the profile for `id`, separating "no row" from a failed call.
#[instrument(skip(backend))]
pub async fn fetch_profile(backend: &dyn AuthBackend, id: &UserId) -> ProfileOutcome {
    match backend.fetch_profile(id).await {
        Ok(profile) => {
            debug!("profile fetched for user {}", id);
            ProfileOutcome::Found(profile)
        }
        Err(BackendError::NotFound) => {
            debug!("profile not found for user {}", id);
            ProfileOutcome::NotFound
        }
        Err(err) => {
            error!("Error fetching profile for user {}: {}", id, err);
            ProfileOutcome::Failed(err)
        }
    }
}
