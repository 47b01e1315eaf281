//! Waste reports: submission by signed-in users and the public feed of recent
//! reports. Points for a report are awarded by the backend when the row is
//! inserted; the client only re-reads the profile afterwards.

pub mod types;

use crate::api::errors::BackendError;
use crate::auth::state::SessionStore;
use crate::auth::types::UserId;
use crate::notify::Notification;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, instrument};
use types::{NewWasteReport, ReportDraft, WasteReport};

pub use types::{Coordinates, ReportStatus, WasteType};

/// Points the backend awards for every accepted report.
pub const REPORT_POINTS: u32 = 10;
/// Size of the recent-reports feed.
pub const RECENT_REPORTS_LIMIT: usize = 10;

#[async_trait]
pub trait ReportBackend: Send + Sync {
    async fn insert_report(&self, report: &NewWasteReport) -> Result<WasteReport, BackendError>;

    /// Newest first.
    async fn recent_reports(&self, limit: usize) -> Result<Vec<WasteReport>, BackendError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("Please fill in the title and waste type")]
    MissingInformation,
    #[error("Coordinates are out of range")]
    InvalidCoordinates,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ReportDraft {
    /// # Errors
    /// Returns an error if the title is blank, the waste type is missing, or
    /// the coordinates are out of range.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.title.trim().is_empty() || self.waste_type.is_none() {
            return Err(ReportError::MissingInformation);
        }
        if self.coordinates.is_some_and(|coordinates| !coordinates.is_valid()) {
            return Err(ReportError::InvalidCoordinates);
        }
        Ok(())
    }

    fn into_new_report(self, user_id: UserId) -> Result<NewWasteReport, ReportError> {
        let waste_type = self.waste_type.ok_or(ReportError::MissingInformation)?;
        Ok(NewWasteReport {
            user_id,
            title: self.title.trim().to_string(),
            description: self.description,
            waste_type,
            location_name: self.location_name,
            latitude: self.coordinates.map(|c| c.latitude),
            longitude: self.coordinates.map(|c| c.longitude),
            image_url: self.image_url,
        })
    }
}

/// Submits a report for the signed-in user. Returns `Ok(None)` when there is
/// no identity or profile to attach it to.
///
/// # Errors
/// Returns a validation error (nothing is sent) or the backend rejection.
#[instrument(skip_all)]
pub async fn submit_report(
    store: &SessionStore,
    reports: &dyn ReportBackend,
    draft: ReportDraft,
) -> Result<Option<WasteReport>, ReportError> {
    let state = store.snapshot();
    let (Some(identity), Some(_)) = (state.identity, state.profile) else {
        debug!("no signed-in profile, ignoring report submission");
        return Ok(None);
    };

    if let Err(err) = draft.validate() {
        let (title, description) = match &err {
            ReportError::InvalidCoordinates => {
                ("Invalid location", "Coordinates are out of range")
            }
            _ => ("Missing information", "Please fill in the title and waste type"),
        };
        store.notify(Notification::error(title, description));
        return Err(err);
    }

    let report = draft.into_new_report(identity.id)?;
    match reports.insert_report(&report).await {
        Ok(created) => {
            store.notify(Notification::success(
                "Report submitted!",
                format!(
                    "Thank you for helping keep our campus clean. You've earned {REPORT_POINTS} points!"
                ),
            ));
            store.refresh_profile().await;
            Ok(Some(created))
        }
        Err(err) => {
            error!("Error submitting report: {}", err);
            store.notify(Notification::error(
                "Error",
                "Failed to submit report. Please try again.",
            ));
            Err(err.into())
        }
    }
}

/// # Errors
/// Returns the backend error; nothing is notified, the feed just stays empty.
#[instrument(skip(reports))]
pub async fn recent_reports(
    reports: &dyn ReportBackend,
    limit: usize,
) -> Result<Vec<WasteReport>, BackendError> {
    reports.recent_reports(limit).await
}
