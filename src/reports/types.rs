use crate::auth::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteType {
    Plastic,
    Paper,
    Glass,
    Metal,
    Organic,
    Electronic,
    #[serde(other)]
    Other,
}

impl WasteType {
    pub const ALL: [Self; 7] = [
        Self::Plastic,
        Self::Paper,
        Self::Glass,
        Self::Metal,
        Self::Organic,
        Self::Electronic,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plastic => "plastic",
            Self::Paper => "paper",
            Self::Glass => "glass",
            Self::Metal => "metal",
            Self::Organic => "organic",
            Self::Electronic => "electronic",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WasteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown waste type: {s}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Resolved,
    #[serde(other)]
    Other,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Resolved => "resolved",
            Self::Other => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Report as entered by the user, before it is tied to an account.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportDraft {
    pub title: String,
    pub description: String,
    pub waste_type: Option<WasteType>,
    pub location_name: String,
    pub coordinates: Option<Coordinates>,
    pub image_url: String,
}

/// Row inserted into `waste_reports`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewWasteReport {
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub waste_type: WasteType,
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct WasteReport {
    pub id: Uuid,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub waste_type: WasteType,
    pub location_name: Option<String>,
    pub status: ReportStatus,
    pub points_awarded: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_waste_type_and_status_decode_as_other() {
        let row = json!({
            "id": "0b6f3c2e-8f5e-4d8e-9c61-5a3e2b1f7d10",
            "user_id": "6f1c1a52-6a43-4f2e-9d7a-3b1f0c2d9e11",
            "title": "Cans by the library",
            "description": null,
            "waste_type": "styrofoam",
            "location_name": "Library entrance",
            "status": "archived",
            "points_awarded": 10,
            "created_at": "2024-10-01T12:00:00Z"
        });
        let report: WasteReport = match serde_json::from_value(row) {
            Ok(report) => report,
            Err(err) => panic!("row should decode: {err}"),
        };
        assert_eq!(report.waste_type, WasteType::Other);
        assert_eq!(report.status, ReportStatus::Other);
        assert_eq!(report.points_awarded, Some(10));
    }

    #[test]
    fn status_label_replaces_underscore() {
        assert_eq!(ReportStatus::InProgress.to_string(), "in progress");
        let status: Result<ReportStatus, _> = serde_json::from_value(json!("in_progress"));
        assert_eq!(status.ok(), Some(ReportStatus::InProgress));
    }

    #[test]
    fn waste_type_parses_case_insensitively() {
        assert_eq!("Glass".parse::<WasteType>(), Ok(WasteType::Glass));
        assert!("lava".parse::<WasteType>().is_err());
    }

    #[test]
    fn coordinates_must_be_on_earth() {
        assert!(Coordinates {
            latitude: 51.5,
            longitude: -0.12
        }
        .is_valid());
        assert!(!Coordinates {
            latitude: 91.0,
            longitude: 0.0
        }
        .is_valid());
    }
}
