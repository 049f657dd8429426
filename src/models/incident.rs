use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl FromStr for Severity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Severity::Low),
            "Medium" => Ok(Severity::Medium),
            "High" => Ok(Severity::High),
            other => Err(AppError::bad_request(format!("unknown severity: {other}"))),
        }
    }
}

/// Category derived from the description when the incident is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum IncidentType {
    #[serde(rename = "Engine Failure")]
    EngineFailure,
    Turbulence,
    #[serde(rename = "Human Error")]
    HumanError,
    #[serde(rename = "Weather Issue")]
    WeatherIssue,
    Other,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::EngineFailure => "Engine Failure",
            IncidentType::Turbulence => "Turbulence",
            IncidentType::HumanError => "Human Error",
            IncidentType::WeatherIssue => "Weather Issue",
            IncidentType::Other => "Other",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Engine Failure" => Ok(IncidentType::EngineFailure),
            "Turbulence" => Ok(IncidentType::Turbulence),
            "Human Error" => Ok(IncidentType::HumanError),
            "Weather Issue" => Ok(IncidentType::WeatherIssue),
            "Other" => Ok(IncidentType::Other),
            other => Err(AppError::internal(format!("unknown incident type: {other}"))),
        }
    }
}

/// Resolution progress of the action attached to an incident.
///
/// Any role allowed to set the status may move it to any value; there is no
/// forward-only ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum ActionStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "Pending",
            ActionStatus::InProgress => "In Progress",
            ActionStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ActionStatus::Pending),
            "In Progress" => Ok(ActionStatus::InProgress),
            "Completed" => Ok(ActionStatus::Completed),
            other => Err(AppError::bad_request(format!("unknown action status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    #[schema(example = 28.5562)]
    pub latitude: f64,
    #[schema(example = 77.1000)]
    pub longitude: f64,
    #[schema(example = "DEL")]
    pub airport_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRef {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub text: String,
    pub author: UserRef,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Incident {
    pub id: Uuid,
    pub flight_number: String,
    pub date_time: DateTime<Utc>,
    pub location: Location,
    pub description: String,
    pub severity: Severity,
    pub incident_type: IncidentType,
    pub created_by: UserRef,
    /// Oldest first.
    pub comments: Vec<Comment>,
    pub suggested_action: String,
    pub assigned_action: String,
    pub action_status: ActionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbIncident {
    pub id: String,
    pub flight_number: String,
    pub date_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub airport_code: String,
    pub description: String,
    pub severity: String,
    pub incident_type: String,
    pub created_by: String,
    pub creator_email: String,
    pub suggested_action: String,
    pub assigned_action: String,
    pub action_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbComment {
    pub seq: i64,
    pub incident_id: String,
    pub text: String,
    pub author_id: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
}

fn parse_id(value: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value).map_err(|err| AppError::internal(format!("invalid {what} id: {err}")))
}

impl TryFrom<DbComment> for Comment {
    type Error = AppError;

    fn try_from(value: DbComment) -> Result<Self, Self::Error> {
        Ok(Comment {
            author: UserRef {
                id: parse_id(&value.author_id, "author")?,
                email: value.author_email,
            },
            text: value.text,
            created_at: value.created_at,
        })
    }
}

impl DbIncident {
    pub fn into_incident(self, comments: Vec<Comment>) -> Result<Incident, AppError> {
        Ok(Incident {
            id: parse_id(&self.id, "incident")?,
            created_by: UserRef {
                id: parse_id(&self.created_by, "creator")?,
                email: self.creator_email,
            },
            severity: self
                .severity
                .parse()
                .map_err(|_| AppError::internal(format!("stored severity is invalid: {}", self.severity)))?,
            incident_type: self.incident_type.parse()?,
            action_status: self
                .action_status
                .parse()
                .map_err(|_| AppError::internal(format!("stored action status is invalid: {}", self.action_status)))?,
            flight_number: self.flight_number,
            date_time: self.date_time,
            location: Location {
                latitude: self.latitude,
                longitude: self.longitude,
                airport_code: self.airport_code,
            },
            description: self.description,
            comments,
            suggested_action: self.suggested_action,
            assigned_action: self.assigned_action,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IncidentCreateRequest {
    #[schema(example = "AI202")]
    pub flight_number: String,
    pub date_time: DateTime<Utc>,
    pub location: Location,
    #[schema(example = "Severe turbulence over the Bay of Bengal")]
    pub description: String,
    #[schema(example = "Medium")]
    pub severity: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentRequest {
    #[schema(example = "Seatbelt sign was on; two passengers injured")]
    pub text: String,
}

/// Body for both suggest-action and assign-action.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ActionRequest {
    #[schema(example = "Inspect left engine before next departure")]
    pub action: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActionStatusRequest {
    #[schema(example = "In Progress")]
    pub status: String,
}

/// One flattened line of the incident report export.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IncidentReportRow {
    pub flight_number: String,
    pub date: String,
    pub location: String,
    pub incident_type: String,
    pub severity: String,
    pub description: String,
    pub created_by: String,
    pub suggested_action: String,
    pub assigned_action: String,
    pub action_status: String,
}

impl From<&Incident> for IncidentReportRow {
    fn from(incident: &Incident) -> Self {
        IncidentReportRow {
            flight_number: incident.flight_number.clone(),
            date: incident.date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            location: format!(
                "{} ({}, {})",
                incident.location.airport_code, incident.location.latitude, incident.location.longitude
            ),
            incident_type: incident.incident_type.to_string(),
            severity: incident.severity.as_str().to_string(),
            description: incident.description.clone(),
            created_by: incident.created_by.email.clone(),
            suggested_action: incident.suggested_action.clone(),
            assigned_action: incident.assigned_action.clone(),
            action_status: incident.action_status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_status_wire_names() {
        assert_eq!(serde_json::to_string(&ActionStatus::InProgress).unwrap(), "\"In Progress\"");
        assert_eq!("In Progress".parse::<ActionStatus>().unwrap(), ActionStatus::InProgress);
        assert_eq!(ActionStatus::default(), ActionStatus::Pending);
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = "Done".parse::<ActionStatus>().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!("pending".parse::<ActionStatus>().is_err());
    }

    #[test]
    fn severity_rejects_unknown_values() {
        assert_eq!("High".parse::<Severity>().unwrap(), Severity::High);
        assert!(matches!("Critical".parse::<Severity>(), Err(AppError::BadRequest(_))));
    }

    fn stored_incident(severity: &str) -> DbIncident {
        DbIncident {
            id: Uuid::new_v4().to_string(),
            flight_number: "AI202".to_string(),
            date_time: Utc::now(),
            latitude: 28.5562,
            longitude: 77.1,
            airport_code: "DEL".to_string(),
            description: "hail storm".to_string(),
            severity: severity.to_string(),
            incident_type: "Weather Issue".to_string(),
            created_by: Uuid::new_v4().to_string(),
            creator_email: "crew@example.com".to_string(),
            suggested_action: String::new(),
            assigned_action: String::new(),
            action_status: "Pending".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn stored_row_converts_to_incident() {
        let incident = stored_incident("High").into_incident(Vec::new()).unwrap();
        assert_eq!(incident.severity, Severity::High);
        assert_eq!(incident.incident_type, IncidentType::WeatherIssue);
        assert_eq!(incident.action_status, ActionStatus::Pending);
    }

    #[test]
    fn unknown_stored_severity_is_an_internal_error() {
        let err = stored_incident("Critical").into_incident(Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn incident_type_round_trips_through_its_label() {
        for ty in [
            IncidentType::EngineFailure,
            IncidentType::Turbulence,
            IncidentType::HumanError,
            IncidentType::WeatherIssue,
            IncidentType::Other,
        ] {
            assert_eq!(ty.as_str().parse::<IncidentType>().unwrap(), ty);
            assert_eq!(serde_json::to_value(ty).unwrap(), serde_json::json!(ty.as_str()));
        }
    }
}
