//! The incident lifecycle: reporting, reading, and the role-gated
//! transitions on comments, suggested/assigned actions and action status.

mod classifier;
pub mod store;

pub use classifier::classify_incident;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{authorize, Operation, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::incident::{ActionStatus, Incident, IncidentCreateRequest, IncidentReportRow};
use crate::utils::utc_now;
use store::{ActionField, NewIncident};

/// A change to the mutable part of an incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Append a comment; never edits or removes earlier ones.
    Comment(String),
    /// Replace the suggested action. Last writer wins.
    Suggest(String),
    /// Replace the assigned action. Last writer wins.
    Assign(String),
    /// Move the action status to any value, including backwards.
    SetStatus(ActionStatus),
}

impl Transition {
    pub fn operation(&self) -> Operation {
        match self {
            Transition::Comment(_) => Operation::AddComment,
            Transition::Suggest(_) => Operation::SuggestAction,
            Transition::Assign(_) => Operation::AssignAction,
            Transition::SetStatus(_) => Operation::SetActionStatus,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Transition::Comment(_) => "comment",
            Transition::Suggest(_) => "suggest_action",
            Transition::Assign(_) => "assign_action",
            Transition::SetStatus(_) => "set_action_status",
        }
    }
}

/// Files a new incident on behalf of `principal`.
pub async fn report(pool: &SqlitePool, principal: &Principal, request: IncidentCreateRequest) -> AppResult<Incident> {
    authorize(principal, Operation::CreateIncident)?;

    let new_incident = validate_report(request)?;
    let id = store::insert_incident(pool, principal.user_id, &new_incident, utc_now()).await?;

    tracing::info!(
        incident_id = %id,
        user_id = %principal.user_id,
        incident_type = %new_incident.incident_type,
        "incident reported"
    );

    store::fetch_incident(pool, id)
        .await?
        .ok_or_else(|| AppError::internal("incident vanished after insert"))
}

/// Incidents visible to `principal`, newest first.
pub async fn list(pool: &SqlitePool, principal: &Principal) -> AppResult<Vec<Incident>> {
    authorize(principal, Operation::ListIncidents)?;
    store::list_incidents(pool, principal.incident_scope()).await
}

/// A single incident, subject to the same visibility as [`list`].
pub async fn get(pool: &SqlitePool, principal: &Principal, incident_id: Uuid) -> AppResult<Incident> {
    authorize(principal, Operation::ListIncidents)?;

    store::fetch_incident(pool, incident_id)
        .await?
        .filter(|incident| principal.incident_scope().includes(incident.created_by.id))
        .ok_or_else(|| AppError::not_found("incident not found"))
}

/// Applies `transition` to the incident and returns its new state.
pub async fn apply(
    pool: &SqlitePool,
    principal: &Principal,
    incident_id: Uuid,
    transition: Transition,
) -> AppResult<Incident> {
    authorize(principal, transition.operation())?;

    let applied = match &transition {
        Transition::Comment(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(AppError::bad_request("comment text must not be empty"));
            }
            store::append_comment(pool, incident_id, principal.user_id, text, utc_now()).await?
        }
        Transition::Suggest(action) => {
            store::set_action_text(pool, incident_id, ActionField::Suggested, action).await?
        }
        Transition::Assign(action) => {
            store::set_action_text(pool, incident_id, ActionField::Assigned, action).await?
        }
        Transition::SetStatus(status) => store::set_action_status(pool, incident_id, *status).await?,
    };

    if !applied {
        return Err(AppError::not_found("incident not found"));
    }

    tracing::info!(
        incident_id = %incident_id,
        user_id = %principal.user_id,
        role = %principal.role,
        transition = transition.label(),
        "incident updated"
    );

    store::fetch_incident(pool, incident_id)
        .await?
        .ok_or_else(|| AppError::not_found("incident not found"))
}

/// Flattened rows for the incident report, across all incidents.
pub async fn export(pool: &SqlitePool, principal: &Principal) -> AppResult<Vec<IncidentReportRow>> {
    authorize(principal, Operation::ExportReport)?;

    let incidents = store::list_incidents(pool, crate::authz::IncidentScope::All).await?;
    Ok(incidents.iter().map(IncidentReportRow::from).collect())
}

fn validate_report(request: IncidentCreateRequest) -> AppResult<NewIncident> {
    let flight_number = request.flight_number.trim().to_string();
    if flight_number.is_empty() {
        return Err(AppError::bad_request("flight_number is required"));
    }

    if request.description.trim().is_empty() {
        return Err(AppError::bad_request("description is required"));
    }

    let location = request.location;
    if !(-90.0..=90.0).contains(&location.latitude) {
        return Err(AppError::bad_request("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&location.longitude) {
        return Err(AppError::bad_request("longitude must be between -180 and 180"));
    }

    let severity = request.severity.parse()?;
    let incident_type = classify_incident(&request.description);

    Ok(NewIncident {
        flight_number,
        date_time: request.date_time,
        location,
        description: request.description,
        severity,
        incident_type,
    })
}
