//! SQL for incidents and their comments.
//!
//! Every write is a single statement, so a field update either lands whole or
//! not at all, and racing comment appends each get their own row.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::IncidentScope;
use crate::errors::AppResult;
use crate::models::incident::{
    ActionStatus, Comment, DbComment, DbIncident, Incident, IncidentType, Location, Severity,
};

const INCIDENT_SELECT: &str = "SELECT i.id, i.flight_number, i.date_time, i.latitude, i.longitude, i.airport_code, \
     i.description, i.severity, i.incident_type, i.created_by, u.email AS creator_email, \
     i.suggested_action, i.assigned_action, i.action_status, i.created_at \
     FROM incidents i JOIN users u ON u.id = i.created_by";

const COMMENT_SELECT: &str = "SELECT c.seq, c.incident_id, c.text, c.author_id, u.email AS author_email, c.created_at \
     FROM incident_comments c JOIN users u ON u.id = c.author_id";

/// Validated fields of a new report.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub flight_number: String,
    pub date_time: DateTime<Utc>,
    pub location: Location,
    pub description: String,
    pub severity: Severity,
    pub incident_type: IncidentType,
}

/// The two free-text action fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionField {
    Suggested,
    Assigned,
}

impl ActionField {
    fn update_sql(&self) -> &'static str {
        match self {
            ActionField::Suggested => "UPDATE incidents SET suggested_action = ? WHERE id = ?",
            ActionField::Assigned => "UPDATE incidents SET assigned_action = ? WHERE id = ?",
        }
    }
}

pub async fn insert_incident(
    pool: &SqlitePool,
    created_by: Uuid,
    incident: &NewIncident,
    now: DateTime<Utc>,
) -> AppResult<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO incidents (id, flight_number, date_time, latitude, longitude, airport_code, description, severity, incident_type, created_by, suggested_action, assigned_action, action_status, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '', '', ?, ?)",
    )
    .bind(id.to_string())
    .bind(&incident.flight_number)
    .bind(incident.date_time)
    .bind(incident.location.latitude)
    .bind(incident.location.longitude)
    .bind(&incident.location.airport_code)
    .bind(&incident.description)
    .bind(incident.severity.as_str())
    .bind(incident.incident_type.as_str())
    .bind(created_by.to_string())
    .bind(ActionStatus::default().as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn fetch_incident(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Incident>> {
    let row = sqlx::query_as::<_, DbIncident>(&format!("{INCIDENT_SELECT} WHERE i.id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let comments = sqlx::query_as::<_, DbComment>(&format!("{COMMENT_SELECT} WHERE c.incident_id = ? ORDER BY c.seq"))
        .bind(id.to_string())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Comment::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    row.into_incident(comments).map(Some)
}

pub async fn list_incidents(pool: &SqlitePool, scope: IncidentScope) -> AppResult<Vec<Incident>> {
    let (rows, comment_rows) = match scope {
        IncidentScope::Own(user_id) => {
            let rows = sqlx::query_as::<_, DbIncident>(&format!(
                "{INCIDENT_SELECT} WHERE i.created_by = ? ORDER BY i.created_at DESC, i.rowid DESC"
            ))
            .bind(user_id.to_string())
            .fetch_all(pool)
            .await?;

            let comments = sqlx::query_as::<_, DbComment>(&format!(
                "{COMMENT_SELECT} JOIN incidents i ON i.id = c.incident_id WHERE i.created_by = ? ORDER BY c.seq"
            ))
            .bind(user_id.to_string())
            .fetch_all(pool)
            .await?;

            (rows, comments)
        }
        IncidentScope::All => {
            let rows = sqlx::query_as::<_, DbIncident>(&format!(
                "{INCIDENT_SELECT} ORDER BY i.created_at DESC, i.rowid DESC"
            ))
            .fetch_all(pool)
            .await?;

            let comments = sqlx::query_as::<_, DbComment>(&format!("{COMMENT_SELECT} ORDER BY c.seq"))
                .fetch_all(pool)
                .await?;

            (rows, comments)
        }
    };

    let mut by_incident: HashMap<String, Vec<Comment>> = HashMap::new();
    for row in comment_rows {
        let incident_id = row.incident_id.clone();
        by_incident.entry(incident_id).or_default().push(Comment::try_from(row)?);
    }

    rows.into_iter()
        .map(|row| {
            let comments = by_incident.remove(&row.id).unwrap_or_default();
            row.into_incident(comments)
        })
        .collect()
}

/// Appends a comment if the incident exists. Returns false when it does not.
pub async fn append_comment(
    pool: &SqlitePool,
    incident_id: Uuid,
    author_id: Uuid,
    text: &str,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        "INSERT INTO incident_comments (incident_id, text, author_id, created_at) \
         SELECT ?, ?, ?, ? WHERE EXISTS (SELECT 1 FROM incidents WHERE id = ?)",
    )
    .bind(incident_id.to_string())
    .bind(text)
    .bind(author_id.to_string())
    .bind(now)
    .bind(incident_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrites one action field. Returns false when the incident does not exist.
pub async fn set_action_text(pool: &SqlitePool, incident_id: Uuid, field: ActionField, value: &str) -> AppResult<bool> {
    let result = sqlx::query(field.update_sql())
        .bind(value)
        .bind(incident_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_action_status(pool: &SqlitePool, incident_id: Uuid, status: ActionStatus) -> AppResult<bool> {
    let result = sqlx::query("UPDATE incidents SET action_status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(incident_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
