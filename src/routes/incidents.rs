use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{authorize, Operation, Principal};
use crate::errors::AppResult;
use crate::extract::{ApiJson, ApiPath};
use crate::lifecycle::{self, Transition};
use crate::models::incident::{
    ActionRequest, ActionStatus, ActionStatusRequest, CommentRequest, Incident, IncidentCreateRequest,
    IncidentReportRow,
};

#[utoipa::path(
    post,
    path = "/api/incidents",
    tag = "Incidents",
    request_body = IncidentCreateRequest,
    responses(
        (status = 201, description = "Incident reported", body = Incident),
        (status = 400, description = "Invalid report"),
        (status = 403, description = "Only crew and pilots may report")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn create_incident(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(payload): ApiJson<IncidentCreateRequest>,
) -> AppResult<(StatusCode, Json<Incident>)> {
    let incident = lifecycle::report(&state.pool, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

#[utoipa::path(
    get,
    path = "/api/incidents",
    tag = "Incidents",
    responses((status = 200, description = "Incidents visible to the caller; crew only see their own", body = [Incident])),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn list_incidents(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Incident>>> {
    let incidents = lifecycle::list(&state.pool, &principal).await?;
    Ok(Json(incidents))
}

#[utoipa::path(
    get,
    path = "/api/incidents/{id}",
    tag = "Incidents",
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 200, description = "Incident detail", body = Incident),
        (status = 404, description = "Incident not found or not visible")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn get_incident(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Incident>> {
    let incident = lifecycle::get(&state.pool, &principal, id).await?;
    Ok(Json(incident))
}

#[utoipa::path(
    post,
    path = "/api/incidents/{id}/comments",
    tag = "Incidents",
    params(("id" = Uuid, Path, description = "Incident id")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Incident with the new comment", body = Incident),
        (status = 403, description = "Only crew and pilots may comment"),
        (status = 404, description = "Incident not found")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn add_comment(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CommentRequest>,
) -> AppResult<Json<Incident>> {
    let incident = lifecycle::apply(&state.pool, &principal, id, Transition::Comment(payload.text)).await?;
    Ok(Json(incident))
}

#[utoipa::path(
    put,
    path = "/api/incidents/{id}/suggest-action",
    tag = "Incidents",
    params(("id" = Uuid, Path, description = "Incident id")),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Incident with the new suggested action", body = Incident),
        (status = 403, description = "Only pilots, admins and auditors may suggest"),
        (status = 404, description = "Incident not found")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn suggest_action(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ActionRequest>,
) -> AppResult<Json<Incident>> {
    let incident = lifecycle::apply(&state.pool, &principal, id, Transition::Suggest(payload.action)).await?;
    Ok(Json(incident))
}

#[utoipa::path(
    put,
    path = "/api/incidents/{id}/assign-action",
    tag = "Incidents",
    params(("id" = Uuid, Path, description = "Incident id")),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Incident with the new assigned action", body = Incident),
        (status = 403, description = "Only admins and auditors may assign"),
        (status = 404, description = "Incident not found")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn assign_action(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ActionRequest>,
) -> AppResult<Json<Incident>> {
    let incident = lifecycle::apply(&state.pool, &principal, id, Transition::Assign(payload.action)).await?;
    Ok(Json(incident))
}

#[utoipa::path(
    put,
    path = "/api/incidents/{id}/action-status",
    tag = "Incidents",
    params(("id" = Uuid, Path, description = "Incident id")),
    request_body = ActionStatusRequest,
    responses(
        (status = 200, description = "Incident with the new action status", body = Incident),
        (status = 400, description = "Unknown status value"),
        (status = 403, description = "Only ground staff, admins and auditors may set the status"),
        (status = 404, description = "Incident not found")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn set_action_status(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ActionStatusRequest>,
) -> AppResult<Json<Incident>> {
    // role first, so a forbidden caller gets 403 rather than a payload error
    authorize(&principal, Operation::SetActionStatus)?;
    let status: ActionStatus = payload.status.parse()?;

    let incident = lifecycle::apply(&state.pool, &principal, id, Transition::SetStatus(status)).await?;
    Ok(Json(incident))
}

#[utoipa::path(
    get,
    path = "/api/incidents/export",
    tag = "Incidents",
    responses(
        (status = 200, description = "Report rows for every incident", body = [IncidentReportRow]),
        (status = 403, description = "Only admins and auditors may export")
    ),
    security(("bearerAuth" = []), ("cookieAuth" = []))
)]
pub async fn export_incidents(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<IncidentReportRow>>> {
    let rows = lifecycle::export(&state.pool, &principal).await?;
    tracing::info!(user_id = %principal.user_id, rows = rows.len(), "incident report exported");
    Ok(Json(rows))
}
