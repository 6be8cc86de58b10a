use agrimarket_db::models::{Application, ApplicationStatus};
use agrimarket_services::dao::base::{PaginatedResult, PaginationParams};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Decision, DecisionRequest, hex, rfc3339};
use crate::{
    error::{ApiError, parse_id},
    extractors::{HhmUser, LabourUser},
    state::AppState,
};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApplyRequest {
    #[validate(length(max = 1000))]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: String,
    pub schedule_id: String,
    pub worker_id: String,
    pub hhm_id: String,
    pub message: Option<String>,
    pub status: ApplicationStatus,
    pub responded_at: Option<String>,
    pub created_at: String,
}

impl From<Application> for ApplicationResponse {
    fn from(a: Application) -> Self {
        Self {
            id: hex(a.id),
            schedule_id: a.schedule_id.to_hex(),
            worker_id: a.worker_id.to_hex(),
            hhm_id: a.hhm_id.to_hex(),
            message: a.message,
            status: a.status,
            responded_at: a.responded_at.map(rfc3339),
            created_at: rfc3339(a.created_at),
        }
    }
}

pub async fn apply(
    State(state): State<AppState>,
    auth: LabourUser,
    Path(schedule_id): Path<String>,
    body: Option<Json<ApplyRequest>>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;
    let schedule_id = parse_id(&schedule_id, "schedule_id")?;

    let application = state
        .applications
        .apply(schedule_id, auth.user_id, body.message)
        .await?;

    Ok((StatusCode::CREATED, Json(application.into())))
}

pub async fn list_mine(
    State(state): State<AppState>,
    auth: LabourUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<ApplicationResponse>>, ApiError> {
    let page = state
        .applications
        .list_for_worker(auth.user_id, &params)
        .await?;
    Ok(Json(page.map(ApplicationResponse::from)))
}

pub async fn withdraw(
    State(state): State<AppState>,
    auth: LabourUser,
    Path(application_id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let application_id = parse_id(&application_id, "application_id")?;
    let application = state
        .applications
        .withdraw(application_id, auth.user_id)
        .await?;
    Ok(Json(application.into()))
}

pub async fn list_for_schedule(
    State(state): State<AppState>,
    auth: HhmUser,
    Path(schedule_id): Path<String>,
    Query(query): Query<ApplicationQuery>,
) -> Result<Json<Vec<ApplicationResponse>>, ApiError> {
    let schedule_id = parse_id(&schedule_id, "schedule_id")?;
    let applications = state
        .applications
        .list_for_schedule(auth.user_id, schedule_id, query.status)
        .await?;
    Ok(Json(
        applications
            .into_iter()
            .map(ApplicationResponse::from)
            .collect(),
    ))
}

pub async fn respond(
    State(state): State<AppState>,
    auth: HhmUser,
    Path(application_id): Path<String>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let application_id = parse_id(&application_id, "application_id")?;
    let application = state
        .applications
        .respond(application_id, auth.user_id, body.action == Decision::Accept)
        .await?;
    Ok(Json(application.into()))
}
