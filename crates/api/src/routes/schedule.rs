use agrimarket_db::models::{Schedule, ScheduleStatus};
use agrimarket_services::dao::base::{PaginatedResult, PaginationParams};
use agrimarket_services::dao::schedule::{NewSchedule, ScheduleUpdate};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DateInput, hex, hex_all, rfc3339};
use crate::{
    error::{ApiError, parse_id},
    extractors::{HhmUser, LabourUser},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    pub start_date: DateInput,
    pub end_date: DateInput,
    #[validate(range(min = 1, max = 1000))]
    pub required_workers: u32,
    #[validate(range(min = 0.0))]
    pub wage_per_day: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateScheduleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub start_date: Option<DateInput>,
    pub end_date: Option<DateInput>,
    #[validate(range(min = 1, max = 1000))]
    pub required_workers: Option<u32>,
    #[validate(range(min = 0.0))]
    pub wage_per_day: Option<f64>,
    pub status: Option<ScheduleStatus>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub id: String,
    pub hhm_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub required_workers: u32,
    pub wage_per_day: f64,
    pub assigned_workers: Vec<String>,
    pub status: ScheduleStatus,
    pub created_at: String,
}

impl From<Schedule> for ScheduleResponse {
    fn from(s: Schedule) -> Self {
        Self {
            id: hex(s.id),
            hhm_id: s.hhm_id.to_hex(),
            title: s.title,
            description: s.description,
            location: s.location,
            start_date: rfc3339(s.start_date),
            end_date: rfc3339(s.end_date),
            required_workers: s.required_workers,
            wage_per_day: s.wage_per_day,
            assigned_workers: hex_all(&s.assigned_workers),
            status: s.status,
            created_at: rfc3339(s.created_at),
        }
    }
}

pub async fn list_mine(
    State(state): State<AppState>,
    auth: HhmUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<ScheduleResponse>>, ApiError> {
    let page = state.schedules.list_for_hhm(auth.user_id, &params).await?;
    Ok(Json(page.map(ScheduleResponse::from)))
}

/// Open schedules a worker can apply to.
pub async fn list_open(
    State(state): State<AppState>,
    _auth: LabourUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<ScheduleResponse>>, ApiError> {
    let page = state.schedules.list_open(&params).await?;
    Ok(Json(page.map(ScheduleResponse::from)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: HhmUser,
    Json(body): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>), ApiError> {
    body.validate()?;

    let schedule = state
        .schedules
        .create(
            auth.user_id,
            NewSchedule {
                title: body.title,
                description: body.description,
                location: body.location,
                start_date: body.start_date.to_bson(),
                end_date: body.end_date.to_bson(),
                required_workers: body.required_workers,
                wage_per_day: body.wage_per_day,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(schedule.into())))
}

pub async fn update(
    State(state): State<AppState>,
    auth: HhmUser,
    Path(schedule_id): Path<String>,
    Json(body): Json<UpdateScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    body.validate()?;
    let schedule_id = parse_id(&schedule_id, "schedule_id")?;

    let schedule = state
        .schedules
        .update(
            auth.user_id,
            schedule_id,
            ScheduleUpdate {
                title: body.title,
                description: body.description,
                location: body.location,
                start_date: body.start_date.map(DateInput::to_bson),
                end_date: body.end_date.map(DateInput::to_bson),
                required_workers: body.required_workers,
                wage_per_day: body.wage_per_day,
                status: body.status,
            },
        )
        .await?;

    Ok(Json(schedule.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: HhmUser,
    Path(schedule_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let schedule_id = parse_id(&schedule_id, "schedule_id")?;
    state.schedules.delete(auth.user_id, schedule_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
