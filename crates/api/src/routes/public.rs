//! Unauthenticated endpoints for the landing page.

use agrimarket_db::models::Role;
use agrimarket_services::dao::analytics::PlatformStats;
use agrimarket_services::dao::base::{PaginatedResult, PaginationParams};
use axum::{
    Json,
    extract::{Query, State},
};

use super::listing::{ListingQuery, ListingResponse, search};
use super::profile::DirectoryEntry;
use crate::{error::ApiError, state::AppState};

pub async fn listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<ListingResponse>>, ApiError> {
    Ok(Json(search(&state, query, None, &params).await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<PlatformStats>, ApiError> {
    Ok(Json(state.analytics.platform_stats().await?))
}

async fn directory(
    state: &AppState,
    role: Role,
    params: &PaginationParams,
) -> Result<PaginatedResult<DirectoryEntry>, ApiError> {
    let page = state.users.find_by_role(role, params).await?;
    Ok(page.map(DirectoryEntry::from))
}

pub async fn factories(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<DirectoryEntry>>, ApiError> {
    Ok(Json(directory(&state, Role::Factory, &params).await?))
}

pub async fn hhms(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<DirectoryEntry>>, ApiError> {
    Ok(Json(directory(&state, Role::Hhm, &params).await?))
}
