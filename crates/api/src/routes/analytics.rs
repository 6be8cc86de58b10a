use agrimarket_services::dao::analytics::{Dashboard, MarketSummary};
use axum::{Json, extract::State};

use crate::{error::ApiError, extractors::AuthUser, state::AppState};

pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Dashboard>, ApiError> {
    let dashboard = state.analytics.dashboard(auth.user_id, auth.role).await?;
    Ok(Json(dashboard))
}

pub async fn market(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<MarketSummary>>, ApiError> {
    Ok(Json(state.analytics.market_summary().await?))
}
