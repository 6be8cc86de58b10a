use agrimarket_db::models::{Order, OrderStatus};
use agrimarket_services::dao::base::{PaginatedResult, PaginationParams};
use agrimarket_services::dao::order::OrderParty;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{hex, rfc3339};
use crate::{
    error::{ApiError, parse_id},
    extractors::{AuthUser, FactoryUser, FarmerUser},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub listing_id: String,
    #[validate(range(exclusive_min = 0.0))]
    pub quantity_tons: f64,
    #[validate(length(max = 1000))]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub listing_id: String,
    pub farmer_id: String,
    pub factory_id: String,
    pub crop_type: String,
    pub quantity_tons: f64,
    pub price_per_ton: f64,
    pub total_price: f64,
    pub message: Option<String>,
    pub status: OrderStatus,
    pub responded_at: Option<String>,
    pub created_at: String,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: hex(o.id),
            listing_id: o.listing_id.to_hex(),
            farmer_id: o.farmer_id.to_hex(),
            factory_id: o.factory_id.to_hex(),
            crop_type: o.crop_type,
            quantity_tons: o.quantity_tons,
            price_per_ton: o.price_per_ton,
            total_price: o.total_price,
            message: o.message,
            status: o.status,
            responded_at: o.responded_at.map(rfc3339),
            created_at: rfc3339(o.created_at),
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    auth: FactoryUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    body.validate()?;
    let listing_id = parse_id(&body.listing_id, "listing_id")?;

    let order = state
        .orders
        .create(auth.user_id, listing_id, body.quantity_tons, body.message)
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&order_id, "order_id")?;
    let order = state.orders.find_for_party(order_id, auth.user_id).await?;
    Ok(Json(order.into()))
}

async fn list_for(
    state: &AppState,
    party: OrderParty,
    user_id: bson::oid::ObjectId,
    query: OrderQuery,
    params: &PaginationParams,
) -> Result<PaginatedResult<OrderResponse>, ApiError> {
    let page = state
        .orders
        .list_for_party(party, user_id, query.status, params)
        .await?;
    Ok(page.map(OrderResponse::from))
}

/// Orders received on the farmer's listings.
pub async fn list_for_farmer(
    State(state): State<AppState>,
    auth: FarmerUser,
    Query(query): Query<OrderQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<OrderResponse>>, ApiError> {
    let page = list_for(&state, OrderParty::Farmer, auth.user_id, query, &params).await?;
    Ok(Json(page))
}

/// Orders placed by the factory.
pub async fn list_for_factory(
    State(state): State<AppState>,
    auth: FactoryUser,
    Query(query): Query<OrderQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<OrderResponse>>, ApiError> {
    let page = list_for(&state, OrderParty::Factory, auth.user_id, query, &params).await?;
    Ok(Json(page))
}

pub async fn accept(
    State(state): State<AppState>,
    auth: FarmerUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&order_id, "order_id")?;
    let order = state.orders.accept(order_id, auth.user_id).await?;
    Ok(Json(order.into()))
}

pub async fn reject(
    State(state): State<AppState>,
    auth: FarmerUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&order_id, "order_id")?;
    let order = state.orders.reject(order_id, auth.user_id).await?;
    Ok(Json(order.into()))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth: FactoryUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&order_id, "order_id")?;
    let order = state.orders.cancel(order_id, auth.user_id).await?;
    Ok(Json(order.into()))
}
