use agrimarket_db::models::CropListing;
use agrimarket_services::dao::base::{PaginatedResult, PaginationParams};
use agrimarket_services::dao::listing::{ListingFilter, ListingUpdate, NewListing};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DateInput, hex, rfc3339};
use crate::{
    error::{ApiError, parse_id},
    extractors::{AuthUser, FarmerUser},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 50))]
    pub crop_type: Option<String>,
    #[validate(length(max = 100))]
    pub variety: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub quantity_tons: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub price_per_ton: f64,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    pub harvest_date: Option<DateInput>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateListingRequest {
    #[validate(length(max = 100))]
    pub variety: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub quantity_tons: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub price_per_ton: Option<f64>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub harvest_date: Option<DateInput>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub crop_type: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: String,
    pub farmer_id: String,
    pub crop_type: String,
    pub variety: Option<String>,
    pub quantity_tons: f64,
    pub price_per_ton: f64,
    pub location: String,
    pub harvest_date: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CropListing> for ListingResponse {
    fn from(l: CropListing) -> Self {
        Self {
            id: hex(l.id),
            farmer_id: l.farmer_id.to_hex(),
            crop_type: l.crop_type,
            variety: l.variety,
            quantity_tons: l.quantity_tons,
            price_per_ton: l.price_per_ton,
            location: l.location,
            harvest_date: l.harvest_date.map(rfc3339),
            description: l.description,
            created_at: rfc3339(l.created_at),
            updated_at: rfc3339(l.updated_at),
        }
    }
}

pub(crate) async fn search(
    state: &AppState,
    query: ListingQuery,
    farmer_id: Option<bson::oid::ObjectId>,
    params: &PaginationParams,
) -> Result<PaginatedResult<ListingResponse>, ApiError> {
    let filter = ListingFilter {
        crop_type: query.crop_type,
        location: query.location,
        farmer_id,
    };
    let page = state.listings.search(&filter, params).await?;
    Ok(page.map(ListingResponse::from))
}

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListingQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<ListingResponse>>, ApiError> {
    Ok(Json(search(&state, query, None, &params).await?))
}

/// The calling farmer's own listings.
pub async fn mine(
    State(state): State<AppState>,
    auth: FarmerUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<ListingResponse>>, ApiError> {
    let page = search(&state, ListingQuery::default(), Some(auth.user_id), &params).await?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    auth: FarmerUser,
    Json(body): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    body.validate()?;

    let listing = state
        .listings
        .create(
            auth.user_id,
            NewListing {
                crop_type: body.crop_type,
                variety: body.variety,
                quantity_tons: body.quantity_tons,
                price_per_ton: body.price_per_ton,
                location: body.location,
                harvest_date: body.harvest_date.map(DateInput::to_bson),
                description: body.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(listing.into())))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(listing_id): Path<String>,
) -> Result<Json<ListingResponse>, ApiError> {
    let listing_id = parse_id(&listing_id, "listing_id")?;
    let listing = state.listings.base.find_by_id(listing_id).await?;
    Ok(Json(listing.into()))
}

pub async fn update(
    State(state): State<AppState>,
    auth: FarmerUser,
    Path(listing_id): Path<String>,
    Json(body): Json<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    body.validate()?;
    let listing_id = parse_id(&listing_id, "listing_id")?;

    let listing = state
        .listings
        .update(
            auth.user_id,
            listing_id,
            ListingUpdate {
                variety: body.variety,
                quantity_tons: body.quantity_tons,
                price_per_ton: body.price_per_ton,
                location: body.location,
                harvest_date: body.harvest_date.map(DateInput::to_bson),
                description: body.description,
            },
        )
        .await?;

    Ok(Json(listing.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: FarmerUser,
    Path(listing_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let listing_id = parse_id(&listing_id, "listing_id")?;
    state.listings.delete(auth.user_id, listing_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
