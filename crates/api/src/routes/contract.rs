use agrimarket_db::models::{Contract, ContractStatus};
use agrimarket_services::dao::base::{PaginatedResult, PaginationParams};
use agrimarket_services::dao::contract::NewContract;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DateInput, rfc3339};
use crate::{
    error::{ApiError, parse_id},
    extractors::{AuthUser, FactoryUser, FarmerUser},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContractRequest {
    pub farmer_id: String,
    pub hhm_id: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub crop_type: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub quantity_tons: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub price_per_ton: f64,
    pub start_date: DateInput,
    pub end_date: DateInput,
    #[validate(length(max = 5000))]
    pub terms: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContractQuery {
    pub status: Option<ContractStatus>,
}

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub id: String,
    pub factory_id: String,
    pub farmer_id: String,
    pub hhm_id: Option<String>,
    pub crop_type: String,
    pub quantity_tons: f64,
    pub price_per_ton: f64,
    pub total_value: f64,
    pub start_date: String,
    pub end_date: String,
    pub terms: Option<String>,
    pub status: ContractStatus,
    pub responded_at: Option<String>,
    pub created_at: String,
}

impl From<Contract> for ContractResponse {
    fn from(c: Contract) -> Self {
        Self {
            id: super::hex(c.id),
            factory_id: c.factory_id.to_hex(),
            farmer_id: c.farmer_id.to_hex(),
            hhm_id: c.hhm_id.map(|id| id.to_hex()),
            crop_type: c.crop_type,
            quantity_tons: c.quantity_tons,
            price_per_ton: c.price_per_ton,
            total_value: c.quantity_tons * c.price_per_ton,
            start_date: rfc3339(c.start_date),
            end_date: rfc3339(c.end_date),
            terms: c.terms,
            status: c.status,
            responded_at: c.responded_at.map(rfc3339),
            created_at: rfc3339(c.created_at),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ContractQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<ContractResponse>>, ApiError> {
    let page = state
        .contracts
        .list_for_user(auth.user_id, auth.role, query.status, &params)
        .await?;
    Ok(Json(page.map(ContractResponse::from)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: FactoryUser,
    Json(body): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<ContractResponse>), ApiError> {
    body.validate()?;
    let farmer_id = parse_id(&body.farmer_id, "farmer_id")?;
    let hhm_id = body
        .hhm_id
        .as_deref()
        .map(|id| parse_id(id, "hhm_id"))
        .transpose()?;

    let contract = state
        .contracts
        .create(
            auth.user_id,
            NewContract {
                farmer_id,
                hhm_id,
                crop_type: body
                    .crop_type
                    .unwrap_or_else(agrimarket_db::models::default_crop_type),
                quantity_tons: body.quantity_tons,
                price_per_ton: body.price_per_ton,
                start_date: body.start_date.to_bson(),
                end_date: body.end_date.to_bson(),
                terms: body.terms,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(contract.into())))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(contract_id): Path<String>,
) -> Result<Json<ContractResponse>, ApiError> {
    let contract_id = parse_id(&contract_id, "contract_id")?;
    let contract = state
        .contracts
        .find_for_party(contract_id, auth.user_id)
        .await?;
    Ok(Json(contract.into()))
}

async fn transition(
    state: &AppState,
    auth: &AuthUser,
    contract_id: &str,
    next: ContractStatus,
) -> Result<Json<ContractResponse>, ApiError> {
    let contract_id = parse_id(contract_id, "contract_id")?;
    let contract = state
        .contracts
        .transition(contract_id, auth.role, auth.user_id, next)
        .await?;
    Ok(Json(contract.into()))
}

pub async fn accept(
    State(state): State<AppState>,
    auth: FarmerUser,
    Path(contract_id): Path<String>,
) -> Result<Json<ContractResponse>, ApiError> {
    transition(&state, &auth, &contract_id, ContractStatus::Active).await
}

pub async fn reject(
    State(state): State<AppState>,
    auth: FarmerUser,
    Path(contract_id): Path<String>,
) -> Result<Json<ContractResponse>, ApiError> {
    transition(&state, &auth, &contract_id, ContractStatus::Rejected).await
}

pub async fn cancel(
    State(state): State<AppState>,
    auth: FactoryUser,
    Path(contract_id): Path<String>,
) -> Result<Json<ContractResponse>, ApiError> {
    transition(&state, &auth, &contract_id, ContractStatus::Cancelled).await
}

pub async fn complete(
    State(state): State<AppState>,
    auth: FactoryUser,
    Path(contract_id): Path<String>,
) -> Result<Json<ContractResponse>, ApiError> {
    transition(&state, &auth, &contract_id, ContractStatus::Completed).await
}
