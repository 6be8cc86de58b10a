use agrimarket_db::models::{
    FactoryProfile, FarmerProfile, HhmProfile, LabourProfile, Role, RoleProfile, User,
};
use agrimarket_services::dao::base::PaginationParams;
use agrimarket_services::dao::user::ProfileUpdate;
use axum::{
    Json,
    extract::{Query, State},
};
use bson::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use validator::Validate;

use super::{hex, hex_all, rfc3339};
use crate::{
    error::ApiError,
    extractors::{
        AuthUser, FactoryUser, HhmUser,
        role::{Authorized, RequiredRole},
    },
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub profile: Value,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let profile = profile_json(&user);
        Self {
            id: hex(user.id),
            username: user.username,
            email: user.email,
            name: user.name,
            phone: user.phone,
            role: user.role,
            profile,
            created_at: rfc3339(user.created_at),
        }
    }
}

/// Public directory entry; no contact details.
#[derive(Debug, Serialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub profile: Value,
}

impl From<User> for DirectoryEntry {
    fn from(user: User) -> Self {
        let profile = profile_json(&user);
        Self {
            id: hex(user.id),
            name: user.name,
            role: user.role,
            profile,
        }
    }
}

fn profile_json(user: &User) -> Value {
    match user.role {
        Role::Farmer => {
            let p = user.farmer.clone().unwrap_or_default();
            json!({
                "farm_location": p.farm_location,
                "farm_size_acres": p.farm_size_acres,
                "crop_types": p.crop_types,
            })
        }
        Role::Factory => {
            let p = user.factory.clone().unwrap_or_default();
            json!({
                "factory_name": p.factory_name,
                "location": p.location,
                "capacity_tons_per_day": p.capacity_tons_per_day,
                "associated_hhms": hex_all(&p.associated_hhms),
            })
        }
        Role::Hhm => {
            let p = user.hhm.clone().unwrap_or_default();
            json!({
                "service_area": p.service_area,
                "experience_years": p.experience_years,
                "associated_factories": hex_all(&p.associated_factories),
                "workers": hex_all(&p.workers),
            })
        }
        Role::Labour => {
            let p = user.labour.clone().unwrap_or_default();
            json!({
                "skills": p.skills,
                "experience_years": p.experience_years,
                "expected_daily_wage": p.expected_daily_wage,
                "is_available": p.is_available,
                "hhm_id": p.hhm_id.map(|id| id.to_hex()),
            })
        }
    }
}

/// Role profile fields as sent by clients. Only the fields belonging to
/// the caller's role are kept.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProfileInput {
    // farmer
    pub farm_location: Option<String>,
    #[validate(range(min = 0.0))]
    pub farm_size_acres: Option<f64>,
    pub crop_types: Option<Vec<String>>,
    // factory
    pub factory_name: Option<String>,
    pub location: Option<String>,
    #[validate(range(min = 0.0))]
    pub capacity_tons_per_day: Option<f64>,
    // hhm
    pub service_area: Option<String>,
    // hhm and labour
    #[validate(range(max = 80))]
    pub experience_years: Option<u32>,
    // labour
    pub skills: Option<Vec<String>>,
    #[validate(range(min = 0.0))]
    pub expected_daily_wage: Option<f64>,
    pub is_available: Option<bool>,
}

impl ProfileInput {
    pub fn into_role_profile(self, role: Role) -> RoleProfile {
        let mut profile = RoleProfile::default();
        match role {
            Role::Farmer => {
                profile.farmer = Some(FarmerProfile {
                    farm_location: self.farm_location,
                    farm_size_acres: self.farm_size_acres,
                    crop_types: self.crop_types.unwrap_or_default(),
                })
            }
            Role::Factory => {
                profile.factory = Some(FactoryProfile {
                    factory_name: self.factory_name,
                    location: self.location,
                    capacity_tons_per_day: self.capacity_tons_per_day,
                    ..Default::default()
                })
            }
            Role::Hhm => {
                profile.hhm = Some(HhmProfile {
                    service_area: self.service_area,
                    experience_years: self.experience_years,
                    ..Default::default()
                })
            }
            Role::Labour => {
                profile.labour = Some(LabourProfile {
                    skills: self.skills.unwrap_or_default(),
                    experience_years: self.experience_years,
                    expected_daily_wage: self.expected_daily_wage,
                    is_available: self.is_available.unwrap_or(true),
                    hhm_id: None,
                })
            }
        }
        profile
    }

    /// `$set` fields relative to the role's embedded profile. Relationship
    /// arrays are never client-writable.
    pub fn update_fields(self, role: Role) -> Document {
        let mut fields = Document::new();
        let mut put = |key: &str, value: Option<bson::Bson>| {
            if let Some(value) = value {
                fields.insert(key, value);
            }
        };
        match role {
            Role::Farmer => {
                put("farm_location", self.farm_location.map(Into::into));
                put("farm_size_acres", self.farm_size_acres.map(Into::into));
                put("crop_types", self.crop_types.map(Into::into));
            }
            Role::Factory => {
                put("factory_name", self.factory_name.map(Into::into));
                put("location", self.location.map(Into::into));
                put("capacity_tons_per_day", self.capacity_tons_per_day.map(Into::into));
            }
            Role::Hhm => {
                put("service_area", self.service_area.map(Into::into));
                put("experience_years", self.experience_years.map(|y| (y as i64).into()));
            }
            Role::Labour => {
                put("skills", self.skills.map(Into::into));
                put("experience_years", self.experience_years.map(|y| (y as i64).into()));
                put("expected_daily_wage", self.expected_daily_wage.map(Into::into));
                put("is_available", self.is_available.map(Into::into));
            }
        }
        fields
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: ProfileInput,
}

pub async fn get_profile<R: RequiredRole>(
    State(state): State<AppState>,
    auth: Authorized<R>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}

pub async fn update_profile<R: RequiredRole>(
    State(state): State<AppState>,
    auth: Authorized<R>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    body.validate()?;

    let update = ProfileUpdate {
        name: body.name,
        phone: body.phone,
        fields: body.profile.update_fields(R::ROLE),
    };
    state
        .users
        .update_profile(auth.user_id, R::ROLE, update)
        .await?;

    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}

/// Users referenced from the caller's profile (`hhm.workers`,
/// `factory.associated_hhms`, `hhm.associated_factories`).
async fn related(state: &AppState, ids: &[bson::oid::ObjectId]) -> Result<Vec<DirectoryEntry>, ApiError> {
    let users = state.users.find_by_ids(ids).await?;
    Ok(users.into_iter().map(DirectoryEntry::from).collect())
}

pub async fn hhm_workers(
    State(state): State<AppState>,
    auth: HhmUser,
) -> Result<Json<Vec<DirectoryEntry>>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    let ids = user.hhm.map(|p| p.workers).unwrap_or_default();
    Ok(Json(related(&state, &ids).await?))
}

pub async fn hhm_factories(
    State(state): State<AppState>,
    auth: HhmUser,
) -> Result<Json<Vec<DirectoryEntry>>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    let ids = user.hhm.map(|p| p.associated_factories).unwrap_or_default();
    Ok(Json(related(&state, &ids).await?))
}

#[derive(Debug, Deserialize)]
pub struct HhmListQuery {
    /// `associated` (default) or `all`.
    pub scope: Option<String>,
}

/// Factory view of HHMs: its associated HHMs, or the whole directory when
/// `scope=all` (to pick an invitation recipient).
pub async fn factory_hhms(
    State(state): State<AppState>,
    auth: FactoryUser,
    Query(query): Query<HhmListQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    if query.scope.as_deref() == Some("all") {
        let page = state
            .users
            .find_by_role(Role::Hhm, &params)
            .await?
            .map(DirectoryEntry::from);
        let body = serde_json::to_value(page).map_err(|e| ApiError::Internal(e.to_string()))?;
        return Ok(Json(body));
    }

    let user = state.users.base.find_by_id(auth.user_id).await?;
    let ids = user.factory.map(|p| p.associated_hhms).unwrap_or_default();
    let entries = related(&state, &ids).await?;
    let total = entries.len();
    Ok(Json(json!({ "items": entries, "total": total })))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}
