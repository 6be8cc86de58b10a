use agrimarket_db::models::{Role, User};
use agrimarket_services::auth::TokenPair;
use agrimarket_services::dao::base::DaoError;
use agrimarket_services::dao::user::NewUser;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::profile::{ProfileInput, UserResponse};
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role: String,
    #[serde(default)]
    #[validate(nested)]
    pub profile: Option<ProfileInput>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    body.validate()?;
    let role: Role = body.role.parse().map_err(ApiError::Validation)?;

    let password_hash = state.auth.hash_password(&body.password)?;
    let profile = body.profile.unwrap_or_default().into_role_profile(role);

    let user = state
        .users
        .create(NewUser {
            username: body.username,
            email: body.email,
            name: body.name,
            phone: body.phone,
            role,
            password_hash,
            profile,
        })
        .await
        .map_err(|e| match e {
            DaoError::DuplicateKey(_) => {
                ApiError::Conflict("Username or email already registered".to_string())
            }
            other => other.into(),
        })?;

    let (headers, response) = issue_tokens(&state, user)?;
    Ok((StatusCode::CREATED, headers, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let user = if let Some(ref username) = body.username {
        state.users.find_by_username(username).await
    } else if let Some(ref email) = body.email {
        state.users.find_by_email(email).await
    } else {
        return Err(ApiError::BadRequest(
            "Either username or email is required".to_string(),
        ));
    }
    .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !state.auth.verify_password(&body.password, password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let (headers, response) = issue_tokens(&state, user)?;
    Ok((headers, Json(response)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let claims = state.auth.verify_refresh_token(&body.refresh_token)?;

    let user_id = bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid user ID".to_string()))?;

    let user = state
        .users
        .base
        .find_by_id(user_id)
        .await
        .map_err(|_| ApiError::Unauthorized("User no longer exists".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is disabled".to_string()));
    }

    let (headers, response) = issue_tokens(&state, user)?;
    Ok((headers, Json(response)))
}

pub async fn logout() -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("access_token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0"),
    );
    Ok(headers)
}

fn issue_tokens(state: &AppState, user: User) -> Result<(HeaderMap, AuthResponse), ApiError> {
    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User without id".to_string()))?;
    let tokens = state
        .auth
        .generate_tokens(user_id, &user.username, user.role)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, access_cookie(&tokens)?);

    Ok((
        headers,
        AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            user: user.into(),
        },
    ))
}

fn access_cookie(tokens: &TokenPair) -> Result<HeaderValue, ApiError> {
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        tokens.access_token, tokens.expires_in
    );
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))
}
