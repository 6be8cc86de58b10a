use std::marker::PhantomData;
use std::ops::Deref;

use agrimarket_db::models::Role;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::auth::AuthUser;
use crate::{error::ApiError, state::AppState};

/// Compile-time role tag for [`Authorized`].
pub trait RequiredRole: Send + Sync {
    const ROLE: Role;
}

#[derive(Debug, Clone)]
pub struct Farmer;
#[derive(Debug, Clone)]
pub struct Factory;
#[derive(Debug, Clone)]
pub struct Hhm;
#[derive(Debug, Clone)]
pub struct Labour;

impl RequiredRole for Farmer {
    const ROLE: Role = Role::Farmer;
}
impl RequiredRole for Factory {
    const ROLE: Role = Role::Factory;
}
impl RequiredRole for Hhm {
    const ROLE: Role = Role::Hhm;
}
impl RequiredRole for Labour {
    const ROLE: Role = Role::Labour;
}

/// An [`AuthUser`] whose token carries role `R`; any other role is a 403.
#[derive(Debug, Clone)]
pub struct Authorized<R> {
    pub user: AuthUser,
    _role: PhantomData<fn() -> R>,
}

pub type FarmerUser = Authorized<Farmer>;
pub type FactoryUser = Authorized<Factory>;
pub type HhmUser = Authorized<Hhm>;
pub type LabourUser = Authorized<Labour>;

impl<R> Deref for Authorized<R> {
    type Target = AuthUser;

    fn deref(&self) -> &AuthUser {
        &self.user
    }
}

impl<S, R> FromRequestParts<S> for Authorized<R>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    R: RequiredRole,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != R::ROLE {
            return Err(ApiError::Forbidden(format!(
                "This endpoint is only available to {} accounts",
                R::ROLE
            )));
        }
        Ok(Authorized {
            user,
            _role: PhantomData,
        })
    }
}
