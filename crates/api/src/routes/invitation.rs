use agrimarket_db::models::{Invitation, InvitationPriority, InvitationStatus, InvitationType};
use agrimarket_services::dao::base::{PaginatedResult, PaginationParams};
use agrimarket_services::dao::invitation::{InvitationDirection, NewInvitation};
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
    extractors::role::{Authorized, RequiredRole},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    /// May be omitted when the caller's role sends a single type.
    pub invitation_type: Option<InvitationType>,
    pub recipient_id: String,
    pub schedule_id: Option<String>,
    #[validate(length(max = 1000))]
    pub personal_message: Option<String>,
    #[validate(range(min = 0.0))]
    pub offered_wage: Option<f64>,
    #[serde(default)]
    pub priority: InvitationPriority,
    #[validate(range(min = 1, max = 2160))]
    pub expires_in_hours: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
    Sent,
    #[default]
    Received,
}

impl From<Mailbox> for InvitationDirection {
    fn from(mailbox: Mailbox) -> Self {
        match mailbox {
            Mailbox::Sent => InvitationDirection::Sent,
            Mailbox::Received => InvitationDirection::Received,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InvitationQuery {
    #[serde(default)]
    pub direction: Mailbox,
    pub status: Option<InvitationStatus>,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: String,
    pub invitation_type: InvitationType,
    pub sender_id: Option<String>,
    pub recipient_id: Option<String>,
    pub worker_id: Option<String>,
    pub hhm_id: Option<String>,
    pub factory_id: Option<String>,
    pub schedule_id: Option<String>,
    pub status: InvitationStatus,
    pub personal_message: Option<String>,
    pub offered_wage: Option<f64>,
    pub priority: InvitationPriority,
    pub expires_at: String,
    pub response_message: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: String,
}

impl From<Invitation> for InvitationResponse {
    fn from(i: Invitation) -> Self {
        let to_hex = |id: Option<bson::oid::ObjectId>| id.map(|id| id.to_hex());
        Self {
            id: hex(i.id),
            invitation_type: i.invitation_type,
            sender_id: to_hex(i.sender_id()),
            recipient_id: to_hex(i.recipient_id()),
            worker_id: to_hex(i.worker_id),
            hhm_id: to_hex(i.hhm_id),
            factory_id: to_hex(i.factory_id),
            schedule_id: to_hex(i.schedule_id),
            status: i.status,
            personal_message: i.personal_message,
            offered_wage: i.offered_wage,
            priority: i.priority,
            expires_at: rfc3339(i.expires_at),
            response_message: i.response_message,
            responded_at: i.responded_at.map(rfc3339),
            created_at: rfc3339(i.created_at),
        }
    }
}

/// Picks the invitation type: explicit, or the only type `R` can send.
fn resolve_type<R: RequiredRole>(requested: Option<InvitationType>) -> Result<InvitationType, ApiError> {
    if let Some(t) = requested {
        return Ok(t);
    }
    match InvitationType::sendable_by(R::ROLE).as_slice() {
        [only] => Ok(*only),
        [] => Err(ApiError::Forbidden(format!(
            "A {} cannot send invitations",
            R::ROLE
        ))),
        _ => Err(ApiError::Validation(
            "invitation_type is required".to_string(),
        )),
    }
}

pub async fn list<R: RequiredRole>(
    State(state): State<AppState>,
    auth: Authorized<R>,
    Query(query): Query<InvitationQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<InvitationResponse>>, ApiError> {
    let page = state
        .invitations
        .list(
            query.direction.into(),
            R::ROLE,
            auth.user_id,
            query.status,
            &params,
        )
        .await?;
    Ok(Json(page.map(InvitationResponse::from)))
}

pub async fn create<R: RequiredRole>(
    State(state): State<AppState>,
    auth: Authorized<R>,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>), ApiError> {
    body.validate()?;
    let invitation_type = resolve_type::<R>(body.invitation_type)?;
    let recipient_id = parse_id(&body.recipient_id, "recipient_id")?;
    let schedule_id = body
        .schedule_id
        .as_deref()
        .map(|id| parse_id(id, "schedule_id"))
        .transpose()?;

    let invitation = state
        .invitations
        .create(
            R::ROLE,
            auth.user_id,
            NewInvitation {
                invitation_type,
                recipient_id,
                schedule_id,
                personal_message: body.personal_message,
                offered_wage: body.offered_wage,
                priority: body.priority,
                expires_in_hours: body.expires_in_hours,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(invitation.into())))
}

pub async fn respond<R: RequiredRole>(
    State(state): State<AppState>,
    auth: Authorized<R>,
    Path(invitation_id): Path<String>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<InvitationResponse>, ApiError> {
    let invitation_id = parse_id(&invitation_id, "invitation_id")?;
    let invitation = state
        .invitations
        .respond(
            invitation_id,
            R::ROLE,
            auth.user_id,
            body.action == Decision::Accept,
            body.message,
        )
        .await?;
    Ok(Json(invitation.into()))
}
