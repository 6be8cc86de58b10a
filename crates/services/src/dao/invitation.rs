use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use agrimarket_db::models::{
    Invitation, InvitationPriority, InvitationStatus, InvitationType, Role,
};
use tracing::{debug, info, warn};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
use super::schedule::ScheduleDao;
use super::user::UserDao;

pub struct InvitationDao {
    pub base: BaseDao<Invitation>,
    users: UserDao,
    schedules: ScheduleDao,
    default_ttl_hours: u64,
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub invitation_type: InvitationType,
    pub recipient_id: ObjectId,
    pub schedule_id: Option<ObjectId>,
    pub personal_message: Option<String>,
    pub offered_wage: Option<f64>,
    pub priority: InvitationPriority,
    pub expires_in_hours: Option<u64>,
}

/// Which end of the invitation the listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationDirection {
    Sent,
    Received,
}

impl InvitationDirection {
    fn types_for(&self, role: Role) -> Vec<InvitationType> {
        match self {
            InvitationDirection::Sent => InvitationType::sendable_by(role),
            InvitationDirection::Received => InvitationType::receivable_by(role),
        }
    }

    fn field_of(&self, invitation_type: InvitationType) -> &'static str {
        match self {
            InvitationDirection::Sent => invitation_type.sender_field(),
            InvitationDirection::Received => invitation_type.recipient_field(),
        }
    }

    /// Filter matching every invitation `user_id` is on this end of.
    pub fn filter(&self, role: Role, user_id: ObjectId) -> Option<Document> {
        let clauses: Vec<Document> = self
            .types_for(role)
            .into_iter()
            .map(|t| {
                let mut clause = doc! { "invitation_type": t.as_str() };
                clause.insert(self.field_of(t), user_id);
                clause
            })
            .collect();

        match clauses.len() {
            0 => None,
            1 => clauses.into_iter().next(),
            _ => Some(doc! { "$or": clauses }),
        }
    }
}

impl InvitationDao {
    pub fn new(db: &Database, default_ttl_hours: u64) -> Self {
        Self {
            base: BaseDao::new(db, Invitation::COLLECTION),
            users: UserDao::new(db),
            schedules: ScheduleDao::new(db),
            default_ttl_hours,
        }
    }

    /// Sends an invitation from `sender_id` (with `sender_role`).
    ///
    /// Duplicate pending invitations for the same pair, including
    /// schedule-less worker invitations from the same HHM, are rejected by
    /// the partial unique indexes and surface as `Conflict`.
    pub async fn create(
        &self,
        sender_role: Role,
        sender_id: ObjectId,
        new: NewInvitation,
    ) -> DaoResult<Invitation> {
        let invitation_type = new.invitation_type;
        if invitation_type.sender_role() != sender_role {
            return Err(DaoError::Forbidden(format!(
                "A {} cannot send {} invitations",
                sender_role,
                invitation_type.as_str()
            )));
        }

        self.users
            .require_role(new.recipient_id, invitation_type.recipient_role())
            .await?;

        if let Some(schedule_id) = new.schedule_id {
            if invitation_type != InvitationType::HhmToWorker {
                return Err(DaoError::Validation(
                    "schedule_id is only valid for hhm-to-worker invitations".to_string(),
                ));
            }
            self.schedules.find_owned(sender_id, schedule_id).await?;
        }

        if let Some(wage) = new.offered_wage {
            if !(wage.is_finite() && wage >= 0.0) {
                return Err(DaoError::Validation(
                    "offered_wage must not be negative".to_string(),
                ));
            }
        }

        let now = DateTime::now();
        let ttl_hours = new.expires_in_hours.unwrap_or(self.default_ttl_hours).max(1);
        let expires_at = DateTime::from_millis(
            now.timestamp_millis() + (ttl_hours as i64) * 60 * 60 * 1000,
        );

        let mut invitation = Invitation {
            id: None,
            invitation_type,
            worker_id: None,
            hhm_id: None,
            factory_id: None,
            schedule_id: new.schedule_id,
            status: InvitationStatus::Pending,
            personal_message: new.personal_message,
            offered_wage: new.offered_wage,
            priority: new.priority,
            expires_at,
            response_message: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        };
        set_party(&mut invitation, invitation_type.sender_role(), sender_id);
        set_party(&mut invitation, invitation_type.recipient_role(), new.recipient_id);

        let id = match self.base.insert_one(&invitation).await {
            Ok(id) => id,
            Err(DaoError::DuplicateKey(_)) => return Err(duplicate_pending()),
            Err(e) => return Err(e),
        };
        debug!(%id, invitation_type = invitation_type.as_str(), "Invitation sent");
        self.base.find_by_id(id).await
    }

    pub async fn list(
        &self,
        direction: InvitationDirection,
        role: Role,
        user_id: ObjectId,
        status: Option<InvitationStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Invitation>> {
        let Some(mut filter) = direction.filter(role, user_id) else {
            return Ok(PaginatedResult {
                items: Vec::new(),
                total: 0,
                page: params.page(),
                per_page: params.per_page(),
                total_pages: 0,
            });
        };

        // Overdue invitations read as expired even before the sweeper runs.
        self.expire_overdue().await?;

        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.base.find_paginated(filter, None, params).await
    }

    /// Recipient accepts or rejects a pending invitation.
    pub async fn respond(
        &self,
        invitation_id: ObjectId,
        responder_role: Role,
        responder_id: ObjectId,
        accept: bool,
        response_message: Option<String>,
    ) -> DaoResult<Invitation> {
        let invitation = self.base.find_by_id(invitation_id).await?;
        let invitation_type = invitation.invitation_type;

        if invitation_type.recipient_role() != responder_role
            || invitation.recipient_id() != Some(responder_id)
        {
            return Err(DaoError::Forbidden(
                "Only the invited party can respond".to_string(),
            ));
        }
        if invitation.status != InvitationStatus::Pending {
            return Err(DaoError::Validation(format!(
                "Invitation is already {}",
                invitation.status.as_str()
            )));
        }

        let now = DateTime::now();
        if invitation.is_overdue(now) {
            self.set_status_if_pending(invitation_id, InvitationStatus::Expired, None)
                .await?;
            return Err(DaoError::Validation("Invitation has expired".to_string()));
        }

        let next = if accept {
            InvitationStatus::Accepted
        } else {
            InvitationStatus::Rejected
        };

        if !self
            .set_status_if_pending(invitation_id, next, response_message)
            .await?
        {
            return Err(DaoError::Conflict(
                "Invitation was updated by another request".to_string(),
            ));
        }

        if accept {
            if let Err(e) = self.assign_to_schedule(&invitation).await {
                self.revert_to_pending(invitation_id).await?;
                return Err(e);
            }
            self.apply_relationship(&invitation).await?;
        }

        debug!(%invitation_id, status = next.as_str(), "Invitation answered");
        self.base.find_by_id(invitation_id).await
    }

    /// Marks every pending invitation past its expiry as expired.
    pub async fn expire_overdue(&self) -> DaoResult<u64> {
        let expired = self
            .base
            .update_many(
                doc! {
                    "status": InvitationStatus::Pending.as_str(),
                    "expires_at": { "$lte": DateTime::now() },
                },
                doc! { "$set": { "status": InvitationStatus::Expired.as_str() } },
            )
            .await?;
        if expired > 0 {
            info!(expired, "Expired overdue invitations");
        }
        Ok(expired)
    }

    async fn set_status_if_pending(
        &self,
        invitation_id: ObjectId,
        next: InvitationStatus,
        response_message: Option<String>,
    ) -> DaoResult<bool> {
        let mut set = doc! { "status": next.as_str() };
        if next != InvitationStatus::Expired {
            set.insert("responded_at", DateTime::now());
            set.insert("response_message", response_message);
        }
        self.base
            .update_one(
                doc! { "_id": invitation_id, "status": InvitationStatus::Pending.as_str() },
                doc! { "$set": set },
            )
            .await
    }

    /// Takes a seat on the referenced schedule for an accepted worker
    /// invitation. Fails when the schedule is full, closed or gone.
    async fn assign_to_schedule(&self, invitation: &Invitation) -> DaoResult<()> {
        if invitation.invitation_type != InvitationType::HhmToWorker {
            return Ok(());
        }
        if let (Some(schedule_id), Some(worker_id)) = (invitation.schedule_id, invitation.worker_id) {
            self.schedules.assign_worker(schedule_id, worker_id).await?;
        }
        Ok(())
    }

    async fn revert_to_pending(&self, invitation_id: ObjectId) -> DaoResult<()> {
        warn!(%invitation_id, "Reverting accepted invitation, schedule seat unavailable");
        self.base
            .update_one(
                doc! { "_id": invitation_id, "status": InvitationStatus::Accepted.as_str() },
                doc! { "$set": {
                    "status": InvitationStatus::Pending.as_str(),
                    "responded_at": null,
                    "response_message": null,
                } },
            )
            .await?;
        Ok(())
    }

    async fn apply_relationship(&self, invitation: &Invitation) -> DaoResult<()> {
        match invitation.invitation_type {
            InvitationType::HhmToWorker => {
                let (Some(hhm_id), Some(worker_id)) = (invitation.hhm_id, invitation.worker_id) else {
                    return Err(DaoError::Internal(
                        "hhm-to-worker invitation without parties".to_string(),
                    ));
                };
                self.users.link_worker(hhm_id, worker_id).await
            }
            InvitationType::FactoryToHhm | InvitationType::HhmToFactory => {
                let (Some(factory_id), Some(hhm_id)) = (invitation.factory_id, invitation.hhm_id) else {
                    return Err(DaoError::Internal(
                        "factory/hhm invitation without parties".to_string(),
                    ));
                };
                self.users.link_factory_hhm(factory_id, hhm_id).await
            }
        }
    }
}

fn set_party(invitation: &mut Invitation, role: Role, id: ObjectId) {
    match role {
        Role::Labour => invitation.worker_id = Some(id),
        Role::Hhm => invitation.hhm_id = Some(id),
        Role::Factory => invitation.factory_id = Some(id),
        Role::Farmer => {}
    }
}

fn duplicate_pending() -> DaoError {
    DaoError::Conflict("A pending invitation already exists for this pair".to_string())
}
