use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use agrimarket_db::models::{
    Application, ApplicationStatus, Invitation, InvitationStatus, InvitationType, Schedule,
    ScheduleStatus,
};
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};

pub struct ScheduleDao {
    pub base: BaseDao<Schedule>,
    applications: BaseDao<Application>,
    invitations: BaseDao<Invitation>,
}

pub struct NewSchedule {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub required_workers: u32,
    pub wage_per_day: f64,
}

#[derive(Debug, Default)]
pub struct ScheduleUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime>,
    pub end_date: Option<DateTime>,
    pub required_workers: Option<u32>,
    pub wage_per_day: Option<f64>,
    pub status: Option<ScheduleStatus>,
}

impl ScheduleDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Schedule::COLLECTION),
            applications: BaseDao::new(db, Application::COLLECTION),
            invitations: BaseDao::new(db, Invitation::COLLECTION),
        }
    }

    pub async fn create(&self, hhm_id: ObjectId, new: NewSchedule) -> DaoResult<Schedule> {
        validate_window(new.start_date, new.end_date)?;
        if new.required_workers == 0 {
            return Err(DaoError::Validation(
                "required_workers must be at least 1".to_string(),
            ));
        }

        let now = DateTime::now();
        let schedule = Schedule {
            id: None,
            hhm_id,
            title: new.title,
            description: new.description,
            location: new.location,
            start_date: new.start_date,
            end_date: new.end_date,
            required_workers: new.required_workers,
            wage_per_day: new.wage_per_day,
            assigned_workers: Vec::new(),
            status: ScheduleStatus::Open,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&schedule).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_owned(&self, hhm_id: ObjectId, schedule_id: ObjectId) -> DaoResult<Schedule> {
        let schedule = self.base.find_by_id(schedule_id).await?;
        if schedule.hhm_id != hhm_id {
            return Err(DaoError::Forbidden("Not the owner of this schedule".to_string()));
        }
        Ok(schedule)
    }

    pub async fn list_for_hhm(
        &self,
        hhm_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Schedule>> {
        self.base
            .find_paginated(
                doc! { "hhm_id": hhm_id },
                Some(doc! { "start_date": -1 }),
                params,
            )
            .await
    }

    /// Open schedules that have not ended yet.
    pub async fn list_open(&self, params: &PaginationParams) -> DaoResult<PaginatedResult<Schedule>> {
        self.base
            .find_paginated(
                doc! {
                    "status": ScheduleStatus::Open.as_str(),
                    "end_date": { "$gte": DateTime::now() },
                },
                Some(doc! { "start_date": 1 }),
                params,
            )
            .await
    }

    pub async fn update(
        &self,
        hhm_id: ObjectId,
        schedule_id: ObjectId,
        update: ScheduleUpdate,
    ) -> DaoResult<Schedule> {
        let current = self.find_owned(hhm_id, schedule_id).await?;

        validate_window(
            update.start_date.unwrap_or(current.start_date),
            update.end_date.unwrap_or(current.end_date),
        )?;

        let mut set = Document::new();
        if let Some(title) = update.title {
            set.insert("title", title);
        }
        if let Some(description) = update.description {
            set.insert("description", description);
        }
        if let Some(location) = update.location {
            set.insert("location", location);
        }
        if let Some(start_date) = update.start_date {
            set.insert("start_date", start_date);
        }
        if let Some(end_date) = update.end_date {
            set.insert("end_date", end_date);
        }
        if let Some(required) = update.required_workers {
            if (required as usize) < current.assigned_workers.len() || required == 0 {
                return Err(DaoError::Validation(format!(
                    "required_workers must be at least {}",
                    current.assigned_workers.len().max(1)
                )));
            }
            set.insert("required_workers", required as i64);
        }
        if let Some(wage) = update.wage_per_day {
            set.insert("wage_per_day", wage);
        }
        let status = settled_status(
            update.status.unwrap_or(current.status),
            current.assigned_workers.len(),
            update.required_workers.unwrap_or(current.required_workers),
        );
        if status != current.status {
            set.insert("status", status.as_str());
        }

        if !set.is_empty() {
            self.base
                .update_by_id(schedule_id, doc! { "$set": set })
                .await?;
        }
        self.base.find_by_id(schedule_id).await
    }

    /// Deletes a schedule. Applications still pending on it are rejected and
    /// pending worker invitations for it expire.
    pub async fn delete(&self, hhm_id: ObjectId, schedule_id: ObjectId) -> DaoResult<()> {
        self.find_owned(hhm_id, schedule_id).await?;
        self.base.delete_one(doc! { "_id": schedule_id }).await?;
        let rejected = self
            .applications
            .update_many(
                doc! {
                    "schedule_id": schedule_id,
                    "status": ApplicationStatus::Pending.as_str(),
                },
                doc! { "$set": {
                    "status": ApplicationStatus::Rejected.as_str(),
                    "responded_at": DateTime::now(),
                } },
            )
            .await?;
        let expired = self
            .invitations
            .update_many(
                doc! {
                    "invitation_type": InvitationType::HhmToWorker.as_str(),
                    "schedule_id": schedule_id,
                    "status": InvitationStatus::Pending.as_str(),
                },
                doc! { "$set": { "status": InvitationStatus::Expired.as_str() } },
            )
            .await?;
        debug!(%schedule_id, rejected, expired, "Schedule deleted");
        Ok(())
    }

    /// Adds a worker to an open schedule, marking it filled once the
    /// required head count is reached.
    pub async fn assign_worker(&self, schedule_id: ObjectId, worker_id: ObjectId) -> DaoResult<Schedule> {
        let schedule = self.base.find_by_id(schedule_id).await?;
        if schedule.assigned_workers.contains(&worker_id) {
            return Ok(schedule);
        }
        if schedule.status != ScheduleStatus::Open || schedule.is_full() {
            return Err(DaoError::Validation(format!(
                "Schedule is {}",
                if schedule.is_full() { "already filled" } else { schedule.status.as_str() }
            )));
        }

        // The size guard keeps two concurrent assignments from overfilling.
        let slots_taken = format!("assigned_workers.{}", schedule.required_workers - 1);
        let mut filter = doc! {
            "_id": schedule_id,
            "status": ScheduleStatus::Open.as_str(),
        };
        filter.insert(slots_taken, doc! { "$exists": false });

        let assigned = self
            .base
            .update_one(filter, doc! { "$addToSet": { "assigned_workers": worker_id } })
            .await?;
        if !assigned {
            return Err(DaoError::Conflict("Schedule is already filled".to_string()));
        }

        let schedule = self.base.find_by_id(schedule_id).await?;
        if schedule.is_full() {
            self.base
                .update_one(
                    doc! { "_id": schedule_id, "status": ScheduleStatus::Open.as_str() },
                    doc! { "$set": { "status": ScheduleStatus::Filled.as_str() } },
                )
                .await?;
            debug!(%schedule_id, "Schedule filled");
            return self.base.find_by_id(schedule_id).await;
        }
        Ok(schedule)
    }
}

/// `closed` sticks; otherwise the head count decides between open and filled.
fn settled_status(requested: ScheduleStatus, assigned: usize, required: u32) -> ScheduleStatus {
    match requested {
        ScheduleStatus::Closed => ScheduleStatus::Closed,
        _ if assigned >= required as usize => ScheduleStatus::Filled,
        _ => ScheduleStatus::Open,
    }
}

fn validate_window(start: DateTime, end: DateTime) -> DaoResult<()> {
    if end < start {
        return Err(DaoError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }
    Ok(())
}
