use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use agrimarket_db::models::{Application, ApplicationStatus, ScheduleStatus};
use tracing::{debug, warn};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
use super::schedule::ScheduleDao;
use super::user::UserDao;

pub struct ApplicationDao {
    pub base: BaseDao<Application>,
    schedules: ScheduleDao,
    users: UserDao,
}

impl ApplicationDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Application::COLLECTION),
            schedules: ScheduleDao::new(db),
            users: UserDao::new(db),
        }
    }

    /// Applies `worker_id` to an open schedule. A previously withdrawn
    /// application is reopened instead of creating a second one.
    pub async fn apply(
        &self,
        schedule_id: ObjectId,
        worker_id: ObjectId,
        message: Option<String>,
    ) -> DaoResult<Application> {
        let schedule = self.schedules.base.find_by_id(schedule_id).await?;
        if schedule.status != ScheduleStatus::Open {
            return Err(DaoError::Validation(format!(
                "Schedule is {}",
                schedule.status.as_str()
            )));
        }

        let now = DateTime::now();
        let application = Application {
            id: None,
            schedule_id,
            worker_id,
            hhm_id: schedule.hhm_id,
            message: message.clone(),
            status: ApplicationStatus::Pending,
            responded_at: None,
            created_at: now,
            updated_at: now,
        };

        match self.base.insert_one(&application).await {
            Ok(id) => {
                debug!(%id, %schedule_id, %worker_id, "Application submitted");
                self.base.find_by_id(id).await
            }
            Err(DaoError::DuplicateKey(_)) => {
                let filter = doc! {
                    "schedule_id": schedule_id,
                    "worker_id": worker_id,
                    "status": ApplicationStatus::Withdrawn.as_str(),
                };
                let reopened = self
                    .base
                    .update_one(
                        filter,
                        doc! { "$set": {
                            "status": ApplicationStatus::Pending.as_str(),
                            "message": message,
                            "responded_at": null,
                        } },
                    )
                    .await?;
                if !reopened {
                    return Err(DaoError::Conflict(
                        "Already applied to this schedule".to_string(),
                    ));
                }
                self.base
                    .find_one(doc! { "schedule_id": schedule_id, "worker_id": worker_id })
                    .await?
                    .ok_or(DaoError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_for_worker(
        &self,
        worker_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Application>> {
        self.base
            .find_paginated(doc! { "worker_id": worker_id }, None, params)
            .await
    }

    pub async fn list_for_schedule(
        &self,
        hhm_id: ObjectId,
        schedule_id: ObjectId,
        status: Option<ApplicationStatus>,
    ) -> DaoResult<Vec<Application>> {
        self.schedules.find_owned(hhm_id, schedule_id).await?;
        let mut filter = doc! { "schedule_id": schedule_id };
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.base
            .find_many(filter, Some(doc! { "created_at": 1 }))
            .await
    }

    /// HHM answers an application. Accepting assigns the worker to the
    /// schedule and links the worker to the HHM.
    pub async fn respond(
        &self,
        application_id: ObjectId,
        hhm_id: ObjectId,
        accept: bool,
    ) -> DaoResult<Application> {
        let application = self.base.find_by_id(application_id).await?;
        if application.hhm_id != hhm_id {
            return Err(DaoError::Forbidden(
                "Application belongs to another HHM".to_string(),
            ));
        }
        if application.status != ApplicationStatus::Pending {
            return Err(DaoError::Validation(format!(
                "Application is already {}",
                application.status.as_str()
            )));
        }

        let next = if accept {
            ApplicationStatus::Accepted
        } else {
            ApplicationStatus::Rejected
        };

        let updated = self
            .base
            .update_one(
                doc! { "_id": application_id, "status": ApplicationStatus::Pending.as_str() },
                doc! { "$set": { "status": next.as_str(), "responded_at": DateTime::now() } },
            )
            .await?;
        if !updated {
            return Err(DaoError::Conflict(
                "Application was updated by another request".to_string(),
            ));
        }

        if accept {
            // A full or closed schedule puts the application back to pending.
            if let Err(e) = self
                .schedules
                .assign_worker(application.schedule_id, application.worker_id)
                .await
            {
                self.revert_to_pending(application_id).await?;
                return Err(e);
            }
            self.users
                .link_worker(hhm_id, application.worker_id)
                .await?;
        }

        debug!(%application_id, status = next.as_str(), "Application answered");
        self.base.find_by_id(application_id).await
    }

    async fn revert_to_pending(&self, application_id: ObjectId) -> DaoResult<()> {
        warn!(%application_id, "Reverting accepted application, schedule seat unavailable");
        self.base
            .update_one(
                doc! { "_id": application_id, "status": ApplicationStatus::Accepted.as_str() },
                doc! { "$set": {
                    "status": ApplicationStatus::Pending.as_str(),
                    "responded_at": null,
                } },
            )
            .await?;
        Ok(())
    }

    pub async fn withdraw(&self, application_id: ObjectId, worker_id: ObjectId) -> DaoResult<Application> {
        let application = self.base.find_by_id(application_id).await?;
        if application.worker_id != worker_id {
            return Err(DaoError::Forbidden("Not your application".to_string()));
        }

        let updated = self
            .base
            .update_one(
                doc! { "_id": application_id, "status": ApplicationStatus::Pending.as_str() },
                doc! { "$set": { "status": ApplicationStatus::Withdrawn.as_str() } },
            )
            .await?;
        if !updated {
            return Err(DaoError::Validation(format!(
                "Application is already {}",
                application.status.as_str()
            )));
        }
        self.base.find_by_id(application_id).await
    }
}
