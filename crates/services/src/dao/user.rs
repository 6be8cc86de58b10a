use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use agrimarket_db::models::{Role, RoleProfile, User};
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};

pub struct UserDao {
    pub base: BaseDao<User>,
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub password_hash: String,
    pub profile: RoleProfile,
}

/// Profile edit. `fields` are relative to the role's embedded profile
/// (e.g. `farm_location`), the DAO prefixes them with the role.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub fields: Document,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(&self, new_user: NewUser) -> DaoResult<User> {
        let now = DateTime::now();
        let profile = new_user.profile.for_role(new_user.role);
        let user = User {
            id: None,
            username: new_user.username,
            email: new_user.email.to_lowercase(),
            password_hash: Some(new_user.password_hash),
            name: new_user.name,
            phone: new_user.phone,
            role: new_user.role,
            is_active: true,
            farmer: profile.farmer,
            factory: profile.factory,
            hhm: profile.hhm,
            labour: profile.labour,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&user).await?;
        debug!(%id, role = %user.role, "User registered");
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email.to_lowercase(), "is_active": true })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_by_username(&self, username: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "username": username, "is_active": true })
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Loads a user and checks it has the expected role.
    pub async fn require_role(&self, user_id: ObjectId, role: Role) -> DaoResult<User> {
        let user = self.base.find_by_id(user_id).await?;
        if user.role != role || !user.is_active {
            return Err(DaoError::Validation(format!(
                "User {} is not an active {}",
                user_id.to_hex(),
                role
            )));
        }
        Ok(user)
    }

    pub async fn find_by_role(
        &self,
        role: Role,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<User>> {
        self.base
            .find_paginated(
                doc! { "role": role.as_str(), "is_active": true },
                Some(doc! { "name": 1 }),
                params,
            )
            .await
    }

    pub async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, Some(doc! { "name": 1 }))
            .await
    }

    pub async fn count_by_role(&self, role: Role) -> DaoResult<u64> {
        self.base
            .count(doc! { "role": role.as_str(), "is_active": true })
            .await
    }

    pub async fn update_profile(
        &self,
        user_id: ObjectId,
        role: Role,
        update: ProfileUpdate,
    ) -> DaoResult<bool> {
        let mut set = Document::new();
        if let Some(name) = update.name {
            set.insert("name", name);
        }
        if let Some(phone) = update.phone {
            set.insert("phone", phone);
        }
        for (key, value) in update.fields {
            set.insert(format!("{}.{}", role.as_str(), key), value);
        }

        if set.is_empty() {
            return Ok(false);
        }

        self.base
            .update_one(
                doc! { "_id": user_id, "role": role.as_str() },
                doc! { "$set": set },
            )
            .await
    }

    /// Records that `worker_id` now works under `hhm_id`.
    pub async fn link_worker(&self, hhm_id: ObjectId, worker_id: ObjectId) -> DaoResult<()> {
        // A worker belongs to one HHM at a time.
        self.base
            .update_many(
                doc! { "role": Role::Hhm.as_str(), "hhm.workers": worker_id, "_id": { "$ne": hhm_id } },
                doc! { "$pull": { "hhm.workers": worker_id } },
            )
            .await?;
        self.base
            .update_one(
                doc! { "_id": worker_id, "role": Role::Labour.as_str() },
                doc! { "$set": { "labour.hhm_id": hhm_id } },
            )
            .await?;
        self.base
            .update_one(
                doc! { "_id": hhm_id, "role": Role::Hhm.as_str() },
                doc! { "$addToSet": { "hhm.workers": worker_id } },
            )
            .await?;
        debug!(%hhm_id, %worker_id, "Worker linked to HHM");
        Ok(())
    }

    /// Associates a factory and an HHM in both directions.
    pub async fn link_factory_hhm(&self, factory_id: ObjectId, hhm_id: ObjectId) -> DaoResult<()> {
        self.base
            .update_one(
                doc! { "_id": factory_id, "role": Role::Factory.as_str() },
                doc! { "$addToSet": { "factory.associated_hhms": hhm_id } },
            )
            .await?;
        self.base
            .update_one(
                doc! { "_id": hhm_id, "role": Role::Hhm.as_str() },
                doc! { "$addToSet": { "hhm.associated_factories": factory_id } },
            )
            .await?;
        debug!(%factory_id, %hhm_id, "Factory associated with HHM");
        Ok(())
    }
}
