use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use agrimarket_db::models::{Contract, ContractStatus, Role};
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
use super::user::UserDao;

pub struct ContractDao {
    pub base: BaseDao<Contract>,
    users: UserDao,
}

pub struct NewContract {
    pub farmer_id: ObjectId,
    pub hhm_id: Option<ObjectId>,
    pub crop_type: String,
    pub quantity_tons: f64,
    pub price_per_ton: f64,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub terms: Option<String>,
}

/// Role allowed to move a contract into `next`.
fn actor_for(next: ContractStatus) -> Option<Role> {
    match next {
        ContractStatus::Active | ContractStatus::Rejected => Some(Role::Farmer),
        ContractStatus::Cancelled | ContractStatus::Completed => Some(Role::Factory),
        ContractStatus::Pending => None,
    }
}

impl ContractDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Contract::COLLECTION),
            users: UserDao::new(db),
        }
    }

    pub async fn create(&self, factory_id: ObjectId, new: NewContract) -> DaoResult<Contract> {
        self.users.require_role(new.farmer_id, Role::Farmer).await?;
        if let Some(hhm_id) = new.hhm_id {
            self.users.require_role(hhm_id, Role::Hhm).await?;
        }
        if new.end_date < new.start_date {
            return Err(DaoError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
        if !(new.quantity_tons > 0.0 && new.price_per_ton > 0.0) {
            return Err(DaoError::Validation(
                "quantity_tons and price_per_ton must be greater than zero".to_string(),
            ));
        }

        let now = DateTime::now();
        let contract = Contract {
            id: None,
            factory_id,
            farmer_id: new.farmer_id,
            hhm_id: new.hhm_id,
            crop_type: new.crop_type.to_lowercase(),
            quantity_tons: new.quantity_tons,
            price_per_ton: new.price_per_ton,
            start_date: new.start_date,
            end_date: new.end_date,
            terms: new.terms,
            status: ContractStatus::Pending,
            responded_at: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&contract).await?;
        debug!(%id, %factory_id, farmer_id = %new.farmer_id, "Contract proposed");
        self.base.find_by_id(id).await
    }

    pub async fn list_for_user(
        &self,
        user_id: ObjectId,
        role: Role,
        status: Option<ContractStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Contract>> {
        let mut filter = match role {
            Role::Farmer => doc! { "farmer_id": user_id },
            Role::Factory => doc! { "factory_id": user_id },
            Role::Hhm => doc! { "hhm_id": user_id },
            Role::Labour => {
                return Err(DaoError::Forbidden(
                    "Workers are not party to contracts".to_string(),
                ));
            }
        };
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.base.find_paginated(filter, None, params).await
    }

    pub async fn find_for_party(&self, contract_id: ObjectId, user_id: ObjectId) -> DaoResult<Contract> {
        let contract = self.base.find_by_id(contract_id).await?;
        let is_party = contract.factory_id == user_id
            || contract.farmer_id == user_id
            || contract.hhm_id == Some(user_id);
        if !is_party {
            return Err(DaoError::Forbidden("Not a party to this contract".to_string()));
        }
        Ok(contract)
    }

    pub async fn transition(
        &self,
        contract_id: ObjectId,
        actor_role: Role,
        actor_id: ObjectId,
        next: ContractStatus,
    ) -> DaoResult<Contract> {
        let contract = self.base.find_by_id(contract_id).await?;

        let actor_matches = match actor_role {
            Role::Farmer => contract.farmer_id == actor_id,
            Role::Factory => contract.factory_id == actor_id,
            _ => false,
        };
        if !actor_matches || actor_for(next) != Some(actor_role) {
            return Err(DaoError::Forbidden(format!(
                "Not allowed to mark this contract {}",
                next.as_str()
            )));
        }
        if !contract.status.can_transition_to(next) {
            return Err(DaoError::Validation(format!(
                "Contract is {}",
                contract.status.as_str()
            )));
        }

        let mut set = doc! { "status": next.as_str() };
        if contract.status == ContractStatus::Pending {
            set.insert("responded_at", DateTime::now());
        }
        let updated = self
            .base
            .update_one(
                doc! { "_id": contract_id, "status": contract.status.as_str() },
                doc! { "$set": set },
            )
            .await?;
        if !updated {
            return Err(DaoError::Conflict(
                "Contract was updated by another request".to_string(),
            ));
        }

        debug!(%contract_id, status = next.as_str(), "Contract status changed");
        self.base.find_by_id(contract_id).await
    }
}
