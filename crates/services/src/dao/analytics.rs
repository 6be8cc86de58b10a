use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use agrimarket_db::models::{
    Application, ApplicationStatus, Contract, ContractStatus, CropListing, Invitation,
    InvitationStatus, Order, OrderStatus, Role, Schedule, ScheduleStatus, User,
};
use serde::Serialize;

use super::base::{DaoError, DaoResult};

/// Read-only aggregates for dashboards and the public landing page.
pub struct AnalyticsDao {
    users: Collection<Document>,
    listings: Collection<Document>,
    orders: Collection<Document>,
    schedules: Collection<Document>,
    applications: Collection<Document>,
    contracts: Collection<Document>,
    invitations: Collection<Document>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Farmer {
        active_listings: u64,
        listed_tons: f64,
        pending_orders: u64,
        accepted_orders: u64,
        tons_sold: f64,
        revenue: f64,
        active_contracts: u64,
    },
    Factory {
        pending_orders: u64,
        accepted_orders: u64,
        tons_purchased: f64,
        total_spent: f64,
        active_contracts: u64,
        associated_hhms: u64,
        pending_invitations: u64,
    },
    Hhm {
        workers: u64,
        associated_factories: u64,
        open_schedules: u64,
        pending_applications: u64,
        pending_invitations: u64,
    },
    Labour {
        pending_applications: u64,
        accepted_applications: u64,
        pending_invitations: u64,
        has_hhm: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    pub crop_type: String,
    pub listings: u64,
    pub total_tons: f64,
    pub avg_price_per_ton: f64,
    pub min_price_per_ton: f64,
    pub max_price_per_ton: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStats {
    pub farmers: u64,
    pub factories: u64,
    pub hhms: u64,
    pub workers: u64,
    pub active_listings: u64,
    pub completed_orders: u64,
}

impl AnalyticsDao {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(User::COLLECTION),
            listings: db.collection(CropListing::COLLECTION),
            orders: db.collection(Order::COLLECTION),
            schedules: db.collection(Schedule::COLLECTION),
            applications: db.collection(Application::COLLECTION),
            contracts: db.collection(Contract::COLLECTION),
            invitations: db.collection(Invitation::COLLECTION),
        }
    }

    pub async fn dashboard(&self, user_id: ObjectId, role: Role) -> DaoResult<Dashboard> {
        match role {
            Role::Farmer => {
                let listings = self
                    .listings
                    .count_documents(doc! { "farmer_id": user_id, "quantity_tons": { "$gt": 0.0 } })
                    .await?;
                let listed =
                    sum(&self.listings, doc! { "farmer_id": user_id }, &["quantity_tons"]).await?;
                let sold = sum(
                    &self.orders,
                    doc! { "farmer_id": user_id, "status": OrderStatus::Accepted.as_str() },
                    &["quantity_tons", "total_price"],
                )
                .await?;
                Ok(Dashboard::Farmer {
                    active_listings: listings,
                    listed_tons: listed[0],
                    pending_orders: self.count_orders("farmer_id", user_id, OrderStatus::Pending).await?,
                    accepted_orders: self.count_orders("farmer_id", user_id, OrderStatus::Accepted).await?,
                    tons_sold: sold[0],
                    revenue: sold[1],
                    active_contracts: self.count_active_contracts("farmer_id", user_id).await?,
                })
            }
            Role::Factory => {
                let bought = sum(
                    &self.orders,
                    doc! { "factory_id": user_id, "status": OrderStatus::Accepted.as_str() },
                    &["quantity_tons", "total_price"],
                )
                .await?;
                let profile = self.user_profile(user_id).await?;
                Ok(Dashboard::Factory {
                    pending_orders: self.count_orders("factory_id", user_id, OrderStatus::Pending).await?,
                    accepted_orders: self.count_orders("factory_id", user_id, OrderStatus::Accepted).await?,
                    tons_purchased: bought[0],
                    total_spent: bought[1],
                    active_contracts: self.count_active_contracts("factory_id", user_id).await?,
                    associated_hhms: array_len(&profile, "factory.associated_hhms"),
                    pending_invitations: self.count_pending_invitations("factory_id", user_id).await?,
                })
            }
            Role::Hhm => {
                let profile = self.user_profile(user_id).await?;
                Ok(Dashboard::Hhm {
                    workers: array_len(&profile, "hhm.workers"),
                    associated_factories: array_len(&profile, "hhm.associated_factories"),
                    open_schedules: self
                        .schedules
                        .count_documents(doc! { "hhm_id": user_id, "status": ScheduleStatus::Open.as_str() })
                        .await?,
                    pending_applications: self
                        .applications
                        .count_documents(doc! { "hhm_id": user_id, "status": ApplicationStatus::Pending.as_str() })
                        .await?,
                    pending_invitations: self.count_pending_invitations("hhm_id", user_id).await?,
                })
            }
            Role::Labour => {
                let profile = self.user_profile(user_id).await?;
                let has_hhm = profile
                    .get_document("labour")
                    .ok()
                    .and_then(|l| l.get_object_id("hhm_id").ok())
                    .is_some();
                Ok(Dashboard::Labour {
                    pending_applications: self
                        .applications
                        .count_documents(doc! { "worker_id": user_id, "status": ApplicationStatus::Pending.as_str() })
                        .await?,
                    accepted_applications: self
                        .applications
                        .count_documents(doc! { "worker_id": user_id, "status": ApplicationStatus::Accepted.as_str() })
                        .await?,
                    pending_invitations: self.count_pending_invitations("worker_id", user_id).await?,
                    has_hhm,
                })
            }
        }
    }

    /// Price and volume per crop type over listings with stock left.
    pub async fn market_summary(&self) -> DaoResult<Vec<MarketSummary>> {
        let pipeline = vec![
            doc! { "$match": { "quantity_tons": { "$gt": 0.0 } } },
            doc! { "$group": {
                "_id": "$crop_type",
                "listings": { "$sum": 1 },
                "total_tons": { "$sum": "$quantity_tons" },
                "avg_price_per_ton": { "$avg": "$price_per_ton" },
                "min_price_per_ton": { "$min": "$price_per_ton" },
                "max_price_per_ton": { "$max": "$price_per_ton" },
            } },
            doc! { "$sort": { "_id": 1 } },
        ];

        let rows: Vec<Document> = self.listings.aggregate(pipeline).await?.try_collect().await?;
        rows.iter()
            .map(|row| {
                Ok(MarketSummary {
                    crop_type: row
                        .get_str("_id")
                        .map_err(|e| DaoError::Internal(e.to_string()))?
                        .to_string(),
                    listings: number(row, "listings") as u64,
                    total_tons: number(row, "total_tons"),
                    avg_price_per_ton: number(row, "avg_price_per_ton"),
                    min_price_per_ton: number(row, "min_price_per_ton"),
                    max_price_per_ton: number(row, "max_price_per_ton"),
                })
            })
            .collect()
    }

    pub async fn platform_stats(&self) -> DaoResult<PlatformStats> {
        let count_role = |role: Role| {
            self.users
                .count_documents(doc! { "role": role.as_str(), "is_active": true })
        };
        Ok(PlatformStats {
            farmers: count_role(Role::Farmer).await?,
            factories: count_role(Role::Factory).await?,
            hhms: count_role(Role::Hhm).await?,
            workers: count_role(Role::Labour).await?,
            active_listings: self
                .listings
                .count_documents(doc! { "quantity_tons": { "$gt": 0.0 } })
                .await?,
            completed_orders: self
                .orders
                .count_documents(doc! { "status": OrderStatus::Accepted.as_str() })
                .await?,
        })
    }

    async fn count_orders(&self, field: &str, user_id: ObjectId, status: OrderStatus) -> DaoResult<u64> {
        let mut filter = doc! { "status": status.as_str() };
        filter.insert(field, user_id);
        Ok(self.orders.count_documents(filter).await?)
    }

    async fn count_active_contracts(&self, field: &str, user_id: ObjectId) -> DaoResult<u64> {
        let mut filter = doc! { "status": ContractStatus::Active.as_str() };
        filter.insert(field, user_id);
        Ok(self.contracts.count_documents(filter).await?)
    }

    async fn count_pending_invitations(&self, field: &str, user_id: ObjectId) -> DaoResult<u64> {
        let mut filter = doc! { "status": InvitationStatus::Pending.as_str() };
        filter.insert(field, user_id);
        Ok(self.invitations.count_documents(filter).await?)
    }

    async fn user_profile(&self, user_id: ObjectId) -> DaoResult<Document> {
        self.users
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or(DaoError::NotFound)
    }
}

/// Sums `fields` over documents matching `filter`, in the given order.
async fn sum(
    collection: &Collection<Document>,
    filter: Document,
    fields: &[&str],
) -> DaoResult<Vec<f64>> {
    let mut group = doc! { "_id": null };
    for field in fields {
        group.insert(*field, doc! { "$sum": format!("${field}") });
    }

    let pipeline = vec![doc! { "$match": filter }, doc! { "$group": group }];
    let row: Option<Document> = collection.aggregate(pipeline).await?.try_next().await?;

    Ok(fields
        .iter()
        .map(|field| row.as_ref().map(|r| number(r, field)).unwrap_or(0.0))
        .collect())
}

/// Numeric field as f64, whatever BSON number type the server returned.
fn number(doc: &Document, key: &str) -> f64 {
    match doc.get(key) {
        Some(bson::Bson::Double(v)) => *v,
        Some(bson::Bson::Int32(v)) => *v as f64,
        Some(bson::Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

/// Length of an array at a dotted path, zero when absent.
fn array_len(doc: &Document, path: &str) -> u64 {
    let mut parts = path.split('.');
    let Some(first) = parts.next() else {
        return 0;
    };
    let mut current = doc.get(first);
    for part in parts {
        current = current.and_then(|b| b.as_document()).and_then(|d| d.get(part));
    }
    current
        .and_then(|b| b.as_array())
        .map(|a| a.len() as u64)
        .unwrap_or(0)
}
