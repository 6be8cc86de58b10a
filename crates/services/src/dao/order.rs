use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use agrimarket_db::models::{Order, OrderStatus};
use tracing::{debug, warn};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
use super::listing::ListingDao;

pub struct OrderDao {
    pub base: BaseDao<Order>,
    listings: ListingDao,
}

/// Which side of an order the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderParty {
    Farmer,
    Factory,
}

impl OrderParty {
    fn field(&self) -> &'static str {
        match self {
            OrderParty::Farmer => "farmer_id",
            OrderParty::Factory => "factory_id",
        }
    }

    fn id_of(&self, order: &Order) -> ObjectId {
        match self {
            OrderParty::Farmer => order.farmer_id,
            OrderParty::Factory => order.factory_id,
        }
    }

    /// Transitions this side is allowed to make.
    fn may_set(&self, next: OrderStatus) -> bool {
        match self {
            OrderParty::Farmer => matches!(next, OrderStatus::Accepted | OrderStatus::Rejected),
            OrderParty::Factory => next == OrderStatus::Cancelled,
        }
    }
}

impl OrderDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Order::COLLECTION),
            listings: ListingDao::new(db),
        }
    }

    pub async fn create(
        &self,
        factory_id: ObjectId,
        listing_id: ObjectId,
        quantity_tons: f64,
        message: Option<String>,
    ) -> DaoResult<Order> {
        let listing = self.listings.base.find_by_id(listing_id).await?;

        if !(quantity_tons.is_finite() && quantity_tons > 0.0) {
            return Err(DaoError::Validation(
                "quantity_tons must be greater than zero".to_string(),
            ));
        }
        if quantity_tons > listing.quantity_tons {
            return Err(DaoError::Validation(format!(
                "Only {} tons available on this listing",
                listing.quantity_tons
            )));
        }

        let now = DateTime::now();
        let order = Order {
            id: None,
            listing_id,
            farmer_id: listing.farmer_id,
            factory_id,
            crop_type: listing.crop_type,
            quantity_tons,
            price_per_ton: listing.price_per_ton,
            total_price: quantity_tons * listing.price_per_ton,
            message,
            status: OrderStatus::Pending,
            responded_at: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&order).await?;
        debug!(%id, %listing_id, quantity_tons, "Order placed");
        self.base.find_by_id(id).await
    }

    /// Loads an order visible to `user_id` (either party).
    pub async fn find_for_party(&self, order_id: ObjectId, user_id: ObjectId) -> DaoResult<Order> {
        let order = self.base.find_by_id(order_id).await?;
        if order.farmer_id != user_id && order.factory_id != user_id {
            return Err(DaoError::Forbidden("Not a party to this order".to_string()));
        }
        Ok(order)
    }

    pub async fn list_for_party(
        &self,
        party: OrderParty,
        user_id: ObjectId,
        status: Option<OrderStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Order>> {
        let mut filter = doc! {};
        filter.insert(party.field(), user_id);
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.base.find_paginated(filter, None, params).await
    }

    /// Accepts a pending order and takes its quantity off the listing.
    ///
    /// The status flip is a compare-and-set on `pending`, so of two
    /// concurrent acceptances only one adjusts the listing. If the listing
    /// disappears before it can be adjusted, the order goes back to
    /// pending.
    pub async fn accept(&self, order_id: ObjectId, farmer_id: ObjectId) -> DaoResult<Order> {
        let order = self
            .load_for_transition(order_id, OrderParty::Farmer, farmer_id, OrderStatus::Accepted)
            .await?;

        if self
            .listings
            .base
            .find_one(doc! { "_id": order.listing_id })
            .await?
            .is_none()
        {
            return Err(DaoError::NotFound);
        }

        self.compare_and_set(order_id, OrderStatus::Pending, OrderStatus::Accepted)
            .await?;

        match self
            .listings
            .apply_order(order.listing_id, order.quantity_tons)
            .await
        {
            Ok(Some(adjustment)) => {
                debug!(%order_id, ?adjustment, "Order accepted");
                self.base.find_by_id(order_id).await
            }
            Ok(None) => {
                self.revert_to_pending(order_id).await?;
                Err(DaoError::NotFound)
            }
            Err(e) => {
                self.revert_to_pending(order_id).await?;
                Err(e)
            }
        }
    }

    pub async fn reject(&self, order_id: ObjectId, farmer_id: ObjectId) -> DaoResult<Order> {
        self.transition(order_id, OrderParty::Farmer, farmer_id, OrderStatus::Rejected)
            .await
    }

    pub async fn cancel(&self, order_id: ObjectId, factory_id: ObjectId) -> DaoResult<Order> {
        self.transition(order_id, OrderParty::Factory, factory_id, OrderStatus::Cancelled)
            .await
    }

    async fn transition(
        &self,
        order_id: ObjectId,
        party: OrderParty,
        actor_id: ObjectId,
        next: OrderStatus,
    ) -> DaoResult<Order> {
        let order = self.load_for_transition(order_id, party, actor_id, next).await?;
        self.compare_and_set(order_id, order.status, next).await?;
        debug!(%order_id, status = next.as_str(), "Order status changed");
        self.base.find_by_id(order_id).await
    }

    async fn load_for_transition(
        &self,
        order_id: ObjectId,
        party: OrderParty,
        actor_id: ObjectId,
        next: OrderStatus,
    ) -> DaoResult<Order> {
        let order = self.base.find_by_id(order_id).await?;
        if party.id_of(&order) != actor_id || !party.may_set(next) {
            return Err(DaoError::Forbidden(format!(
                "Not allowed to mark this order {}",
                next.as_str()
            )));
        }
        if !order.status.can_transition_to(next) {
            return Err(DaoError::Validation(format!(
                "Order is already {}",
                order.status.as_str()
            )));
        }
        Ok(order)
    }

    async fn compare_and_set(
        &self,
        order_id: ObjectId,
        current: OrderStatus,
        next: OrderStatus,
    ) -> DaoResult<()> {
        let updated = self
            .base
            .update_one(
                doc! { "_id": order_id, "status": current.as_str() },
                doc! { "$set": { "status": next.as_str(), "responded_at": DateTime::now() } },
            )
            .await?;
        if !updated {
            return Err(DaoError::Conflict(
                "Order was updated by another request".to_string(),
            ));
        }
        Ok(())
    }

    async fn revert_to_pending(&self, order_id: ObjectId) -> DaoResult<()> {
        warn!(%order_id, "Reverting accepted order, listing could not be adjusted");
        self.base
            .update_one(
                doc! { "_id": order_id, "status": OrderStatus::Accepted.as_str() },
                doc! { "$set": { "status": OrderStatus::Pending.as_str(), "responded_at": null } },
            )
            .await?;
        Ok(())
    }
}
