use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub listing_id: ObjectId,
    pub farmer_id: ObjectId,
    pub factory_id: ObjectId,
    pub crop_type: String,
    pub quantity_tons: f64,
    pub price_per_ton: f64,
    pub total_price: f64,
    pub message: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    pub responded_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Only pending orders move, and only to a terminal state.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (
                OrderStatus::Pending,
                OrderStatus::Accepted | OrderStatus::Rejected | OrderStatus::Cancelled
            )
        )
    }
}

impl Order {
    pub const COLLECTION: &'static str = "orders";
}
