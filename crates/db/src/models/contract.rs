use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub factory_id: ObjectId,
    pub farmer_id: ObjectId,
    pub hhm_id: Option<ObjectId>,
    pub crop_type: String,
    pub quantity_tons: f64,
    pub price_per_ton: f64,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub terms: Option<String>,
    #[serde(default)]
    pub status: ContractStatus,
    pub responded_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Pending,
    Active,
    Rejected,
    Completed,
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Active => "active",
            ContractStatus::Rejected => "rejected",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        matches!(
            (self, next),
            (
                ContractStatus::Pending,
                ContractStatus::Active | ContractStatus::Rejected | ContractStatus::Cancelled
            ) | (ContractStatus::Active, ContractStatus::Completed)
        )
    }
}

impl Contract {
    pub const COLLECTION: &'static str = "contracts";
}
