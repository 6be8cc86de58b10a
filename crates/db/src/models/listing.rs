use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropListing {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub farmer_id: ObjectId,
    #[serde(default = "default_crop_type")]
    pub crop_type: String,
    pub variety: Option<String>,
    pub quantity_tons: f64,
    pub price_per_ton: f64,
    pub location: String,
    pub harvest_date: Option<DateTime>,
    pub description: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

pub fn default_crop_type() -> String {
    "sugarcane".to_string()
}

/// What happens to a listing when an order against it is accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListingAdjustment {
    /// The order takes everything that is left.
    Remove,
    /// The listing keeps the given remaining quantity.
    Decrement { remaining: f64 },
}

impl ListingAdjustment {
    pub fn for_order(listed_tons: f64, ordered_tons: f64) -> Self {
        if ordered_tons >= listed_tons {
            ListingAdjustment::Remove
        } else {
            ListingAdjustment::Decrement {
                remaining: listed_tons - ordered_tons,
            }
        }
    }
}

impl CropListing {
    pub const COLLECTION: &'static str = "crop_listings";
}
