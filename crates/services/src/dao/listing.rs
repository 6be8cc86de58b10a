use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use agrimarket_db::models::{CropListing, ListingAdjustment, default_crop_type};
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};

/// Guarded listing writes retry this many times when a concurrent
/// acceptance changes the quantity between read and write.
const ADJUST_ATTEMPTS: usize = 3;

pub struct ListingDao {
    pub base: BaseDao<CropListing>,
}

pub struct NewListing {
    pub crop_type: Option<String>,
    pub variety: Option<String>,
    pub quantity_tons: f64,
    pub price_per_ton: f64,
    pub location: String,
    pub harvest_date: Option<DateTime>,
    pub description: Option<String>,
}

#[derive(Debug, Default)]
pub struct ListingUpdate {
    pub variety: Option<String>,
    pub quantity_tons: Option<f64>,
    pub price_per_ton: Option<f64>,
    pub location: Option<String>,
    pub harvest_date: Option<DateTime>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ListingFilter {
    pub crop_type: Option<String>,
    pub location: Option<String>,
    pub farmer_id: Option<ObjectId>,
}

impl ListingFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = doc! { "quantity_tons": { "$gt": 0.0 } };
        if let Some(ref crop_type) = self.crop_type {
            filter.insert("crop_type", crop_type.to_lowercase());
        }
        if let Some(ref location) = self.location {
            filter.insert(
                "location",
                doc! { "$regex": escape_regex(location), "$options": "i" },
            );
        }
        if let Some(farmer_id) = self.farmer_id {
            filter.insert("farmer_id", farmer_id);
        }
        filter
    }
}

impl ListingDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, CropListing::COLLECTION),
        }
    }

    pub async fn create(&self, farmer_id: ObjectId, new: NewListing) -> DaoResult<CropListing> {
        validate_quantity(new.quantity_tons)?;
        validate_price(new.price_per_ton)?;

        let now = DateTime::now();
        let listing = CropListing {
            id: None,
            farmer_id,
            crop_type: new
                .crop_type
                .map(|c| c.to_lowercase())
                .unwrap_or_else(default_crop_type),
            variety: new.variety,
            quantity_tons: new.quantity_tons,
            price_per_ton: new.price_per_ton,
            location: new.location,
            harvest_date: new.harvest_date,
            description: new.description,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&listing).await?;
        self.base.find_by_id(id).await
    }

    pub async fn search(
        &self,
        filter: &ListingFilter,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<CropListing>> {
        self.base
            .find_paginated(filter.to_document(), None, params)
            .await
    }

    /// Loads a listing and checks that `farmer_id` owns it.
    pub async fn find_owned(
        &self,
        farmer_id: ObjectId,
        listing_id: ObjectId,
    ) -> DaoResult<CropListing> {
        let listing = self.base.find_by_id(listing_id).await?;
        if listing.farmer_id != farmer_id {
            return Err(DaoError::Forbidden("Not the owner of this listing".to_string()));
        }
        Ok(listing)
    }

    pub async fn update(
        &self,
        farmer_id: ObjectId,
        listing_id: ObjectId,
        update: ListingUpdate,
    ) -> DaoResult<CropListing> {
        self.find_owned(farmer_id, listing_id).await?;

        let mut set = Document::new();
        if let Some(variety) = update.variety {
            set.insert("variety", variety);
        }
        if let Some(quantity) = update.quantity_tons {
            validate_quantity(quantity)?;
            set.insert("quantity_tons", quantity);
        }
        if let Some(price) = update.price_per_ton {
            validate_price(price)?;
            set.insert("price_per_ton", price);
        }
        if let Some(location) = update.location {
            set.insert("location", location);
        }
        if let Some(harvest_date) = update.harvest_date {
            set.insert("harvest_date", harvest_date);
        }
        if let Some(description) = update.description {
            set.insert("description", description);
        }

        if !set.is_empty() {
            self.base
                .update_by_id(listing_id, doc! { "$set": set })
                .await?;
        }
        self.base.find_by_id(listing_id).await
    }

    pub async fn delete(&self, farmer_id: ObjectId, listing_id: ObjectId) -> DaoResult<()> {
        self.find_owned(farmer_id, listing_id).await?;
        self.base.delete_one(doc! { "_id": listing_id }).await?;
        Ok(())
    }

    /// Takes `ordered_tons` off a listing, removing it when nothing is left.
    ///
    /// Each write is filtered on the quantity it was computed from, so a
    /// concurrent acceptance makes it miss and the listing is re-read.
    /// Returns `None` when the listing no longer exists.
    pub async fn apply_order(
        &self,
        listing_id: ObjectId,
        ordered_tons: f64,
    ) -> DaoResult<Option<ListingAdjustment>> {
        for _ in 0..ADJUST_ATTEMPTS {
            let Some(listing) = self.base.find_one(doc! { "_id": listing_id }).await? else {
                return Ok(None);
            };

            let adjustment = ListingAdjustment::for_order(listing.quantity_tons, ordered_tons);
            let applied = match adjustment {
                ListingAdjustment::Remove => {
                    self.base
                        .delete_one(doc! {
                            "_id": listing_id,
                            "quantity_tons": { "$lte": ordered_tons },
                        })
                        .await?
                }
                ListingAdjustment::Decrement { .. } => {
                    self.base
                        .update_one(
                            doc! {
                                "_id": listing_id,
                                "quantity_tons": { "$gt": ordered_tons },
                            },
                            doc! { "$inc": { "quantity_tons": (-ordered_tons) } },
                        )
                        .await?
                }
            };

            if applied {
                debug!(%listing_id, ?adjustment, "Listing adjusted for order");
                return Ok(Some(adjustment));
            }
        }

        Err(DaoError::Conflict(
            "Listing quantity changed concurrently, try again".to_string(),
        ))
    }
}

fn validate_quantity(quantity: f64) -> DaoResult<()> {
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(DaoError::Validation(
            "quantity_tons must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: f64) -> DaoResult<()> {
    if !(price.is_finite() && price > 0.0) {
        return Err(DaoError::Validation(
            "price_per_ton must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
