use futures::TryStreamExt;
use mongodb::{
    Database, IndexModel,
    error::{Error, ErrorKind},
    options::IndexOptions,
};
use tracing::{info, warn};

use crate::models::{Invitation, InvitationType};

/// MongoDB `NamespaceNotFound`.
const NAMESPACE_NOT_FOUND: i32 = 26;
/// MongoDB `IndexNotFound`.
const INDEX_NOT_FOUND: i32 = 27;

/// Fields that make up the invitation uniqueness pairs.
const INVITATION_PARTY_FIELDS: [&str; 4] = ["worker_id", "schedule_id", "factory_id", "hhm_id"];

pub async fn ensure_indexes(db: &Database) -> Result<(), Error> {
    // Users
    create_indexes(
        db,
        "users",
        vec![
            index_unique(bson::doc! { "username": 1 }),
            index_unique(bson::doc! { "email": 1 }),
            index(bson::doc! { "role": 1, "created_at": -1 }),
        ],
    )
    .await?;

    // Crop listings
    create_indexes(
        db,
        "crop_listings",
        vec![
            index(bson::doc! { "farmer_id": 1, "created_at": -1 }),
            index(bson::doc! { "crop_type": 1, "location": 1 }),
        ],
    )
    .await?;

    // Orders
    create_indexes(
        db,
        "orders",
        vec![
            index(bson::doc! { "farmer_id": 1, "status": 1, "created_at": -1 }),
            index(bson::doc! { "factory_id": 1, "status": 1, "created_at": -1 }),
            index(bson::doc! { "listing_id": 1 }),
        ],
    )
    .await?;

    // Schedules
    create_indexes(
        db,
        "schedules",
        vec![
            index(bson::doc! { "hhm_id": 1, "start_date": -1 }),
            index(bson::doc! { "status": 1, "start_date": 1 }),
        ],
    )
    .await?;

    // Applications
    create_indexes(
        db,
        "applications",
        vec![
            index_unique(bson::doc! { "schedule_id": 1, "worker_id": 1 }),
            index(bson::doc! { "worker_id": 1, "created_at": -1 }),
            index(bson::doc! { "hhm_id": 1, "status": 1 }),
        ],
    )
    .await?;

    // Contracts
    create_indexes(
        db,
        "contracts",
        vec![
            index(bson::doc! { "factory_id": 1, "status": 1, "created_at": -1 }),
            index(bson::doc! { "farmer_id": 1, "status": 1, "created_at": -1 }),
        ],
    )
    .await?;

    // Invitations (lookups; uniqueness is handled by repair_invitation_indexes)
    create_indexes(
        db,
        "invitations",
        vec![
            index(bson::doc! { "worker_id": 1, "status": 1, "created_at": -1 }),
            index(bson::doc! { "hhm_id": 1, "worker_id": 1, "status": 1 }),
            index(bson::doc! { "factory_id": 1, "status": 1, "created_at": -1 }),
            index(bson::doc! { "status": 1, "expires_at": 1 }),
        ],
    )
    .await?;

    repair_invitation_indexes(db).await?;

    info!("All indexes ensured");
    Ok(())
}

/// Replaces any unique index over invitation party fields that is not one
/// of the canonical type-scoped partial indexes, then creates the canonical
/// ones.
///
/// A unique index over e.g. `(factory_id, hhm_id)` without a type-scoped
/// partial filter makes every `hhm-to-worker` invitation (where both are
/// `null`) collide with the next one.
pub async fn repair_invitation_indexes(db: &Database) -> Result<(), Error> {
    let collection = db.collection::<bson::Document>(Invitation::COLLECTION);

    let existing: Vec<IndexModel> = match collection.list_indexes().await {
        Ok(cursor) => cursor.try_collect().await?,
        Err(e) if command_error_code(&e) == Some(NAMESPACE_NOT_FOUND) => Vec::new(),
        Err(e) => return Err(e),
    };

    for model in &existing {
        let Some(name) = model.options.as_ref().and_then(|o| o.name.clone()) else {
            continue;
        };
        if !is_party_uniqueness_index(model) || is_canonical(&name, model) {
            continue;
        }

        warn!(index = %name, "Dropping legacy invitation uniqueness index");
        drop_index_if_exists(db, Invitation::COLLECTION, &name).await?;
    }

    let canonical: Vec<IndexModel> = canonical_invitation_indexes()
        .into_iter()
        .map(|def| {
            IndexModel::builder()
                .keys(def.keys)
                .options(
                    IndexOptions::builder()
                        .name(def.name)
                        .unique(true)
                        .partial_filter_expression(def.filter)
                        .build(),
                )
                .build()
        })
        .collect();

    create_indexes(db, Invitation::COLLECTION, canonical).await
}

struct UniqueIndexDef {
    name: String,
    keys: bson::Document,
    filter: bson::Document,
}

/// One partial unique index per invitation type, plus the one for
/// schedule-less worker invitations.
fn canonical_invitation_indexes() -> Vec<UniqueIndexDef> {
    let mut defs: Vec<UniqueIndexDef> = InvitationType::ALL
        .iter()
        .map(|t| UniqueIndexDef {
            name: t.unique_index_name(),
            keys: t.unique_key_pattern(),
            filter: t.pending_partial_filter(),
        })
        .collect();
    defs.push(UniqueIndexDef {
        name: Invitation::UNSCHEDULED_WORKER_INDEX.to_string(),
        keys: Invitation::unscheduled_worker_key_pattern(),
        filter: Invitation::unscheduled_worker_filter(),
    });
    defs
}

/// Drops an index by name; a missing index is not an error.
pub async fn drop_index_if_exists(
    db: &Database,
    collection: &str,
    name: &str,
) -> Result<bool, Error> {
    match db
        .collection::<bson::Document>(collection)
        .drop_index(name)
        .await
    {
        Ok(()) => {
            info!(collection, index = name, "Index dropped");
            Ok(true)
        }
        Err(e)
            if matches!(
                command_error_code(&e),
                Some(INDEX_NOT_FOUND) | Some(NAMESPACE_NOT_FOUND)
            ) =>
        {
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn command_error_code(err: &Error) -> Option<i32> {
    match *err.kind {
        ErrorKind::Command(ref cmd) => Some(cmd.code),
        _ => None,
    }
}

fn key_fields(model: &IndexModel) -> Vec<&str> {
    model.keys.keys().map(String::as_str).collect()
}

fn is_party_uniqueness_index(model: &IndexModel) -> bool {
    let unique = model
        .options
        .as_ref()
        .and_then(|o| o.unique)
        .unwrap_or(false);
    let fields = key_fields(model);
    unique
        && fields.len() >= 2
        && fields.iter().all(|f| INVITATION_PARTY_FIELDS.contains(f))
}

fn is_canonical(name: &str, model: &IndexModel) -> bool {
    let Some(def) = canonical_invitation_indexes()
        .into_iter()
        .find(|def| def.name == name)
    else {
        return false;
    };

    let expected_keys: Vec<&str> = def.keys.keys().map(String::as_str).collect();
    if key_fields(model) != expected_keys {
        return false;
    }

    let Some(filter) = model
        .options
        .as_ref()
        .and_then(|o| o.partial_filter_expression.as_ref())
    else {
        return false;
    };

    // Operator documents are compared by presence; the server may
    // normalise their contents.
    filter.len() == def.filter.len()
        && def.filter.iter().all(|(field, expected)| match expected {
            bson::Bson::String(value) => filter.get_str(field).ok() == Some(value.as_str()),
            _ => filter.get_document(field).is_ok(),
        })
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
