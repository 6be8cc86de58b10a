pub mod analytics;
pub mod application;
pub mod auth;
pub mod contract;
pub mod invitation;
pub mod listing;
pub mod order;
pub mod profile;
pub mod public;
pub mod schedule;

use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Date accepted in request bodies: RFC 3339 timestamp or plain `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl DateInput {
    pub fn to_bson(self) -> bson::DateTime {
        let utc = match self {
            DateInput::DateTime(dt) => dt,
            DateInput::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        };
        bson::DateTime::from_chrono(utc)
    }
}

/// Whether a party accepts or rejects a pending request.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub action: Decision,
    pub message: Option<String>,
}

pub(crate) fn rfc3339(dt: bson::DateTime) -> String {
    dt.to_chrono().to_rfc3339()
}

pub(crate) fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

pub(crate) fn hex_all(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}
