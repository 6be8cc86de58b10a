use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub hhm_id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub required_workers: u32,
    pub wage_per_day: f64,
    #[serde(default)]
    pub assigned_workers: Vec<ObjectId>,
    #[serde(default)]
    pub status: ScheduleStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    #[default]
    Open,
    Filled,
    Closed,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Open => "open",
            ScheduleStatus::Filled => "filled",
            ScheduleStatus::Closed => "closed",
        }
    }
}

impl Schedule {
    pub const COLLECTION: &'static str = "schedules";

    pub fn is_full(&self) -> bool {
        self.assigned_workers.len() as u32 >= self.required_workers
    }
}
