use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer: Option<FarmerProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<FactoryProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hhm: Option<HhmProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labour: Option<LabourProfile>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Farmer,
    Factory,
    Hhm,
    Labour,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Farmer, Role::Factory, Role::Hhm, Role::Labour];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Factory => "factory",
            Role::Hhm => "hhm",
            Role::Labour => "labour",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(Role::Farmer),
            "factory" => Ok(Role::Factory),
            "hhm" => Ok(Role::Hhm),
            // The frontend historically sent both spellings.
            "labour" | "worker" => Ok(Role::Labour),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FarmerProfile {
    pub farm_location: Option<String>,
    pub farm_size_acres: Option<f64>,
    #[serde(default)]
    pub crop_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FactoryProfile {
    pub factory_name: Option<String>,
    pub location: Option<String>,
    pub capacity_tons_per_day: Option<f64>,
    #[serde(default)]
    pub associated_hhms: Vec<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HhmProfile {
    pub service_area: Option<String>,
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub associated_factories: Vec<ObjectId>,
    #[serde(default)]
    pub workers: Vec<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabourProfile {
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience_years: Option<u32>,
    pub expected_daily_wage: Option<f64>,
    #[serde(default = "bool_true")]
    pub is_available: bool,
    pub hhm_id: Option<ObjectId>,
}

impl Default for LabourProfile {
    fn default() -> Self {
        Self {
            skills: Vec::new(),
            experience_years: None,
            expected_daily_wage: None,
            is_available: true,
            hhm_id: None,
        }
    }
}

/// Profile payload supplied at registration, matched against the chosen role.
#[derive(Debug, Clone, Default)]
pub struct RoleProfile {
    pub farmer: Option<FarmerProfile>,
    pub factory: Option<FactoryProfile>,
    pub hhm: Option<HhmProfile>,
    pub labour: Option<LabourProfile>,
}

impl RoleProfile {
    /// Keeps only the profile matching `role`, defaulting it when absent.
    pub fn for_role(self, role: Role) -> RoleProfile {
        match role {
            Role::Farmer => RoleProfile {
                farmer: Some(self.farmer.unwrap_or_default()),
                ..Default::default()
            },
            Role::Factory => RoleProfile {
                factory: Some(self.factory.unwrap_or_default()),
                ..Default::default()
            },
            Role::Hhm => RoleProfile {
                hhm: Some(self.hhm.unwrap_or_default()),
                ..Default::default()
            },
            Role::Labour => RoleProfile {
                labour: Some(self.labour.unwrap_or_default()),
                ..Default::default()
            },
        }
    }
}

fn bool_true() -> bool {
    true
}

impl User {
    pub const COLLECTION: &'static str = "users";
}
