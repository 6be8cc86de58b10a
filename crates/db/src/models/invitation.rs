use bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

use super::user::Role;

/// A relationship request between two role-typed parties.
///
/// Only the references relevant to `invitation_type` are populated; the
/// others are stored as explicit `null`s, which is why the uniqueness
/// indexes guard every key with `$type: "objectId"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub invitation_type: InvitationType,
    pub worker_id: Option<ObjectId>,
    pub hhm_id: Option<ObjectId>,
    pub factory_id: Option<ObjectId>,
    pub schedule_id: Option<ObjectId>,
    #[serde(default)]
    pub status: InvitationStatus,
    pub personal_message: Option<String>,
    pub offered_wage: Option<f64>,
    #[serde(default)]
    pub priority: InvitationPriority,
    pub expires_at: DateTime,
    pub response_message: Option<String>,
    pub responded_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum InvitationType {
    HhmToWorker,
    FactoryToHhm,
    HhmToFactory,
}

impl InvitationType {
    pub const ALL: [InvitationType; 3] = [
        InvitationType::HhmToWorker,
        InvitationType::FactoryToHhm,
        InvitationType::HhmToFactory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationType::HhmToWorker => "hhm-to-worker",
            InvitationType::FactoryToHhm => "factory-to-hhm",
            InvitationType::HhmToFactory => "hhm-to-factory",
        }
    }

    pub fn sender_role(&self) -> Role {
        match self {
            InvitationType::HhmToWorker | InvitationType::HhmToFactory => Role::Hhm,
            InvitationType::FactoryToHhm => Role::Factory,
        }
    }

    pub fn recipient_role(&self) -> Role {
        match self {
            InvitationType::HhmToWorker => Role::Labour,
            InvitationType::FactoryToHhm => Role::Hhm,
            InvitationType::HhmToFactory => Role::Factory,
        }
    }

    /// Document field holding the id of a party with the given role.
    pub fn field_for(role: Role) -> &'static str {
        match role {
            Role::Labour => "worker_id",
            Role::Hhm => "hhm_id",
            Role::Factory => "factory_id",
            Role::Farmer => "farmer_id",
        }
    }

    pub fn sender_field(&self) -> &'static str {
        Self::field_for(self.sender_role())
    }

    pub fn recipient_field(&self) -> &'static str {
        Self::field_for(self.recipient_role())
    }

    /// Key pair that must be unique among pending invitations of this type.
    pub fn unique_keys(&self) -> (&'static str, &'static str) {
        match self {
            InvitationType::HhmToWorker => ("worker_id", "schedule_id"),
            InvitationType::FactoryToHhm => ("factory_id", "hhm_id"),
            InvitationType::HhmToFactory => ("hhm_id", "factory_id"),
        }
    }

    pub fn unique_index_name(&self) -> String {
        format!("uniq_pending_{}", self.as_str().replace('-', "_"))
    }

    /// `partialFilterExpression` restricting uniqueness to pending
    /// invitations of this type whose key references are both set.
    pub fn pending_partial_filter(&self) -> Document {
        let (first, second) = self.unique_keys();
        let mut filter = doc! {
            "invitation_type": self.as_str(),
            "status": InvitationStatus::Pending.as_str(),
        };
        filter.insert(first, doc! { "$type": "objectId" });
        filter.insert(second, doc! { "$type": "objectId" });
        filter
    }

    /// Index key pattern matching `unique_keys`.
    pub fn unique_key_pattern(&self) -> Document {
        let (first, second) = self.unique_keys();
        let mut keys = Document::new();
        keys.insert(first, 1);
        keys.insert(second, 1);
        keys
    }

    /// Types a user with `role` can send.
    pub fn sendable_by(role: Role) -> Vec<InvitationType> {
        Self::ALL
            .into_iter()
            .filter(|t| t.sender_role() == role)
            .collect()
    }

    /// Types a user with `role` can receive.
    pub fn receivable_by(role: Role) -> Vec<InvitationType> {
        Self::ALL
            .into_iter()
            .filter(|t| t.recipient_role() == role)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
            InvitationStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl Invitation {
    pub const COLLECTION: &'static str = "invitations";

    /// Unique index over pending `hhm-to-worker` invitations that name no
    /// schedule. The per-type index only covers scheduled ones.
    pub const UNSCHEDULED_WORKER_INDEX: &'static str = "uniq_pending_hhm_to_worker_unscheduled";

    pub fn unscheduled_worker_key_pattern() -> Document {
        doc! { "hhm_id": 1, "worker_id": 1 }
    }

    pub fn unscheduled_worker_filter() -> Document {
        doc! {
            "invitation_type": InvitationType::HhmToWorker.as_str(),
            "status": InvitationStatus::Pending.as_str(),
            "schedule_id": { "$type": "null" },
            "hhm_id": { "$type": "objectId" },
            "worker_id": { "$type": "objectId" },
        }
    }

    pub fn sender_id(&self) -> Option<ObjectId> {
        self.party_id(self.invitation_type.sender_role())
    }

    pub fn recipient_id(&self) -> Option<ObjectId> {
        self.party_id(self.invitation_type.recipient_role())
    }

    fn party_id(&self, role: Role) -> Option<ObjectId> {
        match role {
            Role::Labour => self.worker_id,
            Role::Hhm => self.hhm_id,
            Role::Factory => self.factory_id,
            Role::Farmer => None,
        }
    }

    pub fn is_overdue(&self, now: DateTime) -> bool {
        self.status == InvitationStatus::Pending && self.expires_at <= now
    }
}
