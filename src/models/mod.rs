use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Role of the acting user, resolved by the caller layer (authentication is
/// not this crate's concern — the role arrives already established).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    WarehouseManager,
    WarehouseStaff,
}

impl Role {
    /// Approval and cancellation of documents is a manager/admin action.
    pub fn can_approve(&self) -> bool {
        matches!(self, Role::Admin | Role::WarehouseManager)
    }
}

/// The acting user, as supplied by the caller on every mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}
