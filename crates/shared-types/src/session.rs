//! The authenticated caller, passed explicitly into every persisting operation

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    Client,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    /// Set for client users; the client they belong to
    pub client_id: Option<Uuid>,
}

impl SessionContext {
    pub fn staff(email: impl Into<String>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: email.into(),
            role: Role::Staff,
            client_id: None,
        }
    }

    pub fn client(email: impl Into<String>, client_id: Uuid) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: email.into(),
            role: Role::Client,
            client_id: Some(client_id),
        }
    }

    /// Admins and staff write documents; clients only sign.
    pub fn can_author(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Staff)
    }
}
