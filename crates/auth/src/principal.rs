use serde::{Deserialize, Deserializer, Serialize};

use hospital_rbac_core::{RoleId, UserId};

use crate::Role;

/// Identity of the signed-in user, as returned by login and `/auth/me`.
///
/// `role_name` is the one canonical role field. Older payloads that sent the
/// role under `roles` are accepted on input; output always uses `role_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(alias = "user_id")]
    pub id: UserId,

    pub username: String,

    #[serde(alias = "roles", default, deserialize_with = "role_or_empty")]
    pub role_name: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<RoleId>,
}

impl UserIdentity {
    pub fn new(id: UserId, username: impl Into<String>, role_name: Role) -> Self {
        Self {
            id,
            username: username.into(),
            role_name,
            role_id: None,
        }
    }

    pub fn role(&self) -> &Role {
        &self.role_name
    }

    pub fn is_admin(&self) -> bool {
        self.role_name == Role::ADMIN
    }
}

// A user without a role comes back as `"role_name": null` from the LEFT JOIN.
fn role_or_empty<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Role>::deserialize(deserializer)?.unwrap_or_default())
}
