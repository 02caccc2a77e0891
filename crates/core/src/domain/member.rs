use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Position in the guild role hierarchy; higher outranks lower.
    pub position: i32,
}

impl Role {
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub is_owner: bool,
}

impl Member {
    pub fn top_role_position(&self) -> i32 {
        self.roles.iter().map(|role| role.position).max().unwrap_or(0)
    }

    /// Whether this member may act on `other` in the role hierarchy.
    pub fn outranks(&self, other: &Member) -> bool {
        if other.is_owner {
            return false;
        }
        self.is_owner || self.top_role_position() > other.top_role_position()
    }

    pub fn can_manage_role(&self, role: &Role) -> bool {
        self.is_owner || self.top_role_position() > role.position
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id.0)
    }
}
