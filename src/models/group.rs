use serde::{Deserialize, Serialize};

use super::coerce;

/// Grupo (collection `groups`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub owner_id: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub admins: Vec<String>,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub members: Vec<String>,
}

impl Group {
    pub fn is_owner(&self, user_id: &str) -> bool {
        !self.owner_id.is_empty() && self.owner_id == user_id
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|id| id == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|id| id == user_id)
    }

    /// Membros, admins ou dono
    pub fn has_access(&self, user_id: &str) -> bool {
        self.is_member(user_id) || self.is_admin(user_id) || self.is_owner(user_id)
    }

    /// Primeiros `limit` membros (limite de ids por consulta `in`)
    pub fn member_window(&self, limit: usize) -> &[String] {
        &self.members[..self.members.len().min(limit)]
    }
}
