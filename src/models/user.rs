use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use super::coerce;

/// Usuário (collection `users`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub email: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "coerce::lenient_integer")]
    pub points: i64,

    #[serde(default)]
    pub active_group_id: Option<String>,

    #[serde(default, deserialize_with = "coerce::lenient_datetime")]
    pub last_login: Option<BsonDateTime>,

    #[serde(default, deserialize_with = "coerce::lenient_datetime")]
    pub created_at: Option<BsonDateTime>,

    /// Apenas contas locais (email/senha)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl User {
    /// Grupo ativo, ignorando string vazia
    pub fn active_group(&self) -> Option<&str> {
        self.active_group_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc, Bson};

    #[test]
    fn test_missing_and_null_fields_get_defaults() {
        let user: User = bson::from_document(doc! {
            "_id": "u1",
            "name": Bson::Null,
            "points": 12.6,
            "activeGroupId": Bson::Null,
        })
        .unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "");
        assert_eq!(user.email, "");
        assert_eq!(user.points, 13);
        assert_eq!(user.active_group(), None);
        assert!(user.last_login.is_none());
    }

    #[test]
    fn test_empty_active_group_is_none() {
        let user: User = bson::from_document(doc! { "_id": "u1", "activeGroupId": "" }).unwrap();
        assert_eq!(user.active_group(), None);
    }

    #[test]
    fn test_serializes_camel_case_without_password() {
        let user = User {
            id: "u1".into(),
            email: "a@b.c".into(),
            name: "Ana".into(),
            points: 5,
            active_group_id: Some("g1".into()),
            last_login: None,
            created_at: None,
            password_hash: None,
        };
        let document = bson::to_document(&user).unwrap();
        assert_eq!(document.get_str("activeGroupId").unwrap(), "g1");
        assert!(!document.contains_key("passwordHash"));
    }
}
