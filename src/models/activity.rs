use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use super::coerce;

pub const ACTIVITY_MEMBER_INVITED: &str = "member-invited";

/// Registro do feed de atividades (collection `activities`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub group_id: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub user_name: String,

    #[serde(rename = "type", default, deserialize_with = "coerce::null_as_default")]
    pub kind: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub details: String,

    #[serde(default, deserialize_with = "coerce::lenient_datetime")]
    pub created_at: Option<BsonDateTime>,
}
