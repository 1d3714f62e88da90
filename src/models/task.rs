use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use super::coerce;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    /// Status desconhecido: conta apenas no total
    Other(String),
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Other(String::new())
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => TaskStatus::Pending,
            "in-progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => "pending".to_string(),
            TaskStatus::InProgress => "in-progress".to_string(),
            TaskStatus::Completed => "completed".to_string(),
            TaskStatus::Other(value) => value,
        }
    }
}

/// Tarefa (collection `tasks`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub title: String,

    /// Id do usuário responsável
    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub assignee: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub assignee_name: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub group_id: String,

    #[serde(default, deserialize_with = "coerce::null_as_default")]
    pub status: TaskStatus,

    /// `YYYY-MM-DD`
    #[serde(default)]
    pub due_date: Option<String>,

    #[serde(default, deserialize_with = "coerce::lenient_integer")]
    pub points: i64,

    #[serde(default, deserialize_with = "coerce::lenient_datetime")]
    pub created_at: Option<BsonDateTime>,

    #[serde(default, deserialize_with = "coerce::lenient_datetime")]
    pub completed_at: Option<BsonDateTime>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
