use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use std::fmt;

/// Nomes das collections
pub mod collections {
    pub const USERS: &str = "users";
    pub const GROUPS: &str = "groups";
    pub const TASKS: &str = "tasks";
    pub const ACTIVITIES: &str = "activities";
    pub const SHOP_ITEMS: &str = "shopItems";
}

#[derive(Debug)]
pub enum StoreError {
    Backend(String),
    Decode(String),
    Encode(String),
    Missing { collection: String, id: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "Database error: {}", msg),
            StoreError::Decode(msg) => write!(f, "Failed to decode document: {}", msg),
            StoreError::Encode(msg) => write!(f, "Failed to encode document: {}", msg),
            StoreError::Missing { collection, id } => {
                write!(f, "Document {}/{} does not exist", collection, id)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        StoreError::Encode(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Bson),
    Gte(String, Bson),
    In(String, Vec<Bson>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Consulta por igualdade/intervalo com ordenação opcional por um campo.
/// Empates na ordenação preservam a ordem de armazenamento.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub conditions: Vec<Condition>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            conditions: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn where_gte(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.conditions.push(Condition::Gte(field.to_string(), value.into()));
        self
    }

    pub fn where_in(mut self, field: &str, values: Vec<Bson>) -> Self {
        self.conditions.push(Condition::In(field.to_string(), values));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(String, Bson),
    /// Adiciona ao array se ainda não existir
    ArrayUnion(String, Bson),
    ArrayRemove(String, Bson),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Delete {
        collection: String,
        id: String,
    },
    Update {
        collection: String,
        id: String,
        updates: Vec<FieldUpdate>,
    },
}

impl WriteOp {
    pub fn delete(collection: &str, id: &str) -> Self {
        WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn update(collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Self {
        WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            updates,
        }
    }
}

/// Acesso ao banco de documentos. Documentos são identificados pelo campo
/// `_id` (string).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Insere o documento, gerando `_id` quando ausente. Retorna o id.
    async fn insert(&self, collection: &str, document: Document) -> Result<String, StoreError>;

    /// Falha com `StoreError::Missing` se o documento não existir
    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<(), StoreError>;

    /// Aplica todas as operações atomicamente
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}
