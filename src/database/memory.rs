use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use uuid::Uuid;

use super::store::{Condition, Direction, DocumentStore, FieldUpdate, Query, StoreError, WriteOp};

/// Banco de documentos em memória (`DATABASE_URL=memory://`).
/// Cada collection guarda os documentos na ordem de inserção.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    commit_sizes: RwLock<Vec<usize>>,
    failing: RwLock<HashSet<String>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

fn document_id(document: &Document) -> Option<&str> {
    document.get_str("_id").ok()
}

fn field<'a>(document: &'a Document, name: &str) -> &'a Bson {
    static NULL: Bson = Bson::Null;
    document.get(name).unwrap_or(&NULL)
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Comparação entre valores do mesmo tipo; tipos diferentes não se comparam
fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn equals(a: &Bson, b: &Bson) -> bool {
    compare(a, b) == Some(Ordering::Equal) || a == b
}

/// Valores ausentes ordenam antes de qualquer valor presente
fn sort_key_cmp(a: &Bson, b: &Bson) -> Ordering {
    match (a, b) {
        (Bson::Null, Bson::Null) => Ordering::Equal,
        (Bson::Null, _) => Ordering::Less,
        (_, Bson::Null) => Ordering::Greater,
        _ => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

fn matches(document: &Document, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(name, value) => equals(field(document, name), value),
        Condition::Gte(name, value) => matches!(
            compare(field(document, name), value),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        Condition::In(name, values) => {
            let current = field(document, name);
            values.iter().any(|v| equals(current, v))
        }
    }
}

fn apply_updates(document: &mut Document, updates: &[FieldUpdate]) {
    for update in updates {
        match update {
            FieldUpdate::Set(name, value) => {
                document.insert(name.clone(), value.clone());
            }
            FieldUpdate::ArrayUnion(name, value) => {
                let mut items = match document.get(name) {
                    Some(Bson::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                if !items.iter().any(|item| equals(item, value)) {
                    items.push(value.clone());
                }
                document.insert(name.clone(), Bson::Array(items));
            }
            FieldUpdate::ArrayRemove(name, value) => {
                let items: Vec<Bson> = match document.get(name) {
                    Some(Bson::Array(items)) => items.iter().filter(|item| !equals(item, value)).cloned().collect(),
                    _ => Vec::new(),
                };
                document.insert(name.clone(), Bson::Array(items));
            }
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tamanho de cada batch confirmado por `commit`, em ordem
    pub fn commit_sizes(&self) -> Vec<usize> {
        self.commit_sizes.read().map(|sizes| sizes.clone()).unwrap_or_default()
    }

    /// Faz toda consulta à collection falhar (simulação de falha remota)
    #[cfg(test)]
    pub fn fail_queries_on(&self, collection: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(collection.to_string());
        }
    }

    fn check_available(&self, collection: &str) -> Result<(), StoreError> {
        let failing = self.failing.read().map_err(poisoned)?;
        if failing.contains(collection) {
            return Err(StoreError::Backend(format!("collection {} is unavailable", collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_available(collection)?;
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| document_id(d) == Some(id)))
            .cloned())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check_available(&query.collection)?;
        let collections = self.collections.read().map_err(poisoned)?;

        let mut results: Vec<Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| query.conditions.iter().all(|c| matches(d, c)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // sort_by é estável: empates mantêm a ordem de armazenamento
        if let Some((name, direction)) = &query.order_by {
            results.sort_by(|a, b| {
                let ordering = sort_key_cmp(field(a, name), field(b, name));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    async fn insert(&self, collection: &str, mut document: Document) -> Result<String, StoreError> {
        let id = match document_id(&document) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().simple().to_string();
                document.insert("_id", id.clone());
                id
            }
        };

        let mut collections = self.collections.write().map_err(poisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();
        docs.retain(|d| document_id(d) != Some(id.as_str()));
        docs.push(document);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| document_id(d) == Some(id)))
            .ok_or_else(|| StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        apply_updates(document, &updates);
        Ok(())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(poisoned)?;

        // Valida antes de aplicar: o batch é tudo ou nada
        for op in &ops {
            if let WriteOp::Update { collection, id, .. } = op {
                let exists = collections
                    .get(collection)
                    .map(|docs| docs.iter().any(|d| document_id(d) == Some(id.as_str())))
                    .unwrap_or(false);
                if !exists {
                    return Err(StoreError::Missing {
                        collection: collection.clone(),
                        id: id.clone(),
                    });
                }
            }
        }

        let size = ops.len();
        for op in ops {
            match op {
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(&collection) {
                        docs.retain(|d| document_id(d) != Some(id.as_str()));
                    }
                }
                WriteOp::Update { collection, id, updates } => {
                    if let Some(document) = collections
                        .get_mut(&collection)
                        .and_then(|docs| docs.iter_mut().find(|d| document_id(d) == Some(id.as_str())))
                    {
                        apply_updates(document, &updates);
                    }
                }
            }
        }

        self.commit_sizes.write().map_err(poisoned)?.push(size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, points) in [("a", 10), ("b", 30), ("c", 10), ("d", 20)] {
            store
                .insert("users", doc! { "_id": id, "points": points })
                .await
                .unwrap();
        }
        store
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.get_str("_id").unwrap()).collect()
    }

    #[tokio::test]
    async fn test_descending_order_keeps_stored_order_on_ties() {
        let store = seeded().await;
        let query = Query::collection("users").order_by("points", Direction::Descending);
        let docs = store.query(&query).await.unwrap();
        assert_eq!(ids(&docs), vec!["b", "d", "a", "c"]);
    }

    #[tokio::test]
    async fn test_filters_and_limit() {
        let store = seeded().await;
        let query = Query::collection("users")
            .where_in("_id", vec!["a".into(), "b".into(), "c".into()])
            .where_gte("points", 10_i64)
            .order_by("points", Direction::Ascending)
            .limit(2);
        let docs = store.query(&query).await.unwrap();
        assert_eq!(ids(&docs), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_insert_generates_id() {
        let store = MemoryStore::new();
        let id = store.insert("activities", doc! { "details": "x" }).await.unwrap();
        let stored = store.get("activities", &id).await.unwrap().unwrap();
        assert_eq!(stored.get_str("_id").unwrap(), id);
    }

    #[tokio::test]
    async fn test_array_union_is_idempotent() {
        let store = MemoryStore::new();
        store.insert("groups", doc! { "_id": "g", "members": ["a"] }).await.unwrap();
        for _ in 0..2 {
            store
                .update("groups", "g", vec![FieldUpdate::ArrayUnion("members".into(), "b".into())])
                .await
                .unwrap();
        }
        store
            .update("groups", "g", vec![FieldUpdate::ArrayRemove("members".into(), "a".into())])
            .await
            .unwrap();
        let group = store.get("groups", "g").await.unwrap().unwrap();
        assert_eq!(group.get_array("members").unwrap(), &vec![Bson::String("b".into())]);
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryStore::new();
        let result = store
            .update("groups", "nope", vec![FieldUpdate::Set("name".into(), "x".into())])
            .await;
        assert!(matches!(result, Err(StoreError::Missing { .. })));
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = seeded().await;
        let ops = vec![
            WriteOp::delete("users", "a"),
            WriteOp::update("users", "ghost", vec![FieldUpdate::Set("points".into(), 1.into())]),
        ];
        assert!(store.commit(ops).await.is_err());
        assert!(store.get("users", "a").await.unwrap().is_some());
        assert!(store.commit_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_failing_collection() {
        let store = seeded().await;
        store.fail_queries_on("users");
        assert!(store.query(&Query::collection("users")).await.is_err());
    }
}
