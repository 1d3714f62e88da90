pub mod batch;
pub mod memory;
pub mod repository;
pub mod store;

pub use batch::*;
pub use memory::MemoryStore;
pub use store::*;

use async_trait::async_trait;
use futures::stream::StreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::{Client, ClientSession, Collection, Database};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, StoreError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("tasktrek");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { client, db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes used by the dashboard and cascade queries
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let indexes: [(&str, Document); 7] = [
            (collections::USERS, doc! { "points": -1 }),
            (collections::USERS, doc! { "email": 1 }),
            (collections::USERS, doc! { "activeGroupId": 1 }),
            (collections::TASKS, doc! { "assignee": 1, "groupId": 1 }),
            (collections::TASKS, doc! { "groupId": 1, "createdAt": 1 }),
            (collections::TASKS, doc! { "assigneeName": 1, "createdAt": -1 }),
            (collections::ACTIVITIES, doc! { "groupId": 1, "createdAt": -1 }),
        ];

        for (collection, keys) in indexes {
            let index = IndexModel::builder().keys(keys.clone()).build();
            match self.collection::<Document>(collection).create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}({:?})", collection, keys.keys().collect::<Vec<_>>()),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn apply_in_session(&self, session: &mut ClientSession, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        for op in ops {
            match op {
                WriteOp::Delete { collection, id } => {
                    self.collection::<Document>(&collection)
                        .delete_one(doc! { "_id": &id })
                        .session(&mut *session)
                        .await?;
                }
                WriteOp::Update { collection, id, updates } => {
                    let result = self
                        .collection::<Document>(&collection)
                        .update_one(doc! { "_id": &id }, update_document(&updates))
                        .session(&mut *session)
                        .await?;
                    if result.matched_count == 0 {
                        return Err(StoreError::Missing { collection, id });
                    }
                }
            }
        }
        Ok(())
    }
}

fn filter_document(conditions: &[Condition]) -> Document {
    let clauses: Vec<Document> = conditions
        .iter()
        .map(|condition| match condition {
            Condition::Eq(field, value) => doc! { field.as_str(): value.clone() },
            Condition::Gte(field, value) => doc! { field.as_str(): { "$gte": value.clone() } },
            Condition::In(field, values) => doc! { field.as_str(): { "$in": values.clone() } },
        })
        .collect();

    match clauses.len() {
        0 => Document::new(),
        1 => clauses.into_iter().next().unwrap_or_default(),
        _ => doc! { "$and": clauses },
    }
}

/// Ordenação e limite da consulta
fn find_options(query: &Query) -> FindOptions {
    let mut options = FindOptions::default();
    if let Some((field, direction)) = &query.order_by {
        let order = match direction {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        };
        options.sort = Some(doc! { field.as_str(): order });
    }
    options.limit = query.limit.map(|limit| limit as i64);
    options
}

fn update_document(updates: &[FieldUpdate]) -> Document {
    let mut set = Document::new();
    let mut add_to_set = Document::new();
    let mut pull = Document::new();

    for update in updates {
        match update {
            FieldUpdate::Set(field, value) => {
                set.insert(field.clone(), value.clone());
            }
            FieldUpdate::ArrayUnion(field, value) => {
                add_to_set.insert(field.clone(), value.clone());
            }
            FieldUpdate::ArrayRemove(field, value) => {
                pull.insert(field.clone(), value.clone());
            }
        }
    }

    let mut update = Document::new();
    for (operator, fields) in [("$set", set), ("$addToSet", add_to_set), ("$pull", pull)] {
        if !fields.is_empty() {
            update.insert(operator, fields);
        }
    }
    update
}

#[async_trait]
impl DocumentStore for MongoDB {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.collection::<Document>(collection).find_one(doc! { "_id": id }).await?)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collection = self.collection::<Document>(&query.collection);
        let find = collection
            .find(filter_document(&query.conditions))
            .with_options(find_options(query));

        let mut cursor = find.await?;
        let mut documents = Vec::new();
        while let Some(result) = cursor.next().await {
            documents.push(result?);
        }
        Ok(documents)
    }

    async fn insert(&self, collection: &str, mut document: Document) -> Result<String, StoreError> {
        let id = match document.get("_id") {
            Some(Bson::String(id)) => id.clone(),
            _ => {
                let id = Uuid::new_v4().simple().to_string();
                document.insert("_id", id.clone());
                id
            }
        };
        self.collection::<Document>(collection).insert_one(document).await?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<(), StoreError> {
        let result = self
            .collection::<Document>(collection)
            .update_one(doc! { "_id": id }, update_document(&updates))
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Executa o batch numa transação (requer replica set)
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.apply_in_session(&mut session, ops).await {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    log::error!("❌ Failed to abort transaction: {}", abort_err);
                }
                Err(e)
            }
        }
    }
}

/// Abre o banco configurado em `DATABASE_URL` (`memory://` usa o banco em memória)
pub async fn connect(database_url: &str) -> Result<Arc<dyn DocumentStore>, StoreError> {
    if database_url.starts_with("memory://") {
        log::warn!("⚠️  Using in-memory document store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = MongoDB::new(database_url).await?;
    log::info!("✅ MongoDB connected successfully: {}", db.database().name());
    Ok(Arc::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_condition_filter() {
        let filter = filter_document(&[Condition::Eq("groupId".into(), "g1".into())]);
        assert_eq!(filter, doc! { "groupId": "g1" });
    }

    #[test]
    fn test_multiple_conditions_are_combined_with_and() {
        let filter = filter_document(&[
            Condition::Eq("groupId".into(), "g1".into()),
            Condition::In("_id".into(), vec!["a".into(), "b".into()]),
        ]);
        assert_eq!(
            filter,
            doc! { "$and": [ { "groupId": "g1" }, { "_id": { "$in": ["a", "b"] } } ] }
        );
    }

    #[test]
    fn test_update_document_groups_operators() {
        let update = update_document(&[
            FieldUpdate::Set("activeGroupId".into(), Bson::Null),
            FieldUpdate::ArrayUnion("admins".into(), "u1".into()),
        ]);
        assert_eq!(
            update,
            doc! { "$set": { "activeGroupId": Bson::Null }, "$addToSet": { "admins": "u1" } }
        );
    }

    #[test]
    fn test_find_options_carry_sort_and_limit() {
        let query = Query::collection(collections::USERS)
            .order_by("points", Direction::Descending)
            .limit(30);
        let options = find_options(&query);
        assert_eq!(options.sort, Some(doc! { "points": -1 }));
        assert_eq!(options.limit, Some(30));

        let plain = find_options(&Query::collection(collections::USERS));
        assert!(plain.sort.is_none());
        assert!(plain.limit.is_none());
    }

    #[tokio::test]
    async fn test_find_builds_without_a_server() {
        // Client sem I/O até a primeira operação
        let client = Client::with_uri_str("mongodb://localhost:27017").await.unwrap();
        let collection = client.database("tasktrek").collection::<Document>(collections::TASKS);
        let query = Query::collection(collections::TASKS)
            .where_eq("groupId", "g1")
            .order_by("createdAt", Direction::Ascending)
            .limit(5);
        let _find = collection
            .find(filter_document(&query.conditions))
            .with_options(find_options(&query));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/tasktrek".to_string());
        assert!(MongoDB::new(&uri).await.is_ok());
    }
}
