//! Leitura tipada dos documentos. Toda leitura passa pelos schemas de
//! `crate::models`, que aplicam defaults para campos ausentes ou nulos.

use mongodb::bson::{self, Bson, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::store::{collections, DocumentStore, Query, StoreError};
use crate::models::{Group, User};

pub fn decode<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(bson::from_document(document)?)
}

pub fn encode<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    Ok(bson::to_document(value)?)
}

pub async fn find_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<T>, StoreError> {
    store.get(collection, id).await?.map(decode::<T>).transpose()
}

pub async fn query_as<T: DeserializeOwned>(store: &dyn DocumentStore, query: &Query) -> Result<Vec<T>, StoreError> {
    store.query(query).await?.into_iter().map(decode::<T>).collect()
}

pub async fn find_user(store: &dyn DocumentStore, id: &str) -> Result<Option<User>, StoreError> {
    find_as(store, collections::USERS, id).await
}

pub async fn find_group(store: &dyn DocumentStore, id: &str) -> Result<Option<Group>, StoreError> {
    find_as(store, collections::GROUPS, id).await
}

/// Emails são comparados após trim + lowercase
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn find_user_by_email(store: &dyn DocumentStore, email: &str) -> Result<Option<User>, StoreError> {
    let query = Query::collection(collections::USERS)
        .where_eq("email", normalize_email(email))
        .limit(1);
    Ok(query_as::<User>(store, &query).await?.into_iter().next())
}

pub fn ids_to_bson(ids: &[String]) -> Vec<Bson> {
    ids.iter().map(|id| Bson::String(id.clone())).collect()
}

/// Ids dos documentos de `collection` cujo `field` é igual a `value`
pub async fn ids_where_eq(
    store: &dyn DocumentStore,
    collection: &str,
    field: &str,
    value: &str,
) -> Result<Vec<String>, StoreError> {
    let documents = store.query(&Query::collection(collection).where_eq(field, value)).await?;
    Ok(string_ids(collection, &documents))
}

/// `_id` em string; ids de outro tipo (ex.: ObjectId) ficam de fora com aviso
fn string_ids(collection: &str, documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .filter_map(|d| match d.get("_id") {
            Some(Bson::String(id)) => Some(id.clone()),
            other => {
                log::warn!("⚠️  Skipping document in {} with non-string _id: {:?}", collection, other);
                None
            }
        })
        .collect()
}
