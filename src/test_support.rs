//! Fixtures compartilhadas pelos testes de services e endpoints.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::{doc, Bson, Document};
use std::sync::Mutex;

use crate::database::{collections, DocumentStore, MemoryStore};
use crate::services::text_generation::{GenerationError, TextGenerator};
use crate::utils::utc_to_bson;

/// Quarta-feira, 2026-10-21 15:00 UTC
pub fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 21, 15, 0, 0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> Bson {
    Bson::DateTime(utc_to_bson(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()))
}

pub fn user(id: &str, name: &str, points: i64) -> Document {
    doc! { "_id": id, "name": name, "email": format!("{}@example.com", id), "points": points }
}

pub fn group(id: &str, owner: &str, admins: &[&str], members: &[&str]) -> Document {
    doc! {
        "_id": id,
        "name": format!("Group {}", id),
        "ownerId": owner,
        "admins": admins.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        "members": members.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
    }
}

pub fn task(id: &str, group_id: &str, assignee: &str, status: &str) -> Document {
    doc! {
        "_id": id,
        "title": format!("Task {}", id),
        "groupId": group_id,
        "assignee": assignee,
        "status": status,
        "points": 10,
    }
}

pub async fn seed(store: &MemoryStore, collection: &str, documents: Vec<Document>) {
    for document in documents {
        store.insert(collection, document).await.unwrap();
    }
}

pub async fn seeded_group(store: &MemoryStore) {
    seed(
        store,
        collections::USERS,
        vec![
            user("owner", "Olivia", 120),
            user("admin", "Arthur", 80),
            user("member", "Maria", 40),
        ],
    )
    .await;
    seed(
        store,
        collections::GROUPS,
        vec![group("g1", "owner", &["owner", "admin"], &["owner", "admin", "member"])],
    )
    .await;
}

/// Gerador fixo que guarda o último prompt recebido
pub struct StubGenerator {
    pub reply: Result<String, GenerationError>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: GenerationError) -> Self {
        Self {
            reply: Err(err),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}
