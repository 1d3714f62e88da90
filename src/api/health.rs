use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::database::{collections, DocumentStore, Query};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(store: web::Data<dyn DocumentStore>) -> impl Responder {
    let probe = Query::collection(collections::GROUPS).limit(1);
    let database = match store.query(&probe).await {
        Ok(_) => "connected",
        Err(e) => {
            log::warn!("⚠️  Health check database probe failed: {}", e);
            "unreachable"
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "tasktrek-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
