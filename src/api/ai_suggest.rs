use actix_web::{web, HttpResponse};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use crate::database::DocumentStore;
use crate::services::suggestion_service::{self, SuggestionOutcome};
use crate::services::text_generation::{GenerationError, TextGenerator};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SuggestQuery {
    /// Nome do responsável cujas tarefas formam o histórico
    pub assignee_name: Option<String>,
}

impl SuggestQuery {
    fn assignee(&self) -> Option<&str> {
        self.assignee_name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

fn generation_failure(err: GenerationError) -> HttpResponse {
    log::error!("❌ Error in AI suggestion handler: {}", err);
    match &err {
        GenerationError::Unavailable(_) => HttpResponse::ServiceUnavailable().json(json!({ "error": err.to_string() })),
        _ => HttpResponse::InternalServerError().json(json!({ "error": err.to_string() })),
    }
}

#[utoipa::path(
    get,
    path = "/api/aiSuggest",
    tag = "AI",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Three structured task suggestions (or title-only fallback)"),
        (status = 400, description = "Missing assigneeName"),
        (status = 500, description = "AI response could not be parsed"),
        (status = 503, description = "AI service not configured")
    )
)]
pub async fn ai_suggest(
    store: web::Data<dyn DocumentStore>,
    generator: Option<web::Data<dyn TextGenerator>>,
    query: web::Query<SuggestQuery>,
) -> HttpResponse {
    let generator = match generator {
        Some(generator) => generator,
        None => {
            log::error!("❌ AI model is not initialized. Cannot process request.");
            return HttpResponse::ServiceUnavailable().json(json!({ "error": "AI service initialization failed." }));
        }
    };

    let assignee = match query.assignee() {
        Some(name) => name,
        None => return HttpResponse::BadRequest().json(json!({ "error": "Missing assigneeName" })),
    };
    log::info!("🤖 GET /api/aiSuggest - assignee: {}", assignee);

    match suggestion_service::suggest_tasks(store.get_ref(), generator.get_ref(), assignee, &Local::now()).await {
        Ok(SuggestionOutcome::Parsed(suggestions)) => HttpResponse::Ok().json(json!({ "suggestions": suggestions })),
        Ok(SuggestionOutcome::Empty) => {
            log::warn!("⚠️  AI returned an empty response.");
            HttpResponse::Ok().json(json!({ "suggestions": [], "message": "AI could not generate suggestions." }))
        }
        Ok(SuggestionOutcome::TitlesOnly(suggestions)) => HttpResponse::Ok().json(json!({
            "suggestions": suggestions,
            "message": "AI response format issue, only titles parsed."
        })),
        Ok(SuggestionOutcome::Unparseable(raw)) => HttpResponse::InternalServerError().json(json!({
            "error": "Failed to parse AI suggestions.",
            "rawResponse": raw
        })),
        Err(e) => generation_failure(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/aiSuggest/quick",
    tag = "AI",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Suggestions as plain lines"),
        (status = 400, description = "Missing assigneeName"),
        (status = 500, description = "Generation failed")
    )
)]
pub async fn ai_suggest_quick(
    store: web::Data<dyn DocumentStore>,
    generator: Option<web::Data<dyn TextGenerator>>,
    query: web::Query<SuggestQuery>,
) -> HttpResponse {
    let assignee = match query.assignee() {
        Some(name) => name,
        None => return HttpResponse::BadRequest().json(json!({ "error": "Missing assigneeName" })),
    };
    log::info!("🤖 GET /api/aiSuggest/quick - assignee: {}", assignee);

    let result = match generator {
        Some(generator) => {
            suggestion_service::quick_suggestions(store.get_ref(), generator.get_ref(), assignee, &Local::now()).await
        }
        None => Err("AI service initialization failed.".to_string()),
    };

    match result {
        Ok(suggestions) => HttpResponse::Ok().json(json!({ "suggestions": suggestions })),
        Err(message) => {
            log::error!("❌ Error fetching AI suggestions: {}", message);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal Server Error",
                "message": message
            }))
        }
    }
}
