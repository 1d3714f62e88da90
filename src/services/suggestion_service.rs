use chrono::{DateTime, TimeZone};
use serde_json::{json, Value};

use crate::database::repository::query_as;
use crate::database::{collections, Direction, DocumentStore, Query};
use crate::models::Task;
use crate::services::text_generation::{GenerationError, TextGenerator};
use crate::utils::bson_to_utc;

/// Quantas tarefas do histórico entram no prompt
pub const HISTORY_LIMIT: usize = 20;

/// Resultado da geração de sugestões, antes de virar resposta HTTP
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    /// Array JSON válido
    Parsed(Vec<Value>),
    /// Modelo não devolveu texto
    Empty,
    /// Resposta fora do formato: uma sugestão (só título) por linha
    TitlesOnly(Vec<Value>),
    /// Nada aproveitável; carrega a resposta crua
    Unparseable(String),
}

fn render_history<Tz: TimeZone>(tasks: &[Task], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if tasks.is_empty() {
        return "No previous tasks found.".to_string();
    }
    tasks
        .iter()
        .map(|task| {
            let title = if task.title.is_empty() { "Untitled Task" } else { task.title.as_str() };
            let created = task
                .created_at
                .map(|ts| bson_to_utc(ts).with_timezone(tz).format("%-m/%-d/%Y").to_string())
                .unwrap_or_else(|| "unknown date".to_string());
            format!("- {} (created around {})", title, created)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(history: &str, now_label: &str) -> String {
    format!(
        r#"You are a helpful productivity assistant analyzing a user's task history.
Here are some of their recent tasks and approximate creation dates:
{history}

Based on this history and the current time ({now_label}), suggest exactly 3 short, actionable tasks this user might typically do.

For each suggestion, provide:
1.  A concise 'title'.
2.  A brief 'description' (one sentence).
3.  A 'difficulty' level ('bronze', 'silver', or 'gold').
4.  An estimated 'points' value (integer between 10 and 100 based on title and difficulty).

Format the output strictly as a JSON array of objects, like this example:
[
  {{
    "title": "Example Task 1",
    "description": "This is a sample description.",
    "difficulty": "silver",
    "points": 50
  }},
  {{
    "title": "Example Task 2",
    "description": "Another sample description.",
    "difficulty": "bronze",
    "points": 25
  }}
]
Do not include any text before or after the JSON array."#
    )
}

/// Remove cercas de bloco de código (```json ... ```)
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text)
        .trim_start();
    text.strip_suffix("```").unwrap_or(text).trim_end()
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).map(|s| !s.is_empty()).unwrap_or(false)
}

fn is_valid_suggestion(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    non_empty_str(object.get("title"))
        && non_empty_str(object.get("difficulty"))
        && object.get("points").map(Value::is_number).unwrap_or(false)
}

/// Interpreta o texto do modelo: JSON válido ou, em último caso, uma linha por título
pub fn parse_suggestions(raw: &str) -> SuggestionOutcome {
    let text = raw.trim();
    if text.is_empty() {
        return SuggestionOutcome::Empty;
    }

    match serde_json::from_str::<Value>(strip_fences(text)) {
        Ok(Value::Array(items)) if items.iter().all(is_valid_suggestion) => return SuggestionOutcome::Parsed(items),
        Ok(other) => log::error!("❌ Parsed JSON is not in the expected format: {}", other),
        Err(e) => log::error!("❌ Failed to parse AI response as JSON: {}", e),
    }

    let titles: Vec<Value> = text
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("- ").unwrap_or(line)
        })
        .filter(|line| !line.is_empty())
        .map(|title| json!({ "title": title, "description": "", "difficulty": "", "points": "" }))
        .collect();

    if titles.is_empty() {
        SuggestionOutcome::Unparseable(text.to_string())
    } else {
        SuggestionOutcome::TitlesOnly(titles)
    }
}

/// Sugere três tarefas com base no histórico do responsável
pub async fn suggest_tasks<Tz: TimeZone>(
    store: &dyn DocumentStore,
    generator: &dyn TextGenerator,
    assignee_name: &str,
    now: &DateTime<Tz>,
) -> Result<SuggestionOutcome, GenerationError>
where
    Tz::Offset: std::fmt::Display,
{
    let query = Query::collection(collections::TASKS)
        .where_eq("assigneeName", assignee_name)
        .order_by("createdAt", Direction::Descending)
        .limit(HISTORY_LIMIT);

    let history = match query_as::<Task>(store, &query).await {
        Ok(tasks) => render_history(&tasks, &now.timezone()),
        Err(e) => {
            log::error!("❌ Error fetching tasks for {}: {}", assignee_name, e);
            render_history(&[], &now.timezone())
        }
    };

    let prompt = build_prompt(&history, &now.format("%a %-I:%M %p").to_string());
    log::info!("🤖 Sending prompt to {} for JSON...", generator.name());

    let response = generator.generate(&prompt).await?;
    log::debug!("Received response text: {}", response);
    Ok(parse_suggestions(&response))
}

/// Variante em texto: três sugestões, uma por linha, a partir dos horários
/// em que o usuário costuma criar tarefas
pub async fn quick_suggestions<Tz: TimeZone>(
    store: &dyn DocumentStore,
    generator: &dyn TextGenerator,
    assignee_name: &str,
    now: &DateTime<Tz>,
) -> Result<Vec<String>, String>
where
    Tz::Offset: std::fmt::Display,
{
    let tasks: Vec<Task> = query_as(
        store,
        &Query::collection(collections::TASKS).where_eq("assigneeName", assignee_name),
    )
    .await
    .map_err(|e| e.to_string())?;

    if tasks.is_empty() {
        return Ok(vec!["No tasks found for this user.".to_string()]);
    }

    let task_list = tasks
        .iter()
        .map(|task| {
            let created = task
                .created_at
                .map(|ts| bson_to_utc(ts).to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            format!("{} (created at {})", task.title, created)
        })
        .collect::<Vec<_>>()
        .join(", ");

    let prompt = format!(
        "You are a smart productivity assistant analyzing when the user usually performs tasks.\n\
         Here are their past tasks and when they were created:\n\
         {}\n\n\
         Today is {}.\n\
         Suggest 3 tasks that would make sense for them to do now, based on timing and recurring patterns. Start with a capital letter.\n\
         Return each suggestion on a new line only, no need to format it like a list (example: numbering, bullets, etc.).\n",
        task_list,
        now.format("%A %I:%M %p")
    );

    let response = generator.generate(&prompt).await.map_err(|e| e.to_string())?;
    let response = match response.trim() {
        "" => "No suggestions generated.",
        text => text,
    };

    Ok(response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
