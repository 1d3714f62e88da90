use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AiProvider, AiSettings};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const OPENAI_MAX_TOKENS: u32 = 150;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// O fornecedor recusou por sobrecarga/limite (HTTP 429/503)
    Unavailable(String),
    Request(String),
    Response(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Unavailable(msg) => write!(f, "AI service unavailable: {}", msg),
            GenerationError::Request(msg) => write!(f, "AI request failed: {}", msg),
            GenerationError::Response(msg) => write!(f, "Invalid AI response: {}", msg),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Modelo de linguagem que transforma um prompt em texto
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

async fn send_json(request: reqwest::RequestBuilder, vendor: &str) -> Result<serde_json::Value, GenerationError> {
    let response = request
        .send()
        .await
        .map_err(|e| GenerationError::Request(format!("Failed to reach {}: {}", vendor, e)))?;

    let status = response.status();
    if status.as_u16() == 429 || status.as_u16() == 503 {
        return Err(GenerationError::Unavailable(format!("{} API returned {}", vendor, status)));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Request(format!("{} API error {}: {}", vendor, status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| GenerationError::Response(format!("Failed to parse {} response: {}", vendor, e)))
}

fn http_client() -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| GenerationError::Request(format!("Failed to build HTTP client: {}", e)))
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", GEMINI_API_BASE, self.model);
        let request = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }));

        let body = send_json(request, "Gemini").await?;
        let parsed: GeminiResponse =
            serde_json::from_value(body).map_err(|e| GenerationError::Response(e.to_string()))?;

        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect::<String>())
            .unwrap_or_default())
    }
}

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = self
            .client
            .post(format!("{}/chat/completions", OPENAI_API_BASE))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": OPENAI_MAX_TOKENS,
            }));

        let body = send_json(request, "OpenAI").await?;
        let parsed: ChatCompletion =
            serde_json::from_value(body).map_err(|e| GenerationError::Response(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default())
    }
}

/// Qual fornecedor usar: o configurado em `AI_PROVIDER`, senão Gemini quando
/// houver chave, senão OpenAI.
fn select_provider(ai: &AiSettings) -> Option<AiProvider> {
    match ai.provider {
        Some(provider) => Some(provider),
        None if ai.google_api_key.is_some() => Some(AiProvider::Gemini),
        None if ai.openai_api_key.is_some() => Some(AiProvider::OpenAi),
        None => None,
    }
}

/// Gerador configurado, ou `None` quando falta chave (as sugestões respondem 503)
pub fn from_settings(ai: &AiSettings) -> Option<Arc<dyn TextGenerator>> {
    let built: Result<Arc<dyn TextGenerator>, GenerationError> = match select_provider(ai)? {
        AiProvider::Gemini => match &ai.google_api_key {
            Some(key) => GeminiClient::new(key, &ai.gemini_model).map(|c| Arc::new(c) as Arc<dyn TextGenerator>),
            None => {
                log::error!("❌ GOOGLE_API_KEY environment variable is not set.");
                return None;
            }
        },
        AiProvider::OpenAi => match &ai.openai_api_key {
            Some(key) => OpenAiClient::new(key, &ai.openai_model).map(|c| Arc::new(c) as Arc<dyn TextGenerator>),
            None => {
                log::error!("❌ OPENAI_API_KEY environment variable is not set.");
                return None;
            }
        },
    };

    match built {
        Ok(generator) => {
            log::info!("🤖 AI model initialized: {}", generator.name());
            Some(generator)
        }
        Err(e) => {
            log::error!("❌ AI initialization failed: {}", e);
            None
        }
    }
}
