use std::env;
use std::str::FromStr;

use crate::database::DEFAULT_BATCH_LIMIT;

/// Quem pode convidar membros para um grupo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitePolicy {
    Admins,
    OwnerOnly,
}

impl FromStr for InvitePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "admins" | "admin" => Ok(InvitePolicy::Admins),
            "owner" | "owner-only" => Ok(InvitePolicy::OwnerOnly),
            other => Err(format!("Invalid INVITE_POLICY: {} (expected admins|owner)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    OpenAi,
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(AiProvider::Gemini),
            "openai" => Ok(AiProvider::OpenAi),
            other => Err(format!("Invalid AI_PROVIDER: {} (expected gemini|openai)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSettings {
    pub provider: Option<AiProvider>,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

/// Limites que o banco hospedado impõe à lógica de negócio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Máximo de ids numa consulta `in`
    pub member_query_limit: usize,
    /// Fatias nomeadas (além do próprio usuário) no gráfico de pontos
    pub donut_named_slices: usize,
    pub batch_operation_limit: usize,
    pub invite_policy: InvitePolicy,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            member_query_limit: 30,
            donut_named_slices: 4,
            batch_operation_limit: DEFAULT_BATCH_LIMIT,
            invite_policy: InvitePolicy::Admins,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub jwt: JwtSettings,
    pub ai: AiSettings,
    pub limits: Limits,
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, String> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| format!("Invalid value for {}: {}", key, value)),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = lookup("DATABASE_URL").ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                log::warn!("⚠️  JWT_SECRET not set, using development default");
                "default-secret-change-me".to_string()
            }
        };

        let provider = match lookup("AI_PROVIDER").filter(|v| !v.trim().is_empty()) {
            Some(value) => Some(value.parse::<AiProvider>()?),
            None => None,
        };

        let defaults = Limits::default();
        let limits = Limits {
            member_query_limit: parse_or(&lookup, "MEMBER_QUERY_LIMIT", defaults.member_query_limit)?.max(1),
            donut_named_slices: parse_or(&lookup, "DONUT_NAMED_SLICES", defaults.donut_named_slices)?,
            batch_operation_limit: parse_or(&lookup, "BATCH_OPERATION_LIMIT", defaults.batch_operation_limit)?
                .clamp(1, crate::database::PLATFORM_BATCH_CEILING),
            invite_policy: parse_or(&lookup, "INVITE_POLICY", defaults.invite_policy)?,
        };

        Ok(Self {
            host: text("HOST", "0.0.0.0"),
            port: parse_or(&lookup, "PORT", 3002)?,
            database_url,
            cors_origins: text("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            jwt: JwtSettings {
                secret: jwt_secret,
                issuer: text("JWT_ISSUER", "tasktrek"),
                audience: text("JWT_AUDIENCE", "tasktrek-app"),
                ttl_hours: parse_or(&lookup, "JWT_TTL_HOURS", 24)?,
            },
            ai: AiSettings {
                provider,
                google_api_key: secret("GOOGLE_API_KEY"),
                gemini_model: text("GEMINI_MODEL", "gemini-2.5-flash"),
                openai_api_key: secret("OPENAI_API_KEY"),
                openai_model: text("OPENAI_MODEL", "gpt-4o-mini"),
            },
            limits,
        })
    }
}
