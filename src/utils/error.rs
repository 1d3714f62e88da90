use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

use crate::database::StoreError;

/// Erro exposto aos clientes. Cada variante corresponde a um `status` do
/// envelope de erro das functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Unauthenticated(String),
    InvalidArgument(String),
    NotFound(String),
    PermissionDenied(String),
    Internal(String),
    Unavailable(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Código no formato do envelope (`NOT_FOUND`, `PERMISSION_DENIED`, ...)
    pub fn status(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::Internal(_) => "INTERNAL",
            AppError::Unavailable(_) => "UNAVAILABLE",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthenticated(msg)
            | AppError::InvalidArgument(msg)
            | AppError::NotFound(msg)
            | AppError::PermissionDenied(msg)
            | AppError::Internal(msg)
            | AppError::Unavailable(msg) => msg,
        }
    }

    /// Loga a falha do banco e devolve um erro interno com mensagem genérica
    pub fn internal(context: &str, message: &str, err: StoreError) -> Self {
        log::error!("❌ {}: {}", context, err);
        AppError::Internal(message.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": {
                "status": self.status(),
                "message": self.message()
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_error_kind() {
        assert_eq!(AppError::Unauthenticated("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidArgument("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::PermissionDenied("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::Unavailable("x".into()).status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_internal_hides_store_details() {
        let err = AppError::internal(
            "Reading user",
            "Could not fetch user data.",
            StoreError::Backend("connection reset".into()),
        );
        assert_eq!(err, AppError::Internal("Could not fetch user data.".into()));
        assert_eq!(err.status(), "INTERNAL");
    }
}
