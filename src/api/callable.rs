//! Envelope das functions: `{"data": ...}` na entrada, `{"result": ...}` ou
//! `{"error": {"status", "message"}}` na saída.

use actix_web::{web, HttpResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::auth_service::Claims;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CallableRequest {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}

impl CallableRequest {
    /// Converte `data` no payload da function (`null` vira o default)
    pub fn payload<T: DeserializeOwned + Default>(&self) -> AppResult<T> {
        if self.data.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.data.clone()).map_err(|e| {
            log::warn!("⚠️  Invalid callable payload: {}", e);
            AppError::InvalidArgument("Invalid request data.".to_string())
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CallableResponse<T: Serialize> {
    pub result: T,
}

/// Id do usuário autenticado, ou `unauthenticated`
pub fn caller_id(claims: Option<web::ReqData<Claims>>) -> AppResult<String> {
    claims
        .map(|claims| claims.into_inner().sub)
        .ok_or_else(|| AppError::Unauthenticated("User must be logged in.".to_string()))
}

pub fn respond<T: Serialize>(result: AppResult<T>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(CallableResponse { result: result? }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::group_service::GroupRequest;
    use serde_json::json;

    #[test]
    fn test_null_data_uses_defaults() {
        let request: CallableRequest = serde_json::from_value(json!({})).unwrap();
        let payload: GroupRequest = request.payload().unwrap();
        assert!(payload.group_id.is_none());
    }

    #[test]
    fn test_wrong_shape_is_invalid_argument() {
        let request: CallableRequest = serde_json::from_value(json!({ "data": { "groupId": 5 } })).unwrap();
        let err = request.payload::<GroupRequest>().unwrap_err();
        assert_eq!(err.status(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_missing_identity_is_unauthenticated() {
        assert_eq!(
            caller_id(None).unwrap_err(),
            AppError::Unauthenticated("User must be logged in.".into())
        );
    }
}
