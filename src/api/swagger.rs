use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TaskTrek Service API",
        version = "1.0.0",
        description = "Backend for TaskTrek groups: dashboard aggregation, group management and AI task suggestions.\n\n**Functions** take `{\"data\": {...}}` and answer `{\"result\": ...}` or `{\"error\": {\"status\", \"message\"}}`.\n\n**Authentication:** functions and `/auth/me` expect a JWT Bearer token issued by `/auth/login` or `/auth/register`."
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::register,
        crate::api::auth::verify_token,
        crate::api::auth::get_me,

        // Health
        crate::api::health::health_check,

        // Functions
        crate::api::dashboard::get_dashboard_data,
        crate::api::groups::invite_member,
        crate::api::groups::get_group_stats,
        crate::api::groups::delete_group,
        crate::api::groups::toggle_admin_status,
        crate::api::groups::get_group_activity,

        // AI
        crate::api::ai_suggest::ai_suggest,
        crate::api::ai_suggest::ai_suggest_quick,
    ),
    components(
        schemas(
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::UserInfo,
            crate::api::health::HealthResponse,
            crate::api::callable::CallableRequest,
        )
    ),
    tags(
        (name = "Auth", description = "Email/password accounts and identity tokens."),
        (name = "Health", description = "Service and database status."),
        (name = "Functions", description = "Callable endpoints used by the TaskTrek front-end."),
        (name = "AI", description = "Task suggestions generated from the assignee's history."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_function_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/functions/deleteGroup"));
        assert!(doc.paths.paths.contains_key("/api/aiSuggest"));
    }
}
