use actix_web::{http::header::AUTHORIZATION, web, HttpRequest, HttpResponse};

use crate::config::JwtSettings;
use crate::database::DocumentStore;
use crate::services::auth_service::{self, AuthResponse, Claims, LoginRequest, RegisterRequest, UserInfo};

fn bearer_claims(req: &HttpRequest, jwt: &JwtSettings) -> Option<Result<Claims, String>> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    Some(auth_service::verify_token(token.trim(), jwt))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    store: web::Data<dyn DocumentStore>,
    jwt: web::Data<JwtSettings>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(store.get_ref(), &jwt, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": e
            }))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request or user already exists")
    )
)]
pub async fn register(
    store: web::Data<dyn DocumentStore>,
    jwt: web::Data<JwtSettings>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("📝 POST /auth/register - email: {}", email);

    match auth_service::register(store.get_ref(), &jwt, &request).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", email, e);
            HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": e
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid"),
        (status = 401, description = "Invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(req: HttpRequest, jwt: web::Data<JwtSettings>) -> HttpResponse {
    log::info!("✓ GET /auth/verify");

    match bearer_claims(&req, &jwt) {
        Some(Ok(claims)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "valid": true,
            "user_id": claims.sub,
            "email": claims.email,
            "exp": claims.exp
        })),
        Some(Err(e)) => {
            log::warn!("❌ Invalid token: {}", e);
            HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "valid": false,
                "error": e
            }))
        }
        None => HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "No valid Authorization header"
        })),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "User information retrieved", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(req: HttpRequest, store: web::Data<dyn DocumentStore>, jwt: web::Data<JwtSettings>) -> HttpResponse {
    log::info!("👤 GET /auth/me");

    let claims = match bearer_claims(&req, &jwt) {
        Some(Ok(claims)) => claims,
        Some(Err(e)) => {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": e
            }))
        }
        None => {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": "No valid Authorization header"
            }))
        }
    };

    match auth_service::get_current_user(store.get_ref(), &claims.sub).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": user
        })),
        Err(e) => {
            log::error!("❌ Failed to get user {}: {}", claims.sub, e);
            HttpResponse::NotFound().json(serde_json::json!({
                "success": false,
                "error": e
            }))
        }
    }
}
