pub mod ai_suggest;
pub mod auth;
pub mod callable;
pub mod dashboard;
pub mod groups;
pub mod health;
pub mod swagger;

use actix_web::web;

use crate::config::JwtSettings;
use crate::middleware::AuthMiddleware;
use crate::utils::AppError;

/// Rotas da aplicação. `jwt` é usado pelo middleware das functions.
pub fn configure(cfg: &mut web::ServiceConfig, jwt: &JwtSettings) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        log::warn!("⚠️  Rejected JSON body: {}", err);
        AppError::InvalidArgument(format!("Invalid JSON body: {}", err)).into()
    }))
    // Health check
    .route("/health", web::get().to(health::health_check))
    // Auth endpoints
    .service(
        web::scope("/api/v1/auth")
            .route("/login", web::post().to(auth::login))
            .route("/register", web::post().to(auth::register))
            .route("/verify", web::get().to(auth::verify_token))
            .route("/me", web::get().to(auth::get_me)),
    )
    // Callable functions (identity token opcional; a function decide)
    .service(
        web::scope("/api/v1/functions")
            .wrap(AuthMiddleware::new(jwt.clone()))
            .route("/getDashboardData", web::post().to(dashboard::get_dashboard_data))
            .route("/inviteMemberToGroup", web::post().to(groups::invite_member))
            .route("/getGroupStats", web::post().to(groups::get_group_stats))
            .route("/deleteGroup", web::post().to(groups::delete_group))
            .route("/toggleAdminStatus", web::post().to(groups::toggle_admin_status))
            .route("/getGroupActivity", web::post().to(groups::get_group_activity)),
    )
    // AI suggestions
    .service(
        web::scope("/api/aiSuggest")
            .route("", web::get().to(ai_suggest::ai_suggest))
            .route("/quick", web::get().to(ai_suggest::ai_suggest_quick)),
    );
}
