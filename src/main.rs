mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
#[cfg(test)]
mod test_support;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Settings;
use crate::services::text_generation;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::from_env().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    log::info!("🚀 Starting TaskTrek Service...");
    log::info!("📊 Database: {}", settings.database_url);

    let store = database::connect(&settings.database_url)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let store_data = web::Data::from(store);
    log::info!("✅ Document store ready");

    // Gerador opcional: sem chave, /api/aiSuggest responde 503
    let generator_data = match text_generation::from_settings(&settings.ai) {
        Some(generator) => {
            log::info!("🤖 AI suggestions via {}", generator.name());
            Some(web::Data::from(generator))
        }
        None => {
            log::warn!("⚠️  No AI provider configured; suggestion endpoints will report unavailability");
            None
        }
    };

    let limits_data = web::Data::new(settings.limits.clone());
    let jwt_data = web::Data::new(settings.jwt.clone());
    let cors_origins = settings.cors_origins.clone();
    let jwt = settings.jwt.clone();

    log::info!("🌐 Server starting on {}:{}", settings.host, settings.port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", settings.host, settings.port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", settings.host, settings.port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        let mut app = App::new()
            .app_data(store_data.clone())
            .app_data(limits_data.clone())
            .app_data(jwt_data.clone());
        if let Some(generator) = &generator_data {
            app = app.app_data(generator.clone());
        }

        app.wrap(cors)
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(|cfg| api::configure(cfg, &jwt))
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await
}
