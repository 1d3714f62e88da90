use actix_web::{web, HttpResponse};
use chrono::Local;
use serde::Deserialize;

use crate::api::callable::{caller_id, respond, CallableRequest};
use crate::config::Limits;
use crate::database::DocumentStore;
use crate::services::auth_service::Claims;
use crate::services::dashboard_service::{self, Period};
use crate::utils::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardRequest {
    pub period: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/functions/getDashboardData",
    tag = "Functions",
    request_body = CallableRequest,
    responses(
        (status = 200, description = "Dashboard counters and chart series"),
        (status = 401, description = "User must be logged in"),
        (status = 404, description = "User data not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_dashboard_data(
    store: web::Data<dyn DocumentStore>,
    limits: web::Data<Limits>,
    claims: Option<web::ReqData<Claims>>,
    body: web::Json<CallableRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = caller_id(claims)?;
    let request: DashboardRequest = body.payload()?;
    let period = Period::parse(request.period.as_deref());
    log::info!("📈 getDashboardData - user: {}, period: {:?}", user_id, period);

    respond(dashboard_service::get_dashboard_data(store.get_ref(), &user_id, period, &Local::now(), &limits).await)
}
