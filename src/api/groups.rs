use actix_web::{web, HttpResponse};
use chrono::Local;

use crate::api::callable::{caller_id, respond, CallableRequest};
use crate::config::Limits;
use crate::database::DocumentStore;
use crate::services::activity_service::{self, ActivityRequest};
use crate::services::auth_service::Claims;
use crate::services::group_service::{self, GroupRequest, InviteRequest, ToggleAdminRequest};
use crate::utils::AppError;

#[utoipa::path(
    post,
    path = "/api/v1/functions/inviteMemberToGroup",
    tag = "Functions",
    request_body = CallableRequest,
    responses(
        (status = 200, description = "Member added or already present"),
        (status = 403, description = "Caller cannot invite"),
        (status = 404, description = "Group or user not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn invite_member(
    store: web::Data<dyn DocumentStore>,
    limits: web::Data<Limits>,
    claims: Option<web::ReqData<Claims>>,
    body: web::Json<CallableRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = caller_id(claims)?;
    let request: InviteRequest = body.payload()?;
    log::info!("✉️  inviteMemberToGroup - user: {}, group: {:?}", user_id, request.group_id);

    respond(group_service::invite_member(store.get_ref(), &user_id, &request, limits.invite_policy).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/functions/getGroupStats",
    tag = "Functions",
    request_body = CallableRequest,
    responses(
        (status = 200, description = "Members active today and new this week"),
        (status = 404, description = "Group not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_group_stats(
    store: web::Data<dyn DocumentStore>,
    limits: web::Data<Limits>,
    claims: Option<web::ReqData<Claims>>,
    body: web::Json<CallableRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = caller_id(claims)?;
    let request: GroupRequest = body.payload()?;

    respond(group_service::group_stats(store.get_ref(), &user_id, &request, &Local::now(), &limits).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/functions/deleteGroup",
    tag = "Functions",
    request_body = CallableRequest,
    responses(
        (status = 200, description = "Group and associated data deleted"),
        (status = 403, description = "Only the owner can delete"),
        (status = 404, description = "Group not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_group(
    store: web::Data<dyn DocumentStore>,
    limits: web::Data<Limits>,
    claims: Option<web::ReqData<Claims>>,
    body: web::Json<CallableRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = caller_id(claims)?;
    let request: GroupRequest = body.payload()?;

    respond(group_service::delete_group(store.get_ref(), &user_id, &request, &limits).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/functions/toggleAdminStatus",
    tag = "Functions",
    request_body = CallableRequest,
    responses(
        (status = 200, description = "Role changed"),
        (status = 403, description = "Caller is not admin or target is the owner")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn toggle_admin_status(
    store: web::Data<dyn DocumentStore>,
    claims: Option<web::ReqData<Claims>>,
    body: web::Json<CallableRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = caller_id(claims)?;
    let request: ToggleAdminRequest = body.payload()?;

    respond(group_service::toggle_admin(store.get_ref(), &user_id, &request).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/functions/getGroupActivity",
    tag = "Functions",
    request_body = CallableRequest,
    responses(
        (status = 200, description = "Most recent group activity"),
        (status = 403, description = "Caller is not part of the group")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_group_activity(
    store: web::Data<dyn DocumentStore>,
    claims: Option<web::ReqData<Claims>>,
    body: web::Json<CallableRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = caller_id(claims)?;
    let request: ActivityRequest = body.payload()?;

    respond(activity_service::group_activity(store.get_ref(), &user_id, &request).await)
}
