use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::{Bson, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::config::{InvitePolicy, Limits};
use crate::database::repository::{encode, find_group, find_user_by_email, ids_to_bson, ids_where_eq, query_as};
use crate::database::{collections, BatchSummary, BatchWriter, DocumentStore, FieldUpdate, Query, StoreError, WriteOp};
use crate::models::{Activity, Group, User, ACTIVITY_MEMBER_INVITED};
use crate::utils::{bson_to_utc, AppError, AppResult, CalendarBounds};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub email: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    pub group_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAdminRequest {
    pub group_id: Option<String>,
    pub target_user_id: Option<String>,
    #[serde(default)]
    pub make_admin: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResult {
    fn ok() -> Self {
        Self { success: true, message: None }
    }

    fn with_message(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub active_today: usize,
    pub new_this_week: usize,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Campo obrigatório: ausente ou vazio vira `invalid-argument`
fn required<'a>(value: &'a Option<String>, message: &str) -> AppResult<&'a str> {
    present(value).ok_or_else(|| AppError::InvalidArgument(message.to_string()))
}

async fn load_group(store: &dyn DocumentStore, group_id: &str, on_error: &str) -> AppResult<Group> {
    find_group(store, group_id)
        .await
        .map_err(|e| AppError::internal(&format!("Error reading group {}", group_id), on_error, e))?
        .ok_or_else(|| AppError::NotFound("Group not found.".to_string()))
}

pub async fn invite_member(
    store: &dyn DocumentStore,
    inviter_id: &str,
    request: &InviteRequest,
    policy: InvitePolicy,
) -> AppResult<ActionResult> {
    const UNEXPECTED: &str = "Unexpected error.";

    let (email, group_id) = match (present(&request.email), present(&request.group_id)) {
        (Some(email), Some(group_id)) => (email, group_id),
        _ => return Err(AppError::InvalidArgument("Email and groupId required.".to_string())),
    };

    let group = load_group(store, group_id, UNEXPECTED).await?;

    let allowed = match policy {
        InvitePolicy::Admins => group.is_admin(inviter_id),
        InvitePolicy::OwnerOnly => group.is_owner(inviter_id),
    };
    if !allowed {
        let message = match policy {
            InvitePolicy::Admins => "Only group admins can invite members.",
            InvitePolicy::OwnerOnly => "Only the group owner can invite members.",
        };
        log::warn!("🚫 Invite denied: {} in group {}", inviter_id, group_id);
        return Err(AppError::PermissionDenied(message.to_string()));
    }

    let invitee = find_user_by_email(store, email)
        .await
        .map_err(|e| AppError::internal("Error looking up user by email", "Error looking up user.", e))?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found.", email)))?;

    if group.is_member(&invitee.id) {
        return Ok(ActionResult::with_message(format!("User {} is already a member.", email)));
    }

    let unexpected = |e: StoreError| AppError::internal("Unexpected invite error", UNEXPECTED, e);

    store
        .update(
            collections::GROUPS,
            group_id,
            vec![FieldUpdate::ArrayUnion("members".to_string(), Bson::String(invitee.id.clone()))],
        )
        .await
        .map_err(unexpected)?;
    log::info!("✅ User {} added to group {} by {}", invitee.id, group_id, inviter_id);

    let activity = Activity {
        id: String::new(),
        group_id: group_id.to_string(),
        user_name: group.name.clone(),
        kind: ACTIVITY_MEMBER_INVITED.to_string(),
        details: format!("Invited {} to the group.", email),
        created_at: Some(BsonDateTime::now()),
    };
    store
        .insert(collections::ACTIVITIES, encode(&activity).map_err(unexpected)?)
        .await
        .map_err(unexpected)?;

    Ok(ActionResult::with_message(format!("User {} successfully added!", email)))
}

pub async fn toggle_admin(
    store: &dyn DocumentStore,
    caller_id: &str,
    request: &ToggleAdminRequest,
) -> AppResult<ActionResult> {
    const UNEXPECTED: &str = "An unexpected error occurred.";

    let (group_id, target) = match (present(&request.group_id), present(&request.target_user_id)) {
        (Some(group_id), Some(target)) => (group_id, target),
        _ => {
            return Err(AppError::InvalidArgument(
                "groupId and targetUserId are required.".to_string(),
            ))
        }
    };

    let group = load_group(store, group_id, UNEXPECTED).await?;
    if !group.is_admin(caller_id) {
        return Err(AppError::PermissionDenied("Only group admins can change roles.".to_string()));
    }
    if group.is_owner(target) {
        return Err(AppError::PermissionDenied(
            "The group owner's admin status cannot be revoked.".to_string(),
        ));
    }

    let value = Bson::String(target.to_string());
    let (update, message) = if request.make_admin {
        (FieldUpdate::ArrayUnion("admins".to_string(), value), "User promoted to admin.")
    } else {
        (FieldUpdate::ArrayRemove("admins".to_string(), value), "User demoted to member.")
    };

    store
        .update(collections::GROUPS, group_id, vec![update])
        .await
        .map_err(|e| AppError::internal("Error toggling admin status", UNEXPECTED, e))?;

    log::info!("👥 {} in group {} by {}: {}", target, group_id, caller_id, message);
    Ok(ActionResult::with_message(message.to_string()))
}

pub async fn group_stats<Tz: TimeZone>(
    store: &dyn DocumentStore,
    caller_id: &str,
    request: &GroupRequest,
    now: &DateTime<Tz>,
    limits: &Limits,
) -> AppResult<GroupStats> {
    const UNEXPECTED: &str = "An unexpected error occurred.";

    let group_id = required(&request.group_id, "GroupId is required.")?;
    log::info!("📊 Fetching stats for group {}, called by user {}", group_id, caller_id);

    let group = load_group(store, group_id, UNEXPECTED).await?;
    if group.members.is_empty() {
        log::info!("Group {} has no members.", group_id);
        return Ok(GroupStats::default());
    }

    if group.members.len() > limits.member_query_limit {
        log::warn!(
            "⚠️  Group {} has {} members, querying stats only for first {}.",
            group_id,
            group.members.len(),
            limits.member_query_limit
        );
    }

    let members: Vec<User> = query_as(
        store,
        &Query::collection(collections::USERS).where_in("_id", ids_to_bson(group.member_window(limits.member_query_limit))),
    )
    .await
    .map_err(|e| AppError::internal(&format!("Error getting group stats for {}", group_id), UNEXPECTED, e))?;

    let bounds = CalendarBounds::at(now);
    let since = |ts: Option<BsonDateTime>, start: DateTime<Utc>| ts.map(|ts| bson_to_utc(ts) >= start).unwrap_or(false);

    let stats = GroupStats {
        active_today: members.iter().filter(|m| since(m.last_login, bounds.today_start)).count(),
        new_this_week: members.iter().filter(|m| since(m.created_at, bounds.week_start)).count(),
    };

    log::info!(
        "Stats for group {}: ActiveToday={}, NewThisWeek={}",
        group_id,
        stats.active_today,
        stats.new_this_week
    );
    Ok(stats)
}

/// Remove o grupo e tudo que pertence a ele. Apenas o dono pode apagar.
pub async fn delete_group(
    store: &dyn DocumentStore,
    caller_id: &str,
    request: &GroupRequest,
    limits: &Limits,
) -> AppResult<ActionResult> {
    const UNEXPECTED: &str = "An unexpected error occurred while deleting the group.";

    let group_id = required(&request.group_id, "groupId is required.")?;
    log::info!("🗑️  User {} attempting to delete group {}", caller_id, group_id);

    let group = load_group(store, group_id, UNEXPECTED).await?;
    if !group.is_owner(caller_id) {
        log::warn!("🚫 Permission denied: User {} is not owner of group {}.", caller_id, group_id);
        return Err(AppError::PermissionDenied(
            "Only the group owner can delete this group.".to_string(),
        ));
    }

    let summary = cascade_delete(store, group_id, limits.batch_operation_limit)
        .await
        .map_err(|e| AppError::internal(&format!("Error deleting group {}", group_id), UNEXPECTED, e))?;

    log::info!(
        "✅ Successfully deleted group {} and all associated data ({} operations in {} commits).",
        group_id,
        summary.operations,
        summary.commits
    );
    Ok(ActionResult::ok())
}

async fn cascade_delete(
    store: &dyn DocumentStore,
    group_id: &str,
    batch_limit: usize,
) -> Result<BatchSummary, StoreError> {
    let mut batch = BatchWriter::new(store, batch_limit);

    for collection in [collections::TASKS, collections::SHOP_ITEMS, collections::ACTIVITIES] {
        let ids = ids_where_eq(store, collection, "groupId", group_id).await?;
        if !ids.is_empty() {
            log::info!("Found {} documents in {} to delete.", ids.len(), collection);
        }
        for id in ids {
            batch.push(WriteOp::delete(collection, &id)).await?;
        }
    }

    let users = ids_where_eq(store, collections::USERS, "activeGroupId", group_id).await?;
    if !users.is_empty() {
        log::info!("Found {} users to update activeGroupId for.", users.len());
    }
    for id in users {
        let clear = vec![FieldUpdate::Set("activeGroupId".to_string(), Bson::Null)];
        batch.push(WriteOp::update(collections::USERS, &id, clear)).await?;
    }

    batch.push(WriteOp::delete(collections::GROUPS, group_id)).await?;
    batch.finish().await
}
