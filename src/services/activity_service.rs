use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::database::repository::{find_group, query_as};
use crate::database::{collections, Direction, DocumentStore, Query};
use crate::models::Activity;
use crate::utils::{bson_to_utc, AppError, AppResult};

pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const MAX_FEED_LIMIT: usize = 50;

lazy_static! {
    static ref SIGNED_POINTS: Regex = Regex::new(r"(?i)([+-])\s?(\d+)\s*(?:points?|pts?)\b").unwrap();
    static ref POINTS: Regex = Regex::new(r"(?i)\b(\d+)\s*(?:points?|pts?)\b").unwrap();
    static ref SPENDING: Regex = Regex::new(r"(?i)\b(?:spent|redeemed|bought|lost|purchased)\b").unwrap();
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    pub group_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
    /// RFC 3339
    pub created_at: Option<String>,
    pub points_delta: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityFeed {
    pub activities: Vec<ActivityEntry>,
}

/// Variação de pontos descrita no texto da atividade.
///
/// `+50 pts` / `-20 points` valem como estão. Sem sinal, o valor é positivo,
/// exceto quando o texto fala em gasto (`spent`, `redeemed`, ...).
pub fn parse_points_delta(details: &str) -> Option<i64> {
    if let Some(caps) = SIGNED_POINTS.captures(details) {
        let amount: i64 = caps[2].parse().ok()?;
        return Some(if &caps[1] == "-" { -amount } else { amount });
    }

    let amount: i64 = POINTS.captures(details)?[1].parse().ok()?;
    if SPENDING.is_match(details) {
        Some(-amount)
    } else {
        Some(amount)
    }
}

impl From<Activity> for ActivityEntry {
    fn from(activity: Activity) -> Self {
        let points_delta = parse_points_delta(&activity.details);
        Self {
            id: activity.id,
            user_name: activity.user_name,
            kind: activity.kind,
            details: activity.details,
            created_at: activity.created_at.map(|ts| bson_to_utc(ts).to_rfc3339()),
            points_delta,
        }
    }
}

/// Atividades mais recentes do grupo (membros, admins ou dono)
pub async fn group_activity(
    store: &dyn DocumentStore,
    caller_id: &str,
    request: &ActivityRequest,
) -> AppResult<ActivityFeed> {
    const UNEXPECTED: &str = "An unexpected error occurred.";

    let group_id = request
        .group_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidArgument("groupId is required.".to_string()))?;

    let group = find_group(store, group_id)
        .await
        .map_err(|e| AppError::internal("Error reading group", UNEXPECTED, e))?
        .ok_or_else(|| AppError::NotFound("Group not found.".to_string()))?;

    if !group.has_access(caller_id) {
        return Err(AppError::PermissionDenied(
            "Only group members can view activity.".to_string(),
        ));
    }

    let limit = request.limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);
    let query = Query::collection(collections::ACTIVITIES)
        .where_eq("groupId", group_id)
        .order_by("createdAt", Direction::Descending)
        .limit(limit);

    let activities: Vec<Activity> = query_as(store, &query)
        .await
        .map_err(|e| AppError::internal(&format!("Error loading activity for {}", group_id), UNEXPECTED, e))?;

    Ok(ActivityFeed {
        activities: activities.into_iter().map(ActivityEntry::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::test_support::*;
    use mongodb::bson::doc;

    #[test]
    fn test_points_delta_patterns() {
        assert_eq!(parse_points_delta("Completed 'Dishes' (+50 pts)"), Some(50));
        assert_eq!(parse_points_delta("Penalty: -20 points"), Some(-20));
        assert_eq!(parse_points_delta("Earned 30 points"), Some(30));
        assert_eq!(parse_points_delta("Redeemed 'Movie night' for 100 pts"), Some(-100));
        assert_eq!(parse_points_delta("Spent 1 point on a sticker"), Some(-1));
        assert_eq!(parse_points_delta("Invited ana@example.com to the group."), None);
    }

    #[test]
    fn test_explicit_sign_wins_over_spending_verb() {
        assert_eq!(parse_points_delta("Bought a reward, refunded +15 pts"), Some(15));
    }

    #[tokio::test]
    async fn test_feed_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        seeded_group(&store).await;
        let activities = (1..=5)
            .map(|day| {
                doc! {
                    "_id": format!("a{}", day),
                    "groupId": "g1",
                    "userName": "Maria",
                    "type": "task-completed",
                    "details": format!("Completed task (+{} pts)", day * 10),
                    "createdAt": at(2026, 10, day, 12),
                }
            })
            .collect();
        seed(&store, collections::ACTIVITIES, activities).await;

        let request = ActivityRequest {
            group_id: Some("g1".into()),
            limit: Some(2),
        };
        let feed = group_activity(&store, "member", &request).await.unwrap();
        let ids: Vec<&str> = feed.activities.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a5", "a4"]);
        assert_eq!(feed.activities[0].points_delta, Some(50));
        assert_eq!(feed.activities[0].kind, "task-completed");
    }

    #[tokio::test]
    async fn test_feed_requires_membership() {
        let store = MemoryStore::new();
        seeded_group(&store).await;
        let request = ActivityRequest {
            group_id: Some("g1".into()),
            limit: None,
        };
        let err = group_activity(&store, "stranger", &request).await.unwrap_err();
        assert_eq!(err.status(), "PERMISSION_DENIED");

        let err = group_activity(&store, "member", &ActivityRequest::default()).await.unwrap_err();
        assert_eq!(err.status(), "INVALID_ARGUMENT");
    }
}
