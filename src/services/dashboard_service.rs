use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::config::Limits;
use crate::database::repository::{self, find_user, ids_to_bson, query_as};
use crate::database::{collections, Direction, DocumentStore, Query, StoreError};
use crate::models::{ChartData, ChartDataset, Paint, Task, TaskStatus, User};
use crate::utils::{bson_to_utc, local_midnight, utc_to_bson, AppError, AppResult, CalendarBounds};

const DONUT_PALETTE: [&str; 6] = ["#8b5cf6", "#a78bfa", "#c084fc", "#f59e0b", "#10b981", "#6b7280"];
const MONTH_LABELS: [&str; 4] = ["3 Weeks Ago", "2 Weeks Ago", "Last Week", "This Week"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
}

impl Period {
    /// Qualquer valor diferente de `week` vale como `month`
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("week") => Period::Week,
            _ => Period::Month,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub user_points: i64,
    pub user_rank: Option<usize>,
    pub tasks_total: usize,
    pub tasks_in_progress: usize,
    pub tasks_completed: usize,
    pub tasks_due_today: usize,
    pub completion_rate: i64,
    pub points_this_week: i64,
    pub tasks_completed_this_week: usize,
    pub task_chart_data: ChartData,
    pub points_chart_data: ChartData,
    pub total_tasks_trend: String,
}

/// Contadores dos cards de estatística
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSummary {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub due_today: usize,
    pub completed_this_week: usize,
    pub points_this_week: i64,
}

/// Janela do gráfico de tendência: início, tamanho do bucket e rótulos
#[derive(Debug, Clone, PartialEq)]
pub struct TrendWindow {
    pub start: DateTime<Utc>,
    pub unit: Duration,
    pub labels: Vec<String>,
}

impl TrendWindow {
    pub fn new<Tz: TimeZone>(period: Period, now: &DateTime<Tz>) -> Self {
        let today = now.date_naive();
        let tz = now.timezone();
        match period {
            Period::Week => {
                let first_day = today - Duration::days(6);
                Self {
                    start: local_midnight(&tz, first_day),
                    unit: Duration::days(1),
                    labels: (0..7)
                        .map(|i| (first_day + Duration::days(i)).format("%b %-d").to_string())
                        .collect(),
                }
            }
            Period::Month => Self {
                start: local_midnight(&tz, today - Duration::days(27)),
                unit: Duration::weeks(1),
                labels: MONTH_LABELS.iter().map(|l| l.to_string()).collect(),
            },
        }
    }

    fn bucket(&self, at: DateTime<Utc>) -> Option<usize> {
        if at < self.start {
            return None;
        }
        let index = ((at - self.start).num_milliseconds() / self.unit.num_milliseconds()) as usize;
        (index < self.labels.len()).then_some(index)
    }
}

/// Arredondamento com meio para cima (-2.5 -> -2)
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn completion_rate(completed: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    round_half_up(completed as f64 * 100.0 / total as f64)
}

/// Variação de tarefas criadas nesta semana contra a semana anterior
pub fn trend_label(previous: usize, current: usize) -> String {
    if previous > 0 {
        let change = round_half_up((current as f64 - previous as f64) * 100.0 / previous as f64);
        if change >= 0 {
            format!("+{}% this week", change)
        } else {
            format!("{}% this week", change)
        }
    } else if current > 0 {
        "+100% this week".to_string()
    } else {
        "0% this week".to_string()
    }
}

pub fn summarize_user_tasks(tasks: &[Task], bounds: &CalendarBounds) -> TaskSummary {
    let today = bounds.today_str();
    let mut summary = TaskSummary::default();

    for task in tasks {
        summary.total += 1;
        match task.status {
            TaskStatus::InProgress => summary.in_progress += 1,
            TaskStatus::Completed => {
                summary.completed += 1;
                let this_week = task
                    .completed_at
                    .map(|ts| bson_to_utc(ts) >= bounds.week_start)
                    .unwrap_or(false);
                if this_week {
                    summary.completed_this_week += 1;
                    summary.points_this_week += task.points;
                }
            }
            _ => {}
        }
        if !task.is_completed() && task.due_date.as_deref() == Some(today.as_str()) {
            summary.due_today += 1;
        }
    }

    summary
}

/// Tarefas criadas por bucket ("Tasks Created") e concluídas ("Tasks Completed")
pub fn build_task_trend(window: &TrendWindow, tasks: &[Task]) -> ChartData {
    let mut created = vec![0i64; window.labels.len()];
    let mut completed = vec![0i64; window.labels.len()];

    for task in tasks {
        let created_at = match task.created_at {
            Some(ts) => bson_to_utc(ts),
            None => continue,
        };
        if created_at < window.start {
            continue;
        }
        if let Some(i) = window.bucket(created_at) {
            created[i] += 1;
        }
        if task.is_completed() {
            if let Some(i) = task.completed_at.and_then(|ts| window.bucket(bson_to_utc(ts))) {
                completed[i] += 1;
            }
        }
    }

    ChartData {
        labels: window.labels.clone(),
        datasets: vec![
            line_dataset("Tasks Completed", completed, "#8b5cf6", "rgba(139, 92, 246, 0.1)", true),
            line_dataset("Tasks Created", created, "#f59e0b", "rgba(245, 158, 11, 0.1)", false),
        ],
    }
}

fn line_dataset(label: &str, data: Vec<i64>, border: &str, background: &str, fill: bool) -> ChartDataset {
    ChartDataset {
        label: Some(label.to_string()),
        data,
        border_color: Some(Paint::Single(border.to_string())),
        background_color: Some(Paint::Single(background.to_string())),
        border_width: Some(2),
        fill: Some(fill),
        tension: Some(0.4),
    }
}

/// Conta tarefas criadas nesta semana e na anterior: `(atual, anterior)`
fn weekly_created_counts(tasks: &[Task], bounds: &CalendarBounds) -> (usize, usize) {
    tasks
        .iter()
        .filter_map(|task| task.created_at.map(bson_to_utc))
        .fold((0, 0), |(current, previous), created_at| {
            if created_at >= bounds.week_start {
                (current + 1, previous)
            } else if created_at >= bounds.last_week_start {
                (current, previous + 1)
            } else {
                (current, previous)
            }
        })
}

/// Gráfico de rosca com os pontos dos membros. `members` já vem ordenado por
/// pontos (desc); o usuário atual é sempre a primeira fatia.
pub fn build_points_chart(members: &[User], caller_id: &str, named_slices: usize) -> ChartData {
    if members.is_empty() {
        return ChartData::placeholder("No Members", vec![ChartDataset::values(vec![1])]);
    }

    let caller = members.iter().find(|m| m.id == caller_id);
    let mut labels = vec![caller
        .map(|c| c.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "You".to_string())];
    let mut data = vec![caller.map(|c| c.points).unwrap_or(0)];

    let mut other_points = 0;
    for (index, member) in members.iter().filter(|m| m.id != caller_id).enumerate() {
        if index < named_slices {
            labels.push(if member.name.is_empty() { "Unnamed".to_string() } else { member.name.clone() });
            data.push(member.points);
        } else {
            other_points += member.points;
        }
    }
    if other_points > 0 {
        labels.push("Other Members".to_string());
        data.push(other_points);
    }

    ChartData {
        labels,
        datasets: vec![ChartDataset {
            data,
            background_color: Some(Paint::Palette(DONUT_PALETTE.iter().map(|c| c.to_string()).collect())),
            border_color: Some(Paint::Single("var(--bg)".to_string())),
            border_width: Some(2),
            ..Default::default()
        }],
    }
}

/// Posição (1-based) do usuário no ranking global por pontos
async fn user_rank(store: &dyn DocumentStore, user_id: &str) -> Result<Option<usize>, StoreError> {
    let ranking = store
        .query(&Query::collection(collections::USERS).order_by("points", Direction::Descending))
        .await?;
    Ok(ranking
        .iter()
        .position(|doc| doc.get_str("_id").ok() == Some(user_id))
        .map(|index| index + 1))
}

async fn group_points_chart(
    store: &dyn DocumentStore,
    group_id: &str,
    caller_id: &str,
    limits: &Limits,
) -> Result<ChartData, StoreError> {
    let members = match repository::find_group(store, group_id).await? {
        Some(group) if !group.members.is_empty() => group.member_window(limits.member_query_limit).to_vec(),
        _ => return Ok(build_points_chart(&[], caller_id, limits.donut_named_slices)),
    };

    let query = Query::collection(collections::USERS)
        .where_in("_id", ids_to_bson(&members))
        .order_by("points", Direction::Descending);
    let users: Vec<User> = query_as(store, &query).await?;
    Ok(build_points_chart(&users, caller_id, limits.donut_named_slices))
}

fn no_group_payload(user: &User, rank: Option<usize>) -> DashboardData {
    DashboardData {
        user_points: user.points,
        user_rank: rank,
        tasks_total: 0,
        tasks_in_progress: 0,
        tasks_completed: 0,
        tasks_due_today: 0,
        completion_rate: 0,
        points_this_week: 0,
        tasks_completed_this_week: 0,
        task_chart_data: ChartData::placeholder("No Group Selected", vec![]),
        points_chart_data: ChartData::placeholder("No Group Selected", vec![ChartDataset::values(vec![1])]),
        total_tasks_trend: "N/A".to_string(),
    }
}

/// Agrega os dados do dashboard do usuário. `now` define os limites de
/// calendário no fuso em que ele está expresso.
pub async fn get_dashboard_data<Tz: TimeZone>(
    store: &dyn DocumentStore,
    user_id: &str,
    period: Period,
    now: &DateTime<Tz>,
    limits: &Limits,
) -> AppResult<DashboardData> {
    let user = find_user(store, user_id)
        .await
        .map_err(|e| AppError::internal("Error fetching user document", "Could not fetch user data.", e))?
        .ok_or_else(|| AppError::NotFound("User data not found.".to_string()))?;

    let bounds = CalendarBounds::at(now);

    let group_id = match user.active_group() {
        Some(group_id) => group_id.to_string(),
        None => {
            log::warn!("⚠️  User {} has no active group. Returning partial data.", user_id);
            let rank = match user_rank(store, user_id).await {
                Ok(rank) => rank,
                Err(e) => {
                    log::error!("❌ Error getting rank: {}", e);
                    None
                }
            };
            return Ok(no_group_payload(&user, rank));
        }
    };

    let fail = |e: StoreError| AppError::internal("Error processing dashboard data", "Failed to fetch dashboard data.", e);

    let rank = user_rank(store, user_id).await.map_err(fail)?;

    let user_tasks: Vec<Task> = query_as(
        store,
        &Query::collection(collections::TASKS)
            .where_eq("assignee", user_id)
            .where_eq("groupId", group_id.as_str()),
    )
    .await
    .map_err(fail)?;
    let summary = summarize_user_tasks(&user_tasks, &bounds);

    let window = TrendWindow::new(period, now);
    let since = window.start.min(bounds.last_week_start);
    let group_tasks: Vec<Task> = query_as(
        store,
        &Query::collection(collections::TASKS)
            .where_eq("groupId", group_id.as_str())
            .where_gte("createdAt", utc_to_bson(since)),
    )
    .await
    .map_err(fail)?;

    let (created_this_week, created_last_week) = weekly_created_counts(&group_tasks, &bounds);
    let task_chart_data = build_task_trend(&window, &group_tasks);

    let points_chart_data = group_points_chart(store, &group_id, user_id, limits)
        .await
        .map_err(|e| AppError::internal("Error getting group points chart", "Failed to get group points.", e))?;

    Ok(DashboardData {
        user_points: user.points,
        user_rank: rank,
        tasks_total: summary.total,
        tasks_in_progress: summary.in_progress,
        tasks_completed: summary.completed,
        tasks_due_today: summary.due_today,
        completion_rate: completion_rate(summary.completed, summary.total),
        points_this_week: summary.points_this_week,
        tasks_completed_this_week: summary.completed_this_week,
        task_chart_data,
        points_chart_data,
        total_tasks_trend: trend_label(created_last_week, created_this_week),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::test_support::*;
    use mongodb::bson::{doc, Bson};

    fn member(id: &str, name: &str, points: i64) -> User {
        repository::decode(user(id, name, points)).unwrap()
    }

    #[test]
    fn test_period_defaults_to_month() {
        assert_eq!(Period::parse(Some("week")), Period::Week);
        assert_eq!(Period::parse(Some("year")), Period::Month);
        assert_eq!(Period::parse(None), Period::Month);
    }

    #[test]
    fn test_trend_label_rules() {
        assert_eq!(trend_label(4, 6), "+50% this week");
        assert_eq!(trend_label(4, 3), "-25% this week");
        assert_eq!(trend_label(3, 3), "+0% this week");
        assert_eq!(trend_label(0, 2), "+100% this week");
        assert_eq!(trend_label(0, 0), "0% this week");
        assert_eq!(trend_label(3, 0), "-100% this week");
    }

    #[test]
    fn test_completion_rate_rounds() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
    }

    #[test]
    fn test_week_window_labels_and_buckets() {
        let window = TrendWindow::new(Period::Week, &wednesday());
        assert_eq!(window.labels.first().map(String::as_str), Some("Oct 15"));
        assert_eq!(window.labels.last().map(String::as_str), Some("Oct 21"));
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap());

        let month = TrendWindow::new(Period::Month, &wednesday());
        assert_eq!(month.labels, MONTH_LABELS.to_vec());
        assert_eq!(month.start, Utc.with_ymd_and_hms(2026, 9, 24, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_donut_example() {
        let members = vec![
            member("a", "Ana", 90),
            member("b", "Bruno", 70),
            member("me", "", 50),
            member("c", "", 40),
            member("d", "Davi", 30),
            member("e", "Eva", 20),
            member("f", "Fabio", 10),
        ];
        let chart = build_points_chart(&members, "me", 4);

        assert_eq!(chart.labels, vec!["You", "Ana", "Bruno", "Unnamed", "Davi", "Other Members"]);
        assert_eq!(chart.datasets[0].data, vec![50, 90, 70, 40, 30, 30]);
        assert_eq!(chart.datasets[0].data.iter().sum::<i64>(), 310);
    }

    #[test]
    fn test_donut_omits_other_members_when_zero() {
        let members = vec![member("me", "Me", 5), member("a", "A", 3), member("z", "Z", 0)];
        let chart = build_points_chart(&members, "me", 1);
        assert_eq!(chart.labels, vec!["Me", "A"]);
        assert_eq!(chart.datasets[0].data, vec![5, 3]);
    }

    #[test]
    fn test_donut_without_members() {
        let chart = build_points_chart(&[], "me", 4);
        assert_eq!(chart.labels, vec!["No Members"]);
        assert_eq!(chart.datasets[0].data, vec![1]);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let store = MemoryStore::new();
        let err = get_dashboard_data(&store, "ghost", Period::Month, &wednesday(), &Limits::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_user_query_failure_is_internal() {
        let store = MemoryStore::new();
        store.fail_queries_on(collections::USERS);
        let err = get_dashboard_data(&store, "u1", Period::Month, &wednesday(), &Limits::default())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Internal("Could not fetch user data.".into()));
    }

    #[tokio::test]
    async fn test_no_active_group_returns_degraded_payload() {
        let store = MemoryStore::new();
        seed(&store, collections::USERS, vec![user("top", "Top", 500), user("me", "Me", 42)]).await;

        let data = get_dashboard_data(&store, "me", Period::Week, &wednesday(), &Limits::default())
            .await
            .unwrap();
        assert_eq!(data.user_points, 42);
        assert_eq!(data.user_rank, Some(2));
        assert_eq!(data.total_tasks_trend, "N/A");
        assert_eq!(data.task_chart_data.labels, vec!["No Group Selected"]);
        assert!(data.task_chart_data.datasets.is_empty());
        assert_eq!(data.points_chart_data.datasets[0].data, vec![1]);
    }

    #[tokio::test]
    async fn test_full_dashboard() {
        let store = MemoryStore::new();
        let mut me = user("me", "Me", 60);
        me.insert("activeGroupId", "g1");
        seed(&store, collections::USERS, vec![user("top", "Top", 100), me, user("b", "Bia", 30)]).await;
        seed(&store, collections::GROUPS, vec![group("g1", "me", &["me"], &["me", "b"])]).await;

        let mut done = task("t1", "g1", "me", "completed");
        done.insert("createdAt", at(2026, 10, 19, 9));
        done.insert("completedAt", at(2026, 10, 20, 9));
        done.insert("points", 25);
        let mut due = task("t2", "g1", "me", "in-progress");
        due.insert("dueDate", "2026-10-21");
        due.insert("createdAt", at(2026, 10, 13, 9));
        let mut other = task("t3", "g1", "b", "pending");
        other.insert("createdAt", at(2026, 10, 14, 9));
        let elsewhere = task("t4", "g2", "me", "pending");
        seed(&store, collections::TASKS, vec![done, due, other, elsewhere]).await;

        let data = get_dashboard_data(&store, "me", Period::Month, &wednesday(), &Limits::default())
            .await
            .unwrap();

        assert_eq!(data.user_rank, Some(2));
        assert_eq!(data.tasks_total, 2);
        assert_eq!(data.tasks_completed, 1);
        assert_eq!(data.tasks_in_progress, 1);
        assert_eq!(data.tasks_due_today, 1);
        assert_eq!(data.completion_rate, 50);
        assert_eq!(data.tasks_completed_this_week, 1);
        assert_eq!(data.points_this_week, 25);
        // 1 criada nesta semana, 2 na anterior
        assert_eq!(data.total_tasks_trend, "-50% this week");

        let completed = &data.task_chart_data.datasets[0];
        let created = &data.task_chart_data.datasets[1];
        assert_eq!(completed.label.as_deref(), Some("Tasks Completed"));
        assert_eq!(created.data, vec![0, 0, 2, 1]);
        assert_eq!(completed.data, vec![0, 0, 0, 1]);

        assert_eq!(data.points_chart_data.labels, vec!["Me", "Bia"]);
        assert_eq!(data.points_chart_data.datasets[0].data, vec![60, 30]);
    }

    fn trend_task(id: &str, status: &str, created: Bson, completed: Option<Bson>) -> Task {
        let mut document = task(id, "g1", "me", status);
        document.insert("createdAt", created);
        if let Some(completed) = completed {
            document.insert("completedAt", completed);
        }
        repository::decode(document).unwrap()
    }

    #[test]
    fn test_week_trend_counts_daily_buckets() {
        let window = TrendWindow::new(Period::Week, &wednesday());
        let tasks = vec![
            // criada 15/10, concluída 17/10
            trend_task("a", "completed", at(2026, 10, 15, 10), Some(at(2026, 10, 17, 10))),
            trend_task("b", "pending", at(2026, 10, 21, 8), None),
            // criada antes da janela: não conta nem como concluída
            trend_task("c", "completed", at(2026, 10, 10, 9), Some(at(2026, 10, 16, 9))),
            // concluída depois do último bucket
            trend_task("d", "completed", at(2026, 10, 20, 9), Some(at(2026, 10, 22, 1))),
            // completedAt sem status completed é ignorado
            trend_task("e", "in-progress", at(2026, 10, 18, 9), Some(at(2026, 10, 19, 9))),
        ];

        let chart = build_task_trend(&window, &tasks);
        assert_eq!(chart.labels.len(), 7);
        assert_eq!(chart.datasets[0].label.as_deref(), Some("Tasks Completed"));
        assert_eq!(chart.datasets[0].data, vec![0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(chart.datasets[1].data, vec![1, 0, 0, 1, 0, 1, 1]);
    }

    #[test]
    fn test_week_trend_bucket_edges() {
        let window = TrendWindow::new(Period::Week, &wednesday());
        let tasks = vec![
            trend_task("first", "completed", at(2026, 10, 15, 0), Some(at(2026, 10, 21, 23))),
            trend_task("before", "pending", at(2026, 10, 14, 23), None),
        ];

        let chart = build_task_trend(&window, &tasks);
        assert_eq!(chart.datasets[1].data, vec![1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(chart.datasets[0].data, vec![0, 0, 0, 0, 0, 0, 1]);
    }

    #[tokio::test]
    async fn test_dashboard_tolerates_string_timestamps() {
        let store = MemoryStore::new();
        let mut me = user("me", "Me", 60);
        me.insert("activeGroupId", "g1");
        seed(&store, collections::USERS, vec![me]).await;
        seed(&store, collections::GROUPS, vec![group("g1", "me", &["me"], &["me"])]).await;

        let mut done = task("t1", "g1", "me", "completed");
        done.insert("createdAt", "2026-10-20T09:00:00Z");
        done.insert("completedAt", "2026-10-20T12:00:00Z");
        let mut odd = task("t2", "g1", "me", "pending");
        odd.insert("createdAt", "sometime last week");
        let mut dated = task("t3", "g1", "me", "pending");
        dated.insert("createdAt", at(2026, 10, 19, 9));
        seed(&store, collections::TASKS, vec![done, odd, dated]).await;

        let data = get_dashboard_data(&store, "me", Period::Week, &wednesday(), &Limits::default())
            .await
            .unwrap();

        assert_eq!(data.tasks_total, 3);
        assert_eq!(data.tasks_completed, 1);
        assert_eq!(data.tasks_completed_this_week, 1);
        assert_eq!(data.points_this_week, 10);
        assert_eq!(data.task_chart_data.datasets[1].data.iter().sum::<i64>(), 1);
    }

    #[tokio::test]
    async fn test_points_chart_failure_is_reported() {
        let store = MemoryStore::new();
        seed(&store, collections::USERS, vec![doc! { "_id": "me", "activeGroupId": "g1" }]).await;
        store.fail_queries_on(collections::GROUPS);

        let err = get_dashboard_data(&store, "me", Period::Week, &wednesday(), &Limits::default())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Internal("Failed to get group points.".into()));
    }
}
