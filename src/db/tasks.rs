/// Task persistence: single reads, paginated reads, grouped views and mutations
///
/// Every read embeds tasks as JSON built by the database (`TASK_JSON`), with
/// tag titles aggregated by a lateral sub-query, so one statement produces a
/// whole response regardless of how many tasks a group holds. `overdue` is
/// derived against the `today` the caller passes in.
use crate::{
    db::{
        headings,
        models::{DateTasks, HeadingTasks, ListTasks, MonthTasks, NewTask, TaskResponse, TaskStatus},
    },
    error::{ApiError, ApiResult},
    pagination::Pagination,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::Json, PgConnection, Postgres, QueryBuilder};

/// JSON object for task `t` joined with lateral tag aggregate `tg`.
///
/// Parameters `$1` (today), `$2` (Completed id) and `$3` (Archived id) must be
/// bound first by every statement that embeds it.
const TASK_JSON: &str = r#"json_build_object(
    'id', t.id,
    'title', t.title,
    'description', t.description,
    'start_date', t.start_date,
    'deadline', t.deadline,
    'start_time', to_char(t.start_time AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS'),
    'end_time', to_char(t.end_time AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS'),
    'status_id', t.status_id,
    'list_id', t.list_id,
    'heading_id', t.heading_id,
    'tags', COALESCE(tg.tags, ARRAY[]::text[]),
    'overdue', (t.deadline IS NOT NULL AND t.deadline <= $1::date AND t.status_id NOT IN ($2, $3)),
    'updated_at', to_char(t.updated_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS')
)"#;

const TAGS_LATERAL: &str = "LEFT JOIN LATERAL (
    SELECT array_agg(tags.title ORDER BY tt.seq) AS tags
    FROM tasks_tags tt
    JOIN tags ON tags.id = tt.tag_id AND tags.deleted_at IS NULL
    WHERE tt.task_id = t.id
) tg ON TRUE";

/// Aggregate of `TASK_JSON` over a LEFT JOIN, empty array when nothing matched
fn tasks_agg() -> String {
    format!("COALESCE(json_agg({TASK_JSON} ORDER BY t.id) FILTER (WHERE t.id IS NOT NULL), '[]'::json)")
}

/// Single-task selection with the common parameters bound
fn select_tasks(filter: &str, tail: &str) -> String {
    format!("SELECT {TASK_JSON} AS task FROM tasks t {TAGS_LATERAL} WHERE {filter} {tail}")
}

fn completed_id() -> i16 {
    TaskStatus::Completed.id()
}

fn archived_id() -> i16 {
    TaskStatus::Archived.id()
}

/// Resolve a status id from its seeded title
pub async fn get_status_id(conn: &mut PgConnection, status: TaskStatus) -> ApiResult<i16> {
    sqlx::query_scalar::<_, i16>("SELECT id FROM statuses WHERE title = $1")
        .bind(status.title())
        .fetch_optional(conn)
        .await?
        .ok_or(ApiError::TaskStatusNotFound)
}

/// Insert a task under a live heading of a live list.
pub async fn create_task(conn: &mut PgConnection, task: &NewTask) -> ApiResult<()> {
    headings::lock_live_heading(&mut *conn, &task.heading_id, &task.list_id, &task.user_id).await?;

    sqlx::query(
        "INSERT INTO tasks (id, title, description, start_date, deadline, start_time, end_time,
                            status_id, list_id, heading_id, user_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(&task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.start_date)
    .bind(task.deadline)
    .bind(task.start_time)
    .bind(task.end_time)
    .bind(task.status_id)
    .bind(&task.list_id)
    .bind(&task.heading_id)
    .bind(&task.user_id)
    .execute(conn)
    .await
    .map_err(|e| {
        if crate::db::is_check_violation(&e) {
            ApiError::InvalidTaskTimeRange
        } else {
            crate::db::map_foreign_key_error(e)
        }
    })?;

    Ok(())
}

pub async fn get_task_by_id(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    today: NaiveDate,
) -> ApiResult<TaskResponse> {
    let sql = select_tasks("t.id = $4 AND t.user_id = $5 AND t.deleted_at IS NULL", "");

    sqlx::query_scalar::<_, Json<TaskResponse>>(&sql)
        .bind(today)
        .bind(completed_id())
        .bind(archived_id())
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .map(|Json(task)| task)
        .ok_or(ApiError::TaskNotFound)
}

/// Live tasks of a user ordered by id, after the cursor
pub async fn get_tasks_by_user_id(
    conn: &mut PgConnection,
    user_id: &str,
    pagination: &Pagination,
    today: NaiveDate,
) -> ApiResult<Vec<TaskResponse>> {
    if pagination.is_empty_page() {
        return Ok(Vec::new());
    }

    let sql = select_tasks(
        "t.user_id = $4 AND t.deleted_at IS NULL AND t.id > $5",
        "ORDER BY t.id LIMIT $6",
    );

    let tasks: Vec<TaskResponse> = sqlx::query_scalar::<_, Json<TaskResponse>>(&sql)
        .bind(today)
        .bind(completed_id())
        .bind(archived_id())
        .bind(user_id)
        .bind(pagination.after_id_or_start())
        .bind(pagination.limit)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(|Json(task)| task)
        .collect();

    if tasks.is_empty() {
        return Err(ApiError::NoTasksFound);
    }

    Ok(tasks)
}

/// Live tasks of one list ordered by id
pub async fn get_tasks_by_list_id(
    conn: &mut PgConnection,
    list_id: &str,
    user_id: &str,
    today: NaiveDate,
) -> ApiResult<Vec<TaskResponse>> {
    let sql = select_tasks(
        "t.list_id = $4 AND t.user_id = $5 AND t.deleted_at IS NULL",
        "ORDER BY t.id",
    );

    let tasks = sqlx::query_scalar::<_, Json<TaskResponse>>(&sql)
        .bind(today)
        .bind(completed_id())
        .bind(archived_id())
        .bind(list_id)
        .bind(user_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(|Json(task)| task)
        .collect();

    Ok(tasks)
}

/// One group per live heading of the list, empty groups included
pub async fn get_tasks_grouped_by_headings(
    conn: &mut PgConnection,
    list_id: &str,
    user_id: &str,
    today: NaiveDate,
) -> ApiResult<Vec<HeadingTasks>> {
    let sql = format!(
        "SELECT h.id AS heading_id, h.title AS heading_title, h.is_default,
                {agg} AS tasks
         FROM headings h
         LEFT JOIN tasks t
                ON t.heading_id = h.id AND t.user_id = h.user_id AND t.deleted_at IS NULL
         {TAGS_LATERAL}
         WHERE h.list_id = $4 AND h.user_id = $5 AND h.deleted_at IS NULL
         GROUP BY h.id
         ORDER BY h.id",
        agg = tasks_agg(),
    );

    let groups = sqlx::query_as::<_, HeadingTasks>(&sql)
        .bind(today)
        .bind(completed_id())
        .bind(archived_id())
        .bind(list_id)
        .bind(user_id)
        .fetch_all(conn)
        .await?;

    // Every live list has a default heading, so no groups means no list
    if groups.is_empty() {
        return Err(ApiError::ListNotFound);
    }

    Ok(groups)
}

/// Per-list grouping shared by the today, overdue and someday views.
///
/// `task_filter` is ANDed into the join condition so lists without matching
/// tasks still produce an (empty) group.
async fn get_tasks_grouped_by_lists(
    conn: &mut PgConnection,
    user_id: &str,
    task_filter: &str,
    pagination: &Pagination,
    today: NaiveDate,
) -> ApiResult<Vec<ListTasks>> {
    if pagination.is_empty_page() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT l.id AS list_id, l.title AS list_title,
                {agg} AS tasks
         FROM lists l
         LEFT JOIN tasks t
                ON t.list_id = l.id AND t.user_id = l.user_id AND t.deleted_at IS NULL
               AND ({task_filter})
         {TAGS_LATERAL}
         WHERE l.user_id = $4 AND l.deleted_at IS NULL AND l.id > $5
         GROUP BY l.id
         ORDER BY l.id
         LIMIT $6",
        agg = tasks_agg(),
    );

    let groups = sqlx::query_as::<_, ListTasks>(&sql)
        .bind(today)
        .bind(completed_id())
        .bind(archived_id())
        .bind(user_id)
        .bind(pagination.after_id_or_start())
        .bind(pagination.limit)
        .fetch_all(conn)
        .await?;

    if groups.is_empty() {
        return Err(ApiError::NoTasksFound);
    }

    Ok(groups)
}

/// Tasks starting today that are still open, grouped by list
pub async fn get_tasks_for_today(
    conn: &mut PgConnection,
    user_id: &str,
    today: NaiveDate,
) -> ApiResult<Vec<ListTasks>> {
    let all_lists = Pagination {
        limit: i64::MAX,
        ..Pagination::default()
    };

    get_tasks_grouped_by_lists(
        conn,
        user_id,
        "t.start_date = $1::date AND t.status_id NOT IN ($2, $3)",
        &all_lists,
        today,
    )
    .await
}

/// Open tasks whose deadline has come, grouped by list
pub async fn get_overdue_tasks(
    conn: &mut PgConnection,
    user_id: &str,
    pagination: &Pagination,
    today: NaiveDate,
) -> ApiResult<Vec<ListTasks>> {
    get_tasks_grouped_by_lists(
        conn,
        user_id,
        "t.deadline <= $1::date AND t.status_id NOT IN ($2, $3)",
        pagination,
        today,
    )
    .await
}

/// Undated tasks without a looming deadline, grouped by list
pub async fn get_tasks_for_someday(
    conn: &mut PgConnection,
    user_id: &str,
    pagination: &Pagination,
    today: NaiveDate,
) -> ApiResult<Vec<ListTasks>> {
    get_tasks_grouped_by_lists(
        conn,
        user_id,
        "t.start_date IS NULL AND (t.deadline IS NULL OR t.deadline > $1::date)",
        pagination,
        today,
    )
    .await
}

/// Live tasks from tomorrow (or the cursor date, whichever is later) on,
/// grouped by start date
pub async fn get_upcoming_tasks(
    conn: &mut PgConnection,
    user_id: &str,
    pagination: &Pagination,
    today: NaiveDate,
) -> ApiResult<Vec<DateTasks>> {
    if pagination.is_empty_page() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT t.start_date AS date,
                json_agg({TASK_JSON} ORDER BY t.id) AS tasks
         FROM tasks t
         {TAGS_LATERAL}
         WHERE t.user_id = $4 AND t.deleted_at IS NULL
           AND t.start_date >= GREATEST($1::date + 1, $5::date)
         GROUP BY t.start_date
         ORDER BY t.start_date
         LIMIT $6"
    );

    let groups = sqlx::query_as::<_, DateTasks>(&sql)
        .bind(today)
        .bind(completed_id())
        .bind(archived_id())
        .bind(user_id)
        .bind(pagination.after_date_or_start())
        .bind(pagination.limit)
        .fetch_all(conn)
        .await?;

    if groups.is_empty() {
        return Err(ApiError::NoTasksFound);
    }

    Ok(groups)
}

/// Month-grouped history of one status, months strictly after the cursor's.
///
/// Completed tasks group by `updated_at`, archived ones by `deleted_at`.
async fn get_tasks_grouped_by_month(
    conn: &mut PgConnection,
    user_id: &str,
    status: TaskStatus,
    pagination: &Pagination,
    today: NaiveDate,
) -> ApiResult<Vec<MonthTasks>> {
    if pagination.is_empty_page() {
        return Ok(Vec::new());
    }

    // Completed tasks stay live and are filed by their last edit; archived
    // ones carry a tombstone and are filed by it
    let (liveness, stamp) = match status {
        TaskStatus::Archived => ("t.deleted_at IS NOT NULL", "t.deleted_at"),
        _ => ("t.deleted_at IS NULL", "t.updated_at"),
    };

    // Without a cursor the month of 0001-01-01 excludes nothing
    let sql = format!(
        "SELECT date_trunc('month', {stamp} AT TIME ZONE 'UTC')::date AS month,
                json_agg({TASK_JSON} ORDER BY t.id) AS tasks
         FROM tasks t
         {TAGS_LATERAL}
         WHERE t.user_id = $4 AND t.status_id = $5 AND {liveness}
           AND date_trunc('month', {stamp} AT TIME ZONE 'UTC')
               > date_trunc('month', $6::date::timestamp)
         GROUP BY 1
         ORDER BY 1
         LIMIT $7"
    );

    let groups = sqlx::query_as::<_, MonthTasks>(&sql)
        .bind(today)
        .bind(completed_id())
        .bind(archived_id())
        .bind(user_id)
        .bind(status.id())
        .bind(pagination.after_date_or_start())
        .bind(pagination.limit)
        .fetch_all(conn)
        .await?;

    if groups.is_empty() {
        return Err(ApiError::NoTasksFound);
    }

    Ok(groups)
}

pub async fn get_completed_tasks(
    conn: &mut PgConnection,
    user_id: &str,
    pagination: &Pagination,
    today: NaiveDate,
) -> ApiResult<Vec<MonthTasks>> {
    get_tasks_grouped_by_month(conn, user_id, TaskStatus::Completed, pagination, today).await
}

pub async fn get_archived_tasks(
    conn: &mut PgConnection,
    user_id: &str,
    pagination: &Pagination,
    today: NaiveDate,
) -> ApiResult<Vec<MonthTasks>> {
    get_tasks_grouped_by_month(conn, user_id, TaskStatus::Archived, pagination, today).await
}

/// Column changes for a partial task update.
///
/// Outer `None` means "leave untouched"; for nullable columns the inner
/// `None` clears the value.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Option<NaiveDate>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub list_id: Option<String>,
    pub heading_id: Option<String>,
}

/// Apply a partial update; `updated_at` is always bumped
pub async fn update_task(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    changes: &TaskChanges,
) -> ApiResult<()> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE tasks SET updated_at = now()");

    if let Some(title) = &changes.title {
        builder.push(", title = ").push_bind(title.clone());
    }
    if let Some(description) = &changes.description {
        builder.push(", description = ").push_bind(description.clone());
    }
    if let Some(start_date) = changes.start_date {
        builder.push(", start_date = ").push_bind(start_date);
    }
    if let Some(deadline) = changes.deadline {
        builder.push(", deadline = ").push_bind(deadline);
    }
    if let Some(list_id) = &changes.list_id {
        builder.push(", list_id = ").push_bind(list_id.clone());
    }
    if let Some(heading_id) = &changes.heading_id {
        builder.push(", heading_id = ").push_bind(heading_id.clone());
    }

    builder
        .push(" WHERE id = ")
        .push_bind(task_id.to_string())
        .push(" AND user_id = ")
        .push_bind(user_id.to_string())
        .push(" AND deleted_at IS NULL");

    let result = builder
        .build()
        .execute(conn)
        .await
        .map_err(crate::db::map_foreign_key_error)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::TaskNotFound);
    }

    Ok(())
}

/// Set both times and the matching status atomically
pub async fn update_task_time(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    status_id: i16,
) -> ApiResult<()> {
    let result = sqlx::query(
        "UPDATE tasks SET start_time = $3, end_time = $4, status_id = $5, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(start_time)
    .bind(end_time)
    .bind(status_id)
    .execute(conn)
    .await
    .map_err(|e| {
        if crate::db::is_check_violation(&e) {
            ApiError::InvalidTaskTimeRange
        } else {
            ApiError::from(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::TaskNotFound);
    }

    Ok(())
}

pub async fn move_task_to_another_list(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    list_id: &str,
    heading_id: &str,
) -> ApiResult<()> {
    headings::lock_live_heading(&mut *conn, heading_id, list_id, user_id).await?;

    let result = sqlx::query(
        "UPDATE tasks SET list_id = $3, heading_id = $4, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(list_id)
    .bind(heading_id)
    .execute(conn)
    .await
    .map_err(crate::db::map_foreign_key_error)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::TaskNotFound);
    }

    Ok(())
}

/// Move a task under another live heading of its current list.
///
/// The target heading is share-locked first, so a concurrent heading delete
/// either archives the moved task or makes this return `HeadingNotFound`.
pub async fn move_task_to_another_heading(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    heading_id: &str,
) -> ApiResult<()> {
    let list_id = sqlx::query_scalar::<_, String>(
        "SELECT list_id FROM tasks WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(ApiError::TaskNotFound)?;

    headings::lock_live_heading(&mut *conn, heading_id, &list_id, user_id).await?;

    // The list is re-checked in case the task moved lists in between
    let result = sqlx::query(
        "UPDATE tasks SET heading_id = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND list_id = $4 AND deleted_at IS NULL",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(heading_id)
    .bind(&list_id)
    .execute(&mut *conn)
    .await
    .map_err(crate::db::map_foreign_key_error)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::TaskNotFound);
    }

    Ok(())
}

/// Completion changes the status only; the task stays live
pub async fn mark_as_completed(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    status_id: i16,
) -> ApiResult<()> {
    let result = sqlx::query(
        "UPDATE tasks SET status_id = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(status_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::TaskNotFound);
    }

    Ok(())
}

/// Archival sets the status and the tombstone
pub async fn mark_as_archived(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    status_id: i16,
) -> ApiResult<()> {
    let result = sqlx::query(
        "UPDATE tasks SET status_id = $3, deleted_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(status_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::TaskNotFound);
    }

    Ok(())
}

pub async fn mark_tasks_as_archived_by_heading_id(
    conn: &mut PgConnection,
    heading_id: &str,
    user_id: &str,
    status_id: i16,
) -> ApiResult<u64> {
    let result = sqlx::query(
        "UPDATE tasks SET status_id = $3, deleted_at = now()
         WHERE heading_id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(heading_id)
    .bind(user_id)
    .bind(status_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn mark_tasks_as_archived_by_list_id(
    conn: &mut PgConnection,
    list_id: &str,
    user_id: &str,
    status_id: i16,
) -> ApiResult<u64> {
    let result = sqlx::query(
        "UPDATE tasks SET status_id = $3, deleted_at = now()
         WHERE list_id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(list_id)
    .bind(user_id)
    .bind(status_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_tasks_keeps_common_parameters_first() {
        let sql = select_tasks("t.id = $4", "");
        assert!(sql.contains("$1::date"));
        assert!(sql.contains("NOT IN ($2, $3)"));
        assert!(sql.contains("WHERE t.id = $4"));
        assert!(sql.contains("LEFT JOIN LATERAL"));
    }

    #[test]
    fn test_tasks_agg_preserves_empty_groups() {
        let agg = tasks_agg();
        assert!(agg.starts_with("COALESCE(json_agg("));
        assert!(agg.contains("FILTER (WHERE t.id IS NOT NULL)"));
        assert!(agg.ends_with("'[]'::json)"));
    }
}
