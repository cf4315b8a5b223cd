/// Service-level behaviour against a real PostgreSQL store
///
/// Run with `DATABASE_URL` pointing at a disposable database; without it the
/// tests return early.
mod common;

use std::time::Duration;

use chrono::NaiveDate;
use common::{context_on, date, register_user, unique_email};
use tasklane::{
    db,
    error::ApiError,
    pagination::Pagination,
    service::{
        tasks::{archive_tasks_in, ArchiveScope},
        CreateTaskInput, UpdateTaskInput, UpdateTaskTimeInput,
    },
    AppContext,
};
use tokio_test::{assert_err, assert_ok};

async fn task_in_inbox(ctx: &AppContext, user_id: &str, title: &str, tags: &[&str]) -> String {
    let input = CreateTaskInput {
        title: title.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..CreateTaskInput::default()
    };
    ctx.tasks.create_task(user_id, input).await.unwrap().id
}

async fn dated_task(
    ctx: &AppContext,
    user_id: &str,
    title: &str,
    start_date: Option<NaiveDate>,
    deadline: Option<NaiveDate>,
) -> String {
    let input = CreateTaskInput {
        title: title.to_string(),
        start_date,
        deadline,
        ..CreateTaskInput::default()
    };
    ctx.tasks.create_task(user_id, input).await.unwrap().id
}

async fn default_heading_id(ctx: &AppContext, list_id: &str, user_id: &str) -> String {
    let headings = ctx
        .headings
        .get_headings(list_id, user_id, &Pagination::default())
        .await
        .unwrap();
    headings.into_iter().find(|h| h.is_default).unwrap().id
}

/// Pretend a task was last touched `days` ago
async fn backdate_update(ctx: &AppContext, task_id: &str, days: i32) {
    sqlx::query("UPDATE tasks SET updated_at = now() - make_interval(days => $2) WHERE id = $1")
        .bind(task_id)
        .bind(days)
        .execute(&ctx.db)
        .await
        .unwrap();
}

/// Month bucket of `now() - days`, computed by the database itself
async fn db_month(ctx: &AppContext, days: i32) -> NaiveDate {
    sqlx::query_scalar(
        "SELECT date_trunc('month', (now() - make_interval(days => $1)) AT TIME ZONE 'UTC')::date",
    )
    .bind(days)
    .fetch_one(&ctx.db)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_task_without_parents_lands_in_inbox() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("parents")).await;

    let task_id = task_in_inbox(&ctx, &user_id, "loose", &[]).await;
    let task = ctx.tasks.get_task(&task_id, &user_id).await.unwrap();
    let inbox = ctx.lists.get_default_list(&user_id).await.unwrap();

    assert_eq!(task.list_id, inbox.id);
    let headings = ctx
        .headings
        .get_headings(&inbox.id, &user_id, &Pagination::default())
        .await
        .unwrap();
    assert_eq!(headings.len(), 1);
    assert_eq!(task.heading_id, headings[0].id);
    assert!(task.tags.is_empty());
}

#[tokio::test]
async fn test_update_task_is_idempotent() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("idem")).await;
    let task_id = task_in_inbox(&ctx, &user_id, "before", &["old"]).await;

    let input = UpdateTaskInput {
        title: Some("after".to_string()),
        deadline: Some(Some(date(2025, 2, 1))),
        tags: Some(Some(vec!["Work".to_string(), "home".to_string()])),
        ..UpdateTaskInput::default()
    };

    let first = ctx.tasks.update_task(&task_id, &user_id, input.clone()).await.unwrap();
    let second = ctx.tasks.update_task(&task_id, &user_id, input).await.unwrap();

    assert_eq!(first.title, second.title);
    assert_eq!(first.deadline, second.deadline);
    assert_eq!(first.tags, second.tags);

    let mut tags = second.tags.clone();
    tags.sort();
    assert_eq!(tags, vec!["home".to_string(), "work".to_string()]);
}

#[tokio::test]
async fn test_tags_are_case_insensitive() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("case")).await;
    let upper = task_in_inbox(&ctx, &user_id, "upper", &["Work"]).await;
    let lower = task_in_inbox(&ctx, &user_id, "lower", &["work", "WORK"]).await;

    let upper = ctx.tasks.get_task(&upper, &user_id).await.unwrap();
    let lower = ctx.tasks.get_task(&lower, &user_id).await.unwrap();
    assert_eq!(upper.tags, vec!["work".to_string()]);
    assert_eq!(lower.tags, upper.tags);

    let tags = ctx.tasks.get_tags(&user_id).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].title, "work");
}

#[tokio::test]
async fn test_null_tags_unlink_everything() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("untag")).await;
    let task_id = task_in_inbox(&ctx, &user_id, "tagged", &["a", "b"]).await;

    let input = UpdateTaskInput {
        tags: Some(None),
        ..UpdateTaskInput::default()
    };
    let task = ctx.tasks.update_task(&task_id, &user_id, input).await.unwrap();
    assert!(task.tags.is_empty());

    // The tags themselves survive
    assert_eq!(ctx.tasks.get_tags(&user_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_archived_task_leaves_live_reads() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("archive")).await;
    let task_id = task_in_inbox(&ctx, &user_id, "doomed", &[]).await;

    assert_ok!(ctx.tasks.archive_task(&task_id, &user_id).await);

    let err = assert_err!(ctx.tasks.get_task(&task_id, &user_id).await);
    assert!(matches!(err, ApiError::TaskNotFound));

    let archived = ctx
        .tasks
        .get_archived_tasks(&user_id, &Pagination::default())
        .await
        .unwrap();
    assert!(archived
        .iter()
        .flat_map(|group| group.tasks.iter())
        .any(|task| task.id == task_id));

    // Archiving twice finds nothing live to archive
    let err = assert_err!(ctx.tasks.archive_task(&task_id, &user_id).await);
    assert!(matches!(err, ApiError::TaskNotFound));
}

#[tokio::test]
async fn test_completed_task_stays_readable() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("complete")).await;
    let task_id = task_in_inbox(&ctx, &user_id, "done", &[]).await;

    let task = ctx.tasks.complete_task(&task_id, &user_id).await.unwrap();
    assert_eq!(task.status_id, 3);
    assert!(!task.overdue);

    assert_ok!(ctx.tasks.get_task(&task_id, &user_id).await);
    let completed = ctx
        .tasks
        .get_completed_tasks(&user_id, &Pagination::default())
        .await
        .unwrap();
    assert!(completed
        .iter()
        .flat_map(|group| group.tasks.iter())
        .any(|task| task.id == task_id));
}

#[tokio::test]
async fn test_pagination_boundaries() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("page")).await;
    let first = task_in_inbox(&ctx, &user_id, "one", &[]).await;
    let second = task_in_inbox(&ctx, &user_id, "two", &[]).await;

    let empty = ctx
        .tasks
        .get_tasks(&user_id, &Pagination { limit: 0, ..Pagination::default() })
        .await
        .unwrap();
    assert!(empty.is_empty());

    let page = ctx
        .tasks
        .get_tasks(&user_id, &Pagination { limit: 1, ..Pagination::default() })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, first.min(second.clone()));

    let last = ctx.tasks.get_tasks(&user_id, &Pagination::default()).await.unwrap();
    let last_id = last.last().map(|t| t.id.clone()).unwrap();

    let err = assert_err!(
        ctx.tasks
            .get_tasks(&user_id, &Pagination::after_id(last_id, 10))
            .await
    );
    assert!(matches!(err, ApiError::NoTasksFound));
}

#[tokio::test]
async fn test_time_range_requires_both_ends() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("range")).await;
    let task_id = task_in_inbox(&ctx, &user_id, "timed", &[]).await;

    let end = date(2025, 1, 15).and_hms_opt(10, 0, 0).unwrap().and_utc();
    let input = UpdateTaskTimeInput {
        start_time: None,
        end_time: Some(end),
    };
    let err = assert_err!(ctx.tasks.update_task_time(&task_id, &user_id, input).await);
    assert!(matches!(err, ApiError::InvalidTaskTimeRange));
}

#[tokio::test]
async fn test_deleting_list_archives_its_tasks() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("dellist")).await;

    let list = ctx.lists.create_list(&user_id, "Errands").await.unwrap();
    let input = CreateTaskInput {
        title: "milk".to_string(),
        list_id: Some(list.id.clone()),
        ..CreateTaskInput::default()
    };
    let task = ctx.tasks.create_task(&user_id, input).await.unwrap();

    assert_ok!(ctx.lists.delete_list(&list.id, &user_id).await);

    let err = assert_err!(ctx.lists.get_list(&list.id, &user_id).await);
    assert!(matches!(err, ApiError::ListNotFound));
    let err = assert_err!(ctx.tasks.get_task(&task.id, &user_id).await);
    assert!(matches!(err, ApiError::TaskNotFound));
}

#[tokio::test]
async fn test_heading_from_another_list_is_rejected() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("mismatch")).await;

    let inbox = ctx.lists.get_default_list(&user_id).await.unwrap();
    let other = ctx.lists.create_list(&user_id, "Other").await.unwrap();
    let heading = ctx
        .headings
        .create_heading(&other.id, &user_id, "Elsewhere")
        .await
        .unwrap();

    let input = CreateTaskInput {
        title: "confused".to_string(),
        list_id: Some(inbox.id),
        heading_id: Some(heading.id),
        ..CreateTaskInput::default()
    };
    let err = assert_err!(ctx.tasks.create_task(&user_id, input).await);
    assert!(matches!(err, ApiError::HeadingNotFound));
}

#[tokio::test]
async fn test_date_views_follow_the_clock() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("views")).await;

    let today = CreateTaskInput {
        title: "today".to_string(),
        start_date: Some(date(2025, 1, 15)),
        ..CreateTaskInput::default()
    };
    let today = ctx.tasks.create_task(&user_id, today).await.unwrap();

    let upcoming = CreateTaskInput {
        title: "upcoming".to_string(),
        start_date: Some(date(2025, 1, 18)),
        ..CreateTaskInput::default()
    };
    let upcoming = ctx.tasks.create_task(&user_id, upcoming).await.unwrap();

    let groups = ctx.tasks.get_tasks_for_today(&user_id).await.unwrap();
    let ids: Vec<&str> = groups
        .iter()
        .flat_map(|g| g.tasks.iter())
        .map(|t| t.id.as_str())
        .collect();
    assert!(ids.contains(&today.id.as_str()));
    assert!(!ids.contains(&upcoming.id.as_str()));

    let groups = ctx
        .tasks
        .get_upcoming_tasks(&user_id, &Pagination::default())
        .await
        .unwrap();
    let group = groups
        .iter()
        .find(|g| g.tasks.iter().any(|t| t.id == upcoming.id))
        .unwrap();
    assert_eq!(group.date, date(2025, 1, 18));
    assert!(groups
        .iter()
        .all(|g| g.tasks.iter().all(|t| t.id != today.id)));
}

#[tokio::test]
async fn test_reregistering_deleted_user_revives_account() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let email = unique_email("revive");
    let user_id = register_user(&ctx, &email).await;

    assert_ok!(ctx.identity.delete_user(&user_id).await);
    let err = assert_err!(ctx.users.get_user_by_id(&user_id).await);
    assert!(matches!(err, ApiError::UserNotFound));

    let revived = register_user(&ctx, &email).await;
    assert_eq!(revived, user_id);
    assert_ok!(ctx.lists.get_default_list(&user_id).await);
}

#[tokio::test]
async fn test_expired_sessions_are_purged() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    register_user(&ctx, &unique_email("purge")).await;

    // Test sessions live an hour, so a clock far ahead sees them all expired
    let mut conn = ctx.db.acquire().await.unwrap();
    let later = date(2030, 1, 1).and_hms_opt(0, 0, 0).unwrap().and_utc();
    let purged = db::users::delete_expired_sessions(&mut conn, later).await.unwrap();
    assert!(purged >= 1);
}

#[tokio::test]
async fn test_move_task_between_headings_of_its_list() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("reheading")).await;

    let inbox = ctx.lists.get_default_list(&user_id).await.unwrap();
    let later = ctx.headings.create_heading(&inbox.id, &user_id, "Later").await.unwrap();
    let task_id = task_in_inbox(&ctx, &user_id, "shuffle", &[]).await;

    let moved = ctx
        .tasks
        .move_task_to_another_heading(&task_id, &user_id, &later.id)
        .await
        .unwrap();
    assert_eq!(moved.heading_id, later.id);
    assert_eq!(moved.list_id, inbox.id);

    let other = ctx.lists.create_list(&user_id, "Other").await.unwrap();
    let foreign = ctx.headings.create_heading(&other.id, &user_id, "Foreign").await.unwrap();
    let err = assert_err!(
        ctx.tasks
            .move_task_to_another_heading(&task_id, &user_id, &foreign.id)
            .await
    );
    assert!(matches!(err, ApiError::HeadingNotFound));

    let task = ctx.tasks.get_task(&task_id, &user_id).await.unwrap();
    assert_eq!(task.heading_id, later.id);
}

#[tokio::test]
async fn test_move_to_list_without_heading_uses_its_default() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("relist")).await;

    let task_id = task_in_inbox(&ctx, &user_id, "travel", &["keep"]).await;
    let target = ctx.lists.create_list(&user_id, "Target").await.unwrap();
    let target_default = default_heading_id(&ctx, &target.id, &user_id).await;

    let moved = ctx
        .tasks
        .move_task_to_another_list(&task_id, &user_id, &target.id, None)
        .await
        .unwrap();
    assert_eq!(moved.list_id, target.id);
    assert_eq!(moved.heading_id, target_default);
    assert_eq!(moved.tags, vec!["keep".to_string()]);
}

#[tokio::test]
async fn test_move_waits_for_concurrent_heading_delete() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("racemove")).await;

    let inbox = ctx.lists.get_default_list(&user_id).await.unwrap();
    let doomed = ctx.headings.create_heading(&inbox.id, &user_id, "Doomed").await.unwrap();
    let task_id = task_in_inbox(&ctx, &user_id, "bystander", &[]).await;
    let inbox_default = default_heading_id(&ctx, &inbox.id, &user_id).await;

    // Hold the heading delete open while the move starts
    let mut tx = ctx.db.begin().await.unwrap();
    db::headings::delete_heading(&mut tx, &doomed.id, &user_id).await.unwrap();
    archive_tasks_in(&mut tx, ArchiveScope::Heading(&doomed.id), &user_id)
        .await
        .unwrap();

    let mover = {
        let ctx = ctx.clone();
        let task_id = task_id.clone();
        let user_id = user_id.clone();
        let heading_id = doomed.id.clone();
        tokio::spawn(async move {
            ctx.tasks
                .move_task_to_another_heading(&task_id, &user_id, &heading_id)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.commit().await.unwrap();

    let err = assert_err!(mover.await.unwrap());
    assert!(matches!(err, ApiError::HeadingNotFound));

    // The task never lands under the tombstoned heading
    let task = ctx.tasks.get_task(&task_id, &user_id).await.unwrap();
    assert_eq!(task.heading_id, inbox_default);
}

#[tokio::test]
async fn test_heading_create_waits_for_concurrent_list_delete() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("racelist")).await;
    let list = ctx.lists.create_list(&user_id, "Doomed").await.unwrap();

    let mut tx = ctx.db.begin().await.unwrap();
    db::lists::delete_list(&mut tx, &list.id, &user_id).await.unwrap();
    db::headings::delete_headings_by_list_id(&mut tx, &list.id, &user_id)
        .await
        .unwrap();

    let creator = {
        let ctx = ctx.clone();
        let list_id = list.id.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move { ctx.headings.create_heading(&list_id, &user_id, "Late").await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.commit().await.unwrap();

    let err = assert_err!(creator.await.unwrap());
    assert!(matches!(err, ApiError::ListNotFound));

    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM headings WHERE list_id = $1 AND deleted_at IS NULL",
    )
    .bind(&list.id)
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(live, 0);
}

#[tokio::test]
async fn test_heading_move_waits_for_concurrent_list_delete() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("racehmove")).await;

    let inbox = ctx.lists.get_default_list(&user_id).await.unwrap();
    let heading = ctx.headings.create_heading(&inbox.id, &user_id, "Wanderer").await.unwrap();
    let target = ctx.lists.create_list(&user_id, "Doomed").await.unwrap();

    let mut tx = ctx.db.begin().await.unwrap();
    db::lists::delete_list(&mut tx, &target.id, &user_id).await.unwrap();
    db::headings::delete_headings_by_list_id(&mut tx, &target.id, &user_id)
        .await
        .unwrap();

    let mover = {
        let ctx = ctx.clone();
        let list_id = inbox.id.clone();
        let heading_id = heading.id.clone();
        let user_id = user_id.clone();
        let target_id = target.id.clone();
        tokio::spawn(async move {
            ctx.headings
                .move_heading_to_another_list(&list_id, &heading_id, &user_id, &target_id)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.commit().await.unwrap();

    let err = assert_err!(mover.await.unwrap());
    assert!(matches!(err, ApiError::ListNotFound));

    let heading = ctx.headings.get_heading(&inbox.id, &heading.id, &user_id).await.unwrap();
    assert_eq!(heading.list_id, inbox.id);
}

#[tokio::test]
async fn test_deleting_heading_archives_its_tasks() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("delheading")).await;

    let inbox = ctx.lists.get_default_list(&user_id).await.unwrap();
    let heading = ctx.headings.create_heading(&inbox.id, &user_id, "Gone").await.unwrap();
    let input = CreateTaskInput {
        title: "swept".to_string(),
        heading_id: Some(heading.id.clone()),
        ..CreateTaskInput::default()
    };
    let task = ctx.tasks.create_task(&user_id, input).await.unwrap();

    assert_ok!(ctx.headings.delete_heading(&inbox.id, &heading.id, &user_id).await);

    let err = assert_err!(ctx.tasks.get_task(&task.id, &user_id).await);
    assert!(matches!(err, ApiError::TaskNotFound));

    let archived = ctx
        .tasks
        .get_archived_tasks(&user_id, &Pagination::default())
        .await
        .unwrap();
    let swept = archived
        .iter()
        .flat_map(|group| group.tasks.iter())
        .find(|t| t.id == task.id)
        .unwrap();
    assert_eq!(swept.status_id, 4);
}

#[tokio::test]
async fn test_archived_view_files_by_archival_month() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("archmonth")).await;
    let task_id = task_in_inbox(&ctx, &user_id, "stale", &[]).await;

    // Untouched for two months, archived now
    backdate_update(&ctx, &task_id, 62).await;
    assert_ok!(ctx.tasks.archive_task(&task_id, &user_id).await);

    let archived = ctx
        .tasks
        .get_archived_tasks(&user_id, &Pagination::default())
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].month, db_month(&ctx, 0).await);
    assert_eq!(archived[0].tasks[0].id, task_id);
}

#[tokio::test]
async fn test_completed_view_groups_by_month() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("donemonth")).await;

    let old = task_in_inbox(&ctx, &user_id, "long done", &[]).await;
    let fresh = task_in_inbox(&ctx, &user_id, "just done", &[]).await;
    task_in_inbox(&ctx, &user_id, "still open", &[]).await;
    assert_ok!(ctx.tasks.complete_task(&old, &user_id).await);
    assert_ok!(ctx.tasks.complete_task(&fresh, &user_id).await);
    backdate_update(&ctx, &old, 62).await;

    let earlier = db_month(&ctx, 62).await;
    let current = db_month(&ctx, 0).await;

    let groups = ctx
        .tasks
        .get_completed_tasks(&user_id, &Pagination::default())
        .await
        .unwrap();
    let months: Vec<NaiveDate> = groups.iter().map(|g| g.month).collect();
    assert_eq!(months, vec![earlier, current]);
    assert_eq!(groups[0].tasks.len(), 1);
    assert_eq!(groups[0].tasks[0].id, old);
    assert_eq!(groups[1].tasks.len(), 1);
    assert_eq!(groups[1].tasks[0].id, fresh);

    // The cursor month itself is excluded
    let groups = ctx
        .tasks
        .get_completed_tasks(&user_id, &Pagination::after_date(earlier, 10))
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].month, current);
}

#[tokio::test]
async fn test_someday_view_skips_dated_and_due_tasks() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("someday")).await;

    let undated = dated_task(&ctx, &user_id, "undated", None, None).await;
    let far_deadline = dated_task(&ctx, &user_id, "far", None, Some(date(2025, 2, 1))).await;
    let due_today = dated_task(&ctx, &user_id, "due", None, Some(date(2025, 1, 15))).await;
    let scheduled = dated_task(&ctx, &user_id, "scheduled", Some(date(2025, 1, 20)), None).await;

    let groups = ctx
        .tasks
        .get_tasks_for_someday(&user_id, &Pagination::default())
        .await
        .unwrap();
    let ids: Vec<&str> = groups
        .iter()
        .flat_map(|g| g.tasks.iter())
        .map(|t| t.id.as_str())
        .collect();

    assert!(ids.contains(&undated.as_str()));
    assert!(ids.contains(&far_deadline.as_str()));
    assert!(!ids.contains(&due_today.as_str()));
    assert!(!ids.contains(&scheduled.as_str()));

    // A deadline falling today belongs to the overdue view instead
    let overdue = ctx
        .tasks
        .get_overdue_tasks(&user_id, &Pagination::default())
        .await
        .unwrap();
    assert!(overdue
        .iter()
        .flat_map(|g| g.tasks.iter())
        .any(|t| t.id == due_today));
}

#[tokio::test]
async fn test_upcoming_cursor_never_reaches_back_to_today() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("upcursor")).await;

    dated_task(&ctx, &user_id, "today", Some(date(2025, 1, 15)), None).await;
    for day in [16, 18, 20] {
        dated_task(&ctx, &user_id, "later", Some(date(2025, 1, day)), None).await;
    }

    let groups = ctx
        .tasks
        .get_upcoming_tasks(&user_id, &Pagination::after_date(date(2025, 1, 18), 10))
        .await
        .unwrap();
    let dates: Vec<NaiveDate> = groups.iter().map(|g| g.date).collect();
    assert_eq!(dates, vec![date(2025, 1, 18), date(2025, 1, 20)]);

    // A cursor in the past still starts tomorrow
    let groups = ctx
        .tasks
        .get_upcoming_tasks(&user_id, &Pagination::after_date(date(2025, 1, 10), 10))
        .await
        .unwrap();
    let dates: Vec<NaiveDate> = groups.iter().map(|g| g.date).collect();
    assert_eq!(dates, vec![date(2025, 1, 16), date(2025, 1, 18), date(2025, 1, 20)]);

    let groups = ctx
        .tasks
        .get_upcoming_tasks(&user_id, &Pagination::after_date(date(2025, 1, 16), 1))
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].date, date(2025, 1, 16));
}

#[tokio::test]
async fn test_grouped_view_keeps_empty_headings() {
    let Some(ctx) = context_on(date(2025, 1, 15)).await else { return };
    let user_id = register_user(&ctx, &unique_email("emptygroup")).await;

    let inbox = ctx.lists.get_default_list(&user_id).await.unwrap();
    let empty = ctx.headings.create_heading(&inbox.id, &user_id, "Empty").await.unwrap();
    let task_id = task_in_inbox(&ctx, &user_id, "occupant", &[]).await;

    let groups = ctx
        .headings
        .get_tasks_grouped_by_headings(&inbox.id, &user_id)
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);

    let empty_group = groups.iter().find(|g| g.heading_id == empty.id).unwrap();
    assert!(!empty_group.is_default);
    assert!(empty_group.tasks.is_empty());

    let default_group = groups.iter().find(|g| g.is_default).unwrap();
    assert_eq!(default_group.tasks.len(), 1);
    assert_eq!(default_group.tasks[0].id, task_id);
}
