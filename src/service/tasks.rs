/// Task domain service
///
/// Task writes that touch several tables (task row, tags, links) run in one
/// transaction. Reads pass the service clock's `today` down so `overdue` and
/// the date-based views agree with each other within a request.
use crate::{
    clock::Clock,
    db::{
        self,
        models::{DateTasks, ListTasks, MonthTasks, NewTask, Tag, TaskResponse, TaskStatus},
        tasks::TaskChanges,
    },
    error::{ApiError, ApiResult},
    ksuid,
    pagination::Pagination,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::{debug, info};

/// Input for task creation; unset parents resolve to defaults
#[derive(Debug, Clone, Default)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub list_id: Option<String>,
    pub heading_id: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update. Outer `None` leaves a field alone; inner `None` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub list_id: Option<String>,
    pub heading_id: Option<String>,
    pub tags: Option<Option<Vec<String>>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTaskTimeInput {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl UpdateTaskTimeInput {
    /// Status implied by the shape of the time range
    pub fn target_status(&self) -> ApiResult<TaskStatus> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start < end => Ok(TaskStatus::Planned),
            (None, None) => Ok(TaskStatus::NotStarted),
            _ => Err(ApiError::InvalidTaskTimeRange),
        }
    }
}

/// Split a tag reconcile into the titles to link and the titles to unlink
pub fn tag_changes(current: &[String], updated: &[String]) -> (Vec<String>, Vec<String>) {
    let current = db::tags::canonical_titles(current);
    let updated = db::tags::canonical_titles(updated);

    let to_add = updated.iter().filter(|t| !current.contains(t)).cloned().collect();
    let to_remove = current.iter().filter(|t| !updated.contains(t)).cloned().collect();

    (to_add, to_remove)
}

/// Resolve the `(list_id, heading_id)` pair a task should live under.
///
/// A named heading decides the list; a list alone means its default heading.
/// Both named must agree.
async fn resolve_parents(
    conn: &mut PgConnection,
    user_id: &str,
    list_id: Option<&str>,
    heading_id: Option<&str>,
) -> ApiResult<(String, String)> {
    match (list_id, heading_id) {
        (list_id, Some(heading_id)) => {
            let heading = db::headings::get_heading_by_id(&mut *conn, heading_id, user_id).await?;
            if list_id.is_some_and(|l| l != heading.list_id) {
                return Err(ApiError::HeadingNotFound);
            }
            Ok((heading.list_id, heading.id))
        }
        (Some(list_id), None) => {
            let list = db::lists::get_list_by_id(&mut *conn, list_id, user_id).await?;
            let heading_id = db::headings::get_default_heading_id(conn, &list.id, user_id).await?;
            Ok((list.id, heading_id))
        }
        (None, None) => {
            let list_id = db::lists::get_default_list_id(&mut *conn, user_id).await?;
            let heading_id = db::headings::get_default_heading_id(conn, &list_id, user_id).await?;
            Ok((list_id, heading_id))
        }
    }
}

/// Live tasks a cascading delete archives
#[derive(Debug, Clone, Copy)]
pub enum ArchiveScope<'a> {
    Heading(&'a str),
    List(&'a str),
}

/// Archive every live task in `scope` on the caller's transaction
pub async fn archive_tasks_in(
    conn: &mut PgConnection,
    scope: ArchiveScope<'_>,
    user_id: &str,
) -> ApiResult<u64> {
    let status_id = db::tasks::get_status_id(&mut *conn, TaskStatus::Archived).await?;
    match scope {
        ArchiveScope::Heading(heading_id) => {
            db::tasks::mark_tasks_as_archived_by_heading_id(conn, heading_id, user_id, status_id)
                .await
        }
        ArchiveScope::List(list_id) => {
            db::tasks::mark_tasks_as_archived_by_list_id(conn, list_id, user_id, status_id).await
        }
    }
}

/// Task manager service
pub struct TaskManager {
    db: PgPool,
    clock: Arc<dyn Clock>,
}

impl TaskManager {
    pub fn new(db: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Create a task, creating missing tags and linking them in input order
    pub async fn create_task(&self, user_id: &str, input: CreateTaskInput) -> ApiResult<TaskResponse> {
        let mut tx = self.db.begin().await?;

        let (list_id, heading_id) = resolve_parents(
            &mut tx,
            user_id,
            input.list_id.as_deref(),
            input.heading_id.as_deref(),
        )
        .await?;
        let status_id = db::tasks::get_status_id(&mut tx, TaskStatus::NotStarted).await?;

        let tags = db::tags::canonical_titles(&input.tags);
        for title in &tags {
            db::tags::create_tag(&mut tx, title, user_id).await?;
        }

        let task = NewTask {
            id: ksuid::new_id(),
            title: input.title,
            description: input.description,
            start_date: input.start_date,
            deadline: input.deadline,
            status_id,
            list_id,
            heading_id,
            user_id: user_id.to_string(),
            ..NewTask::default()
        };

        db::tasks::create_task(&mut tx, &task).await.map_err(|e| match e {
            ApiError::Database(err) => {
                tracing::error!(error = %err, "Task insert failed");
                ApiError::FailedToCreateTask
            }
            other => other,
        })?;
        db::tags::link_tags_to_task(&mut tx, &task.id, user_id, &tags).await?;

        let created = db::tasks::get_task_by_id(&mut tx, &task.id, user_id, self.today()).await?;
        tx.commit().await?;

        info!(task_id = %created.id, list_id = %created.list_id, "Created task");
        Ok(created)
    }

    pub async fn get_task(&self, task_id: &str, user_id: &str) -> ApiResult<TaskResponse> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_task_by_id(&mut conn, task_id, user_id, self.today()).await
    }

    pub async fn get_tasks(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> ApiResult<Vec<TaskResponse>> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_tasks_by_user_id(&mut conn, user_id, pagination, self.today()).await
    }

    /// Live tasks of a list; the list itself must be live
    pub async fn get_tasks_by_list(
        &self,
        list_id: &str,
        user_id: &str,
    ) -> ApiResult<Vec<TaskResponse>> {
        let mut conn = self.db.acquire().await?;
        db::lists::get_list_by_id(&mut conn, list_id, user_id).await?;
        db::tasks::get_tasks_by_list_id(&mut conn, list_id, user_id, self.today()).await
    }

    pub async fn get_tasks_for_today(&self, user_id: &str) -> ApiResult<Vec<ListTasks>> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_tasks_for_today(&mut conn, user_id, self.today()).await
    }

    pub async fn get_upcoming_tasks(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> ApiResult<Vec<DateTasks>> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_upcoming_tasks(&mut conn, user_id, pagination, self.today()).await
    }

    pub async fn get_overdue_tasks(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> ApiResult<Vec<ListTasks>> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_overdue_tasks(&mut conn, user_id, pagination, self.today()).await
    }

    pub async fn get_tasks_for_someday(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> ApiResult<Vec<ListTasks>> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_tasks_for_someday(&mut conn, user_id, pagination, self.today()).await
    }

    pub async fn get_completed_tasks(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> ApiResult<Vec<MonthTasks>> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_completed_tasks(&mut conn, user_id, pagination, self.today()).await
    }

    pub async fn get_archived_tasks(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> ApiResult<Vec<MonthTasks>> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_archived_tasks(&mut conn, user_id, pagination, self.today()).await
    }

    /// Apply a partial update and reconcile tags by set difference
    pub async fn update_task(
        &self,
        task_id: &str,
        user_id: &str,
        input: UpdateTaskInput,
    ) -> ApiResult<TaskResponse> {
        let mut tx = self.db.begin().await?;

        let mut changes = TaskChanges {
            title: input.title,
            description: input.description.map(Option::unwrap_or_default),
            start_date: input.start_date,
            deadline: input.deadline,
            ..TaskChanges::default()
        };

        if input.list_id.is_some() || input.heading_id.is_some() {
            let (list_id, heading_id) = resolve_parents(
                &mut tx,
                user_id,
                input.list_id.as_deref(),
                input.heading_id.as_deref(),
            )
            .await?;
            db::headings::lock_live_heading(&mut tx, &heading_id, &list_id, user_id).await?;
            changes.list_id = Some(list_id);
            changes.heading_id = Some(heading_id);
        }

        let (to_add, to_remove) = match &input.tags {
            Some(updated) => {
                let current = db::tags::get_tags_by_task_id(&mut tx, task_id, user_id).await?;
                let updated = updated.as_deref().unwrap_or_default();
                tag_changes(&current, updated)
            }
            None => (Vec::new(), Vec::new()),
        };

        for title in &to_add {
            db::tags::create_tag(&mut tx, title, user_id).await?;
        }

        db::tasks::update_task(&mut tx, task_id, user_id, &changes).await?;

        db::tags::unlink_tags_from_task(&mut tx, task_id, user_id, &to_remove).await?;
        db::tags::link_tags_to_task(&mut tx, task_id, user_id, &to_add).await?;

        let task = db::tasks::get_task_by_id(&mut tx, task_id, user_id, self.today()).await?;
        tx.commit().await?;

        debug!(
            task_id,
            added = to_add.len(),
            removed = to_remove.len(),
            "Updated task"
        );
        Ok(task)
    }

    /// Set or clear the time range; the status follows its shape
    pub async fn update_task_time(
        &self,
        task_id: &str,
        user_id: &str,
        input: UpdateTaskTimeInput,
    ) -> ApiResult<TaskResponse> {
        let status = input.target_status()?;

        let mut tx = self.db.begin().await?;
        let status_id = db::tasks::get_status_id(&mut tx, status).await?;
        db::tasks::update_task_time(
            &mut tx,
            task_id,
            user_id,
            input.start_time,
            input.end_time,
            status_id,
        )
        .await?;
        let task = db::tasks::get_task_by_id(&mut tx, task_id, user_id, self.today()).await?;
        tx.commit().await?;

        Ok(task)
    }

    /// Move a task to another list, under `heading_id` or the list's default
    pub async fn move_task_to_another_list(
        &self,
        task_id: &str,
        user_id: &str,
        list_id: &str,
        heading_id: Option<&str>,
    ) -> ApiResult<TaskResponse> {
        let mut tx = self.db.begin().await?;

        let (list_id, heading_id) =
            resolve_parents(&mut tx, user_id, Some(list_id), heading_id).await?;
        db::tasks::move_task_to_another_list(&mut tx, task_id, user_id, &list_id, &heading_id)
            .await?;
        let task = db::tasks::get_task_by_id(&mut tx, task_id, user_id, self.today()).await?;
        tx.commit().await?;

        Ok(task)
    }

    /// Move a task under another heading of the list it is already in
    pub async fn move_task_to_another_heading(
        &self,
        task_id: &str,
        user_id: &str,
        heading_id: &str,
    ) -> ApiResult<TaskResponse> {
        let mut tx = self.db.begin().await?;
        db::tasks::move_task_to_another_heading(&mut tx, task_id, user_id, heading_id).await?;
        let task = db::tasks::get_task_by_id(&mut tx, task_id, user_id, self.today()).await?;
        tx.commit().await?;

        Ok(task)
    }

    pub async fn complete_task(&self, task_id: &str, user_id: &str) -> ApiResult<TaskResponse> {
        let mut tx = self.db.begin().await?;
        let status_id = db::tasks::get_status_id(&mut tx, TaskStatus::Completed).await?;
        db::tasks::mark_as_completed(&mut tx, task_id, user_id, status_id).await?;
        let task = db::tasks::get_task_by_id(&mut tx, task_id, user_id, self.today()).await?;
        tx.commit().await?;

        Ok(task)
    }

    /// Archive a task; it leaves every live view
    pub async fn archive_task(&self, task_id: &str, user_id: &str) -> ApiResult<()> {
        let mut conn = self.db.acquire().await?;
        let status_id = db::tasks::get_status_id(&mut conn, TaskStatus::Archived).await?;
        db::tasks::mark_as_archived(&mut conn, task_id, user_id, status_id).await
    }

    /// Live tags of the user
    pub async fn get_tags(&self, user_id: &str) -> ApiResult<Vec<Tag>> {
        let mut conn = self.db.acquire().await?;
        db::tags::get_tags_by_user_id(&mut conn, user_id).await
    }
}
