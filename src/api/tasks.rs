/// Task endpoints and derived views
use crate::{
    api::{
        extract::{nullable, HeadingIdQuery, ListIdQuery, OptionalHeadingIdQuery, Page, ValidatedJson},
        response::ApiResponse,
    },
    auth::AuthUser,
    context::AppContext,
    db::models::{DateTasks, ListTasks, MonthTasks, TaskResponse},
    error::{ApiError, ApiResult},
    service::{CreateTaskInput, UpdateTaskInput, UpdateTaskTimeInput},
};
use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/user/tasks", get(get_tasks))
        .route("/user/tasks/today", get(get_tasks_for_today))
        .route("/user/tasks/upcoming", get(get_upcoming_tasks))
        .route("/user/tasks/overdue", get(get_overdue_tasks))
        .route("/user/tasks/someday", get(get_tasks_for_someday))
        .route("/user/tasks/completed", get(get_completed_tasks))
        .route("/user/tasks/archived", get(get_archived_tasks))
        .route(
            "/user/tasks/:task_id",
            get(get_task).patch(update_task).delete(archive_task),
        )
        .route("/user/tasks/:task_id/time", patch(update_task_time))
        .route("/user/tasks/:task_id/move/list", patch(move_task_to_another_list))
        .route("/user/tasks/:task_id/move/heading", patch(move_task_to_another_heading))
        .route("/user/tasks/:task_id/complete", patch(complete_task))
        .route("/user/tasks/:task_id/archive", patch(archive_task))
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.iter().any(|t| t.trim().is_empty() || t.len() > 64) {
        let mut err = ValidationError::new("tags");
        err.message = Some("each tag must be 1 to 64 characters".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub title: String,
    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
}

impl CreateTaskRequest {
    /// Service input with the parents taken from the request path
    pub fn into_input(self, list_id: Option<String>, heading_id: Option<String>) -> CreateTaskInput {
        CreateTaskInput {
            title: self.title.trim().to_string(),
            description: self.description.unwrap_or_default(),
            start_date: self.start_date,
            deadline: self.deadline,
            list_id,
            heading_id,
            tags: self.tags.unwrap_or_default(),
        }
    }
}

/// Partial update body: an absent field is left alone, `null` clears it
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub deadline: Option<Option<NaiveDate>>,
    pub list_id: Option<String>,
    pub heading_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Option<Option<Vec<String>>>,
}

impl UpdateTaskRequest {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.deadline.is_none()
            && self.list_id.is_none()
            && self.heading_id.is_none()
            && self.tags.is_none()
    }

    /// Checks `validator` cannot express on doubly optional fields
    fn check_nested(&self) -> ApiResult<()> {
        let mut messages = Vec::new();
        if let Some(Some(description)) = &self.description {
            if description.len() > 10000 {
                messages.push("description: must be at most 10000 characters".to_string());
            }
        }
        if let Some(Some(tags)) = &self.tags {
            if validate_tags(tags).is_err() {
                messages.push("tags: each tag must be 1 to 64 characters".to_string());
            }
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(messages))
        }
    }

    pub fn into_input(self) -> UpdateTaskInput {
        UpdateTaskInput {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            start_date: self.start_date,
            deadline: self.deadline,
            list_id: self.list_id.filter(|v| !v.trim().is_empty()),
            heading_id: self.heading_id.filter(|v| !v.trim().is_empty()),
            tags: self.tags,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskTimeRequest {
    #[serde(default, with = "crate::datetime::option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::datetime::option")]
    pub end_time: Option<DateTime<Utc>>,
}

async fn get_tasks(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Page(page): Page,
) -> ApiResult<ApiResponse<Vec<TaskResponse>>> {
    let tasks = ctx.tasks.get_tasks(&auth.user_id, &page).await?;
    Ok(ApiResponse::ok("tasks received", tasks))
}

async fn get_tasks_for_today(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<ApiResponse<Vec<ListTasks>>> {
    let groups = ctx.tasks.get_tasks_for_today(&auth.user_id).await?;
    Ok(ApiResponse::ok("tasks for today received", groups))
}

async fn get_upcoming_tasks(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Page(page): Page,
) -> ApiResult<ApiResponse<Vec<DateTasks>>> {
    let groups = ctx.tasks.get_upcoming_tasks(&auth.user_id, &page).await?;
    Ok(ApiResponse::ok("upcoming tasks received", groups))
}

async fn get_overdue_tasks(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Page(page): Page,
) -> ApiResult<ApiResponse<Vec<ListTasks>>> {
    let groups = ctx.tasks.get_overdue_tasks(&auth.user_id, &page).await?;
    Ok(ApiResponse::ok("overdue tasks received", groups))
}

async fn get_tasks_for_someday(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Page(page): Page,
) -> ApiResult<ApiResponse<Vec<ListTasks>>> {
    let groups = ctx.tasks.get_tasks_for_someday(&auth.user_id, &page).await?;
    Ok(ApiResponse::ok("tasks for someday received", groups))
}

async fn get_completed_tasks(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Page(page): Page,
) -> ApiResult<ApiResponse<Vec<MonthTasks>>> {
    let groups = ctx.tasks.get_completed_tasks(&auth.user_id, &page).await?;
    Ok(ApiResponse::ok("completed tasks received", groups))
}

async fn get_archived_tasks(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Page(page): Page,
) -> ApiResult<ApiResponse<Vec<MonthTasks>>> {
    let groups = ctx.tasks.get_archived_tasks(&auth.user_id, &page).await?;
    Ok(ApiResponse::ok("archived tasks received", groups))
}

async fn get_task(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> ApiResult<ApiResponse<TaskResponse>> {
    let task = ctx.tasks.get_task(&task_id, &auth.user_id).await?;
    Ok(ApiResponse::ok("task received", task))
}

async fn update_task(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<TaskResponse>> {
    if req.is_empty() {
        return Err(ApiError::EmptyData);
    }
    req.check_nested()?;

    let task = ctx
        .tasks
        .update_task(&task_id, &auth.user_id, req.into_input())
        .await?;
    Ok(ApiResponse::ok("task updated", task))
}

async fn update_task_time(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTaskTimeRequest>,
) -> ApiResult<ApiResponse<TaskResponse>> {
    let input = UpdateTaskTimeInput {
        start_time: req.start_time,
        end_time: req.end_time,
    };
    let task = ctx
        .tasks
        .update_task_time(&task_id, &auth.user_id, input)
        .await?;
    Ok(ApiResponse::ok("task time updated", task))
}

async fn move_task_to_another_list(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    ListIdQuery(list_id): ListIdQuery,
    OptionalHeadingIdQuery(heading_id): OptionalHeadingIdQuery,
) -> ApiResult<ApiResponse<TaskResponse>> {
    let task = ctx
        .tasks
        .move_task_to_another_list(&task_id, &auth.user_id, &list_id, heading_id.as_deref())
        .await?;
    Ok(ApiResponse::ok("task moved to another list", task))
}

async fn move_task_to_another_heading(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    HeadingIdQuery(heading_id): HeadingIdQuery,
) -> ApiResult<ApiResponse<TaskResponse>> {
    let task = ctx
        .tasks
        .move_task_to_another_heading(&task_id, &auth.user_id, &heading_id)
        .await?;
    Ok(ApiResponse::ok("task moved to another heading", task))
}

async fn complete_task(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> ApiResult<ApiResponse<TaskResponse>> {
    let task = ctx.tasks.complete_task(&task_id, &auth.user_id).await?;
    Ok(ApiResponse::ok("task completed", task))
}

/// Archival is the only way a task is deleted
async fn archive_task(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    ctx.tasks.archive_task(&task_id, &auth.user_id).await?;
    Ok(ApiResponse::ok("task archived", ()))
}
