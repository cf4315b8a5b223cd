/// Heading endpoints nested under a list
use crate::{
    api::{
        extract::{ListIdQuery, Page, ValidatedJson},
        response::ApiResponse,
        tasks::CreateTaskRequest,
    },
    auth::AuthUser,
    context::AppContext,
    db::models::{Heading, HeadingTasks, TaskResponse},
    error::ApiResult,
};
use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/user/lists/:list_id/headings",
            get(get_headings).post(create_heading),
        )
        .route(
            "/user/lists/:list_id/headings/tasks",
            get(get_tasks_grouped_by_headings),
        )
        .route(
            "/user/lists/:list_id/headings/:heading_id",
            get(get_heading)
                .patch(update_heading)
                .delete(delete_heading)
                .post(create_task),
        )
        .route(
            "/user/lists/:list_id/headings/:heading_id/move",
            patch(move_heading),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct HeadingRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub title: String,
}

async fn create_heading(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(list_id): Path<String>,
    ValidatedJson(req): ValidatedJson<HeadingRequest>,
) -> ApiResult<ApiResponse<Heading>> {
    let heading = ctx
        .headings
        .create_heading(&list_id, &auth.user_id, req.title.trim())
        .await?;
    Ok(ApiResponse::created("heading created", heading))
}

async fn get_headings(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(list_id): Path<String>,
    Page(page): Page,
) -> ApiResult<ApiResponse<Vec<Heading>>> {
    let headings = ctx
        .headings
        .get_headings(&list_id, &auth.user_id, &page)
        .await?;
    Ok(ApiResponse::ok("headings received", headings))
}

async fn get_tasks_grouped_by_headings(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(list_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<HeadingTasks>>> {
    let groups = ctx
        .headings
        .get_tasks_grouped_by_headings(&list_id, &auth.user_id)
        .await?;
    Ok(ApiResponse::ok("tasks grouped by headings received", groups))
}

async fn get_heading(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((list_id, heading_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Heading>> {
    let heading = ctx
        .headings
        .get_heading(&list_id, &heading_id, &auth.user_id)
        .await?;
    Ok(ApiResponse::ok("heading received", heading))
}

async fn update_heading(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((list_id, heading_id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<HeadingRequest>,
) -> ApiResult<ApiResponse<Heading>> {
    let heading = ctx
        .headings
        .update_heading(&list_id, &heading_id, &auth.user_id, req.title.trim())
        .await?;
    Ok(ApiResponse::ok("heading updated", heading))
}

async fn move_heading(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((list_id, heading_id)): Path<(String, String)>,
    ListIdQuery(target_list_id): ListIdQuery,
) -> ApiResult<ApiResponse<Heading>> {
    let heading = ctx
        .headings
        .move_heading_to_another_list(&list_id, &heading_id, &auth.user_id, &target_list_id)
        .await?;
    Ok(ApiResponse::ok("heading moved", heading))
}

async fn delete_heading(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((list_id, heading_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<()>> {
    ctx.headings
        .delete_heading(&list_id, &heading_id, &auth.user_id)
        .await?;
    Ok(ApiResponse::ok("heading deleted", ()))
}

/// Create a task under this heading
async fn create_task(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((list_id, heading_id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<TaskResponse>> {
    let task = ctx
        .tasks
        .create_task(&auth.user_id, req.into_input(Some(list_id), Some(heading_id)))
        .await?;
    Ok(ApiResponse::created("task created", task))
}
