/// List endpoints, plus task creation in the default list
use crate::{
    api::{
        extract::{Page, ValidatedJson},
        response::ApiResponse,
        tasks::CreateTaskRequest,
    },
    auth::AuthUser,
    context::AppContext,
    db::models::{List, TaskResponse},
    error::ApiResult,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/user/lists", get(get_lists).post(create_list))
        .route(
            "/user/lists/default",
            get(get_default_list).post(create_task_in_default_list),
        )
        .route(
            "/user/lists/:list_id",
            get(get_list).patch(update_list).delete(delete_list),
        )
        .route("/user/lists/:list_id/tasks", get(get_list_tasks))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub title: String,
}

async fn create_list(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<ListRequest>,
) -> ApiResult<ApiResponse<List>> {
    let list = ctx.lists.create_list(&auth.user_id, req.title.trim()).await?;
    Ok(ApiResponse::created("list created", list))
}

async fn get_lists(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Page(page): Page,
) -> ApiResult<ApiResponse<Vec<List>>> {
    let lists = ctx.lists.get_lists(&auth.user_id, &page).await?;
    Ok(ApiResponse::ok("lists received", lists))
}

async fn get_default_list(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<ApiResponse<List>> {
    let list = ctx.lists.get_default_list(&auth.user_id).await?;
    Ok(ApiResponse::ok("default list received", list))
}

/// Create a task under the default heading of the default list
async fn create_task_in_default_list(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<TaskResponse>> {
    let task = ctx
        .tasks
        .create_task(&auth.user_id, req.into_input(None, None))
        .await?;
    Ok(ApiResponse::created("task created", task))
}

async fn get_list(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(list_id): Path<String>,
) -> ApiResult<ApiResponse<List>> {
    let list = ctx.lists.get_list(&list_id, &auth.user_id).await?;
    Ok(ApiResponse::ok("list received", list))
}

async fn update_list(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(list_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ListRequest>,
) -> ApiResult<ApiResponse<List>> {
    let list = ctx
        .lists
        .update_list(&list_id, &auth.user_id, req.title.trim())
        .await?;
    Ok(ApiResponse::ok("list updated", list))
}

async fn delete_list(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(list_id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    ctx.lists.delete_list(&list_id, &auth.user_id).await?;
    Ok(ApiResponse::ok("list deleted", ()))
}

async fn get_list_tasks(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(list_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<TaskResponse>>> {
    let tasks = ctx.tasks.get_tasks_by_list(&list_id, &auth.user_id).await?;
    Ok(ApiResponse::ok("tasks received", tasks))
}
