/// Tag listing
use crate::{
    api::response::ApiResponse, auth::AuthUser, context::AppContext, db::models::Tag,
    error::ApiResult,
};
use axum::{extract::State, routing::get, Router};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/user/tags", get(get_tags))
}

async fn get_tags(State(ctx): State<AppContext>, auth: AuthUser) -> ApiResult<ApiResponse<Vec<Tag>>> {
    let tags = ctx.tasks.get_tags(&auth.user_id).await?;
    Ok(ApiResponse::ok("tags received", tags))
}
