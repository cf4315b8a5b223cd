/// Self-profile endpoints
use crate::{
    api::{extract::ValidatedJson, response::ApiResponse},
    auth::AuthUser,
    context::AppContext,
    db::models::User,
    error::{ApiError, ApiResult},
    identity::UserChanges,
};
use axum::{extract::State, routing::get, Router};
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/user", get(get_user).patch(update_user).delete(delete_user))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: Option<String>,
}

async fn get_user(State(ctx): State<AppContext>, auth: AuthUser) -> ApiResult<ApiResponse<User>> {
    let user = ctx.identity.get_user(&auth.user_id).await?;
    Ok(ApiResponse::ok("user received", user))
}

async fn update_user(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    if req.email.is_none() && req.password.is_none() {
        return Err(ApiError::EmptyData);
    }

    let changes = UserChanges {
        email: req.email.map(|e| e.trim().to_string()),
        password: req.password,
    };
    let user = ctx.identity.update_user(&auth.user_id, changes).await?;

    Ok(ApiResponse::ok("user updated", user))
}

async fn delete_user(State(ctx): State<AppContext>, auth: AuthUser) -> ApiResult<ApiResponse<()>> {
    ctx.identity.delete_user(&auth.user_id).await?;
    Ok(ApiResponse::ok("user deleted", ()))
}
