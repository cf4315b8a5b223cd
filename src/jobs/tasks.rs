/// Background task implementations
use crate::{context::AppContext, db, error::ApiResult};

/// Hard-delete refresh sessions past their expiry
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> ApiResult<u64> {
    let mut conn = ctx.db.acquire().await?;
    db::users::delete_expired_sessions(&mut conn, ctx.clock.now()).await
}

/// Drop limiter entries for idle clients; returns how many remain
pub fn shrink_rate_limiter(ctx: &AppContext) -> usize {
    ctx.rate_limiter.retain_recent()
}
