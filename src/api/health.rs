/// Health check endpoints
///
/// `/health` answers as long as the process serves requests. `/health/ready`
/// additionally round-trips to the database so a load balancer can stop
/// routing to an instance that lost its store.
use crate::{api::response::ApiResponse, context::AppContext, error::ApiResult};
use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_ms: Option<u64>,
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(liveness))
        .route("/health/ready", get(readiness))
}

pub async fn liveness() -> ApiResponse<HealthStatus> {
    ApiResponse::ok(
        "service is alive",
        HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            database_ms: None,
        },
    )
}

pub async fn readiness(State(ctx): State<AppContext>) -> ApiResult<ApiResponse<HealthStatus>> {
    let start = Instant::now();
    crate::db::test_connection(&ctx.db).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    tracing::debug!(duration_ms = elapsed, "Readiness check completed");

    Ok(ApiResponse::ok(
        "service is ready",
        HealthStatus {
            status: "ready",
            version: env!("CARGO_PKG_VERSION"),
            database_ms: Some(elapsed),
        },
    ))
}
