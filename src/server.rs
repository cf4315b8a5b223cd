/// HTTP server setup and routing
use crate::{
    api::middleware::MakeRequestUuid,
    context::AppContext,
    error::{ApiError, ApiResult, ErrorResponse},
    rate_limit::rate_limit_middleware,
};
use axum::{
    body::Body,
    http::{header, HeaderName, Method, Request, Response, StatusCode},
    middleware,
    response::IntoResponse,
    Json, Router,
};
use std::{any::Any, net::SocketAddr, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Build the main application router
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let timeout = Duration::from_secs(ctx.config.http_server.timeout);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            user_id = tracing::field::Empty,
        )
    });

    Router::new()
        .merge(crate::api::routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(ctx.clone(), rate_limit_middleware))
        .with_state(ctx)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TimeoutLayer::new(timeout))
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
}

/// 404 handler
async fn not_found() -> impl IntoResponse {
    let status = StatusCode::NOT_FOUND;
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            description: "endpoint not found".to_string(),
        }),
    )
}

/// Panics become a 500 envelope; the process keeps serving
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::Internal(detail.to_string()).into_response()
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> ApiResult<()> {
    let addr = ctx.config.http_server.address.clone();
    let idle_timeout = ctx.config.http_server.idle_timeout;

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Tasklane listening on {}", addr);
    info!("  Keep-alive idle timeout: {}s", idle_timeout);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
