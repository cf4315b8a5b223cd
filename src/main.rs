/// Tasklane server binary
use std::sync::Arc;
use tasklane::{
    config::{Env, ServerConfig},
    error::ApiResult,
    jobs, server, AppContext,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ServerConfig::from_env()?;

    init_logging(config.env);

    tracing::info!("Starting Tasklane v{} ({:?})", env!("CARGO_PKG_VERSION"), config.env);

    let ctx = Arc::new(AppContext::new(config).await?);

    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;

    Ok(())
}

/// Human-readable debug logs locally, JSON elsewhere; RUST_LOG overrides the level
fn init_logging(env: Env) {
    let default_level = match env {
        Env::Local | Env::Dev => "tasklane=debug,tower_http=debug,sqlx=warn",
        Env::Prod => "tasklane=info,tower_http=info,sqlx=warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    let registry = tracing_subscriber::registry().with(filter);
    match env {
        Env::Local => registry.with(tracing_subscriber::fmt::layer()).init(),
        Env::Dev | Env::Prod => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }
}
