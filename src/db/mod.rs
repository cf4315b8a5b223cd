/// Database layer for Tasklane
///
/// Manages the PostgreSQL pool and migrations, and provides typed access to
/// users, lists, headings, tasks and tags. Repository functions take a
/// `&mut PgConnection` so services can compose them inside one transaction.

pub mod headings;
pub mod lists;
pub mod models;
pub mod tags;
pub mod tasks;
pub mod users;

use crate::{
    config::PostgresConfig,
    error::{ApiError, ApiResult},
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info};

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// SQLSTATE for check_violation
const CHECK_VIOLATION: &str = "23514";

/// Create a PostgreSQL connection pool
pub async fn create_pool(config: &PostgresConfig) -> ApiResult<PgPool> {
    info!("Connecting to PostgreSQL database...");
    info!("  Pool size: {}", config.conn_pool_size);

    let pool = pool_options(config)
        .connect(&config.conn_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            ApiError::StoreUnavailable
        })?;

    info!("PostgreSQL connection established");

    Ok(pool)
}

/// Create a pool that connects on first use
pub fn create_lazy_pool(config: &PostgresConfig) -> ApiResult<PgPool> {
    pool_options(config)
        .connect_lazy(&config.conn_url)
        .map_err(|e| ApiError::Internal(format!("Invalid connection URL: {}", e)))
}

fn pool_options(config: &PostgresConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.conn_pool_size)
        .acquire_timeout(Duration::from_secs(config.dial_timeout))
        .idle_timeout(Duration::from_secs(config.idle_timeout))
}

/// Run migrations
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &PgPool) -> ApiResult<()> {
    info!("Running PostgreSQL migrations...");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            ApiError::Internal(format!("Migration failed: {}", e))
        })?;

    info!("Migrations completed");

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &PgPool) -> ApiResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Name of the violated constraint when `err` is a constraint violation of
/// the given SQLSTATE class
fn violated_constraint<'a>(err: &'a sqlx::Error, code: &str) -> Option<&'a str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(code) => {
            db_err.constraint()
        }
        _ => None,
    }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION))
}

pub fn is_check_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(CHECK_VIOLATION))
}

/// Foreign-key violations on task and heading writes become the missing
/// parent's `NotFound`; anything else passes through.
pub fn map_foreign_key_error(err: sqlx::Error) -> ApiError {
    match violated_constraint(&err, FOREIGN_KEY_VIOLATION) {
        Some(c) if c.ends_with("heading_id_fkey") => ApiError::HeadingNotFound,
        Some(c) if c.ends_with("list_id_fkey") => ApiError::ListNotFound,
        Some(c) if c.ends_with("status_id_fkey") => ApiError::TaskStatusNotFound,
        Some(c) if c.ends_with("tag_id_fkey") => ApiError::TagNotFound,
        Some(c) if c.ends_with("task_id_fkey") => ApiError::TaskNotFound,
        Some(c) if c.ends_with("user_id_fkey") => ApiError::UserNotFound,
        Some(c) if c.ends_with("device_id_fkey") => ApiError::UserDeviceNotFound,
        _ => ApiError::from(err),
    }
}
