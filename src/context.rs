/// Application context and dependency injection
use crate::{
    clock::{Clock, SystemClock},
    config::ServerConfig,
    db,
    error::{ApiError, ApiResult},
    identity::{IdentityProvider, LocalIdentity},
    rate_limit::RateLimiter,
    service::{HeadingManager, ListManager, TaskManager, UserManager},
};
use sqlx::PgPool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: PgPool,
    pub clock: Arc<dyn Clock>,
    pub users: Arc<UserManager>,
    pub lists: Arc<ListManager>,
    pub headings: Arc<HeadingManager>,
    pub tasks: Arc<TaskManager>,
    pub identity: Arc<dyn IdentityProvider>,
    pub rate_limiter: RateLimiter,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        let pool = db::create_pool(&config.postgres).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        Self::from_parts(config, pool, Arc::new(SystemClock))
    }

    /// Wire services over an existing pool and clock
    pub fn from_parts(config: ServerConfig, pool: PgPool, clock: Arc<dyn Clock>) -> ApiResult<Self> {
        let users = Arc::new(UserManager::new(pool.clone()));
        let lists = Arc::new(ListManager::new(pool.clone()));
        let headings = Arc::new(HeadingManager::new(pool.clone(), Arc::clone(&clock)));
        let tasks = Arc::new(TaskManager::new(pool.clone(), Arc::clone(&clock)));

        let identity: Arc<dyn IdentityProvider> = match config.sso.address.as_str() {
            "local" => Arc::new(LocalIdentity::new(
                pool.clone(),
                Arc::clone(&users),
                config.jwt.clone(),
                Arc::clone(&clock),
            )),
            other => {
                return Err(ApiError::Internal(format!(
                    "No identity provider available for SSO address {}",
                    other
                )))
            }
        };

        let rate_limiter = RateLimiter::new(config.http_server.request_limit_by_ip);

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            clock,
            users,
            lists,
            headings,
            tasks,
            identity,
            rate_limiter,
        })
    }
}
