use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::rate_limiter_shrink_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Cleanup expired refresh sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");

            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) if count > 0 => info!("Cleaned up {} expired sessions", count),
                Ok(_) => info!("Session cleanup: no expired sessions found"),
                Err(e) => error!("Failed to cleanup expired sessions: {}", e),
            }
        }
    }

    /// Forget per-IP limiter state that has fully replenished (every 10 minutes)
    async fn rate_limiter_shrink_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(600));

        loop {
            interval.tick().await;
            let tracked = tasks::shrink_rate_limiter(&scheduler.context);
            debug!("Rate limiter tracks {} client addresses", tracked);
        }
    }
}
