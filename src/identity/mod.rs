/// Identity service boundary
///
/// Registration, login, token refresh and profile management sit behind
/// `IdentityProvider`. The task core only ever sees the `user_id` claim of a
/// verified access token.

pub mod jwt;
pub mod local;

pub use jwt::Claims;
pub use local::LocalIdentity;

use crate::{db::models::User, error::ApiResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Email and password as submitted by the client
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Client the tokens are issued to
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub user_agent: String,
    pub ip: String,
}

/// Access/refresh token pair handed out on login, register and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "crate::datetime")]
    pub refresh_expires_at: DateTime<Utc>,
}

/// Profile changes; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn register(&self, credentials: Credentials, device: DeviceInfo) -> ApiResult<TokenPair>;

    async fn login(&self, credentials: Credentials, device: DeviceInfo) -> ApiResult<TokenPair>;

    async fn refresh(&self, refresh_token: &str, device: DeviceInfo) -> ApiResult<TokenPair>;

    async fn logout(&self, user_id: &str, device: DeviceInfo) -> ApiResult<()>;

    async fn get_user(&self, user_id: &str) -> ApiResult<User>;

    async fn update_user(&self, user_id: &str, changes: UserChanges) -> ApiResult<User>;

    async fn delete_user(&self, user_id: &str) -> ApiResult<()>;

    /// Verify an access token and return its claims
    fn verify_access_token(&self, token: &str) -> ApiResult<Claims>;
}
