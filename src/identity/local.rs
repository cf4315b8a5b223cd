/// Identity provider backed by the application's own Postgres store
///
/// Passwords are hashed with Argon2id. Each login binds a refresh session to
/// the `(user, user agent)` device; refreshing rotates the token in place.
use crate::{
    clock::Clock,
    config::JwtConfig,
    db::{self, models::User},
    error::{ApiError, ApiResult},
    identity::{jwt, Claims, Credentials, DeviceInfo, IdentityProvider, TokenPair, UserChanges},
    ksuid,
    service::UserManager,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| ApiError::Internal(format!("Stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub struct LocalIdentity {
    db: PgPool,
    users: Arc<UserManager>,
    config: JwtConfig,
    clock: Arc<dyn Clock>,
}

impl LocalIdentity {
    pub fn new(db: PgPool, users: Arc<UserManager>, config: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            users,
            config,
            clock,
        }
    }

    /// Record the device, store a fresh refresh session and sign an access token
    async fn start_session(&self, user_id: &str, device: &DeviceInfo) -> ApiResult<TokenPair> {
        let now = self.clock.now();
        let refresh_token = jwt::new_refresh_token();
        let refresh_expires_at = now + Duration::seconds(self.config.refresh_ttl);

        let mut tx = self.db.begin().await?;
        let device = db::users::upsert_device(
            &mut tx,
            &ksuid::new_id(),
            user_id,
            &device.user_agent,
            &device.ip,
            now,
        )
        .await?;
        db::users::create_session(
            &mut tx,
            user_id,
            &device.id,
            &refresh_token,
            refresh_expires_at,
            self.config.max_sessions,
        )
        .await?;
        tx.commit().await?;

        Ok(TokenPair {
            access_token: jwt::issue(user_id, now, &self.config)?,
            refresh_token,
            refresh_expires_at,
        })
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn register(&self, credentials: Credentials, device: DeviceInfo) -> ApiResult<TokenPair> {
        let password_hash = hash_password(&credentials.password)?;
        let user = self.users.create_user(&credentials.email, &password_hash).await?;

        info!(user_id = %user.id, "Registered user");
        self.start_session(&user.id, &device).await
    }

    async fn login(&self, credentials: Credentials, device: DeviceInfo) -> ApiResult<TokenPair> {
        let user = match self.users.get_user_by_email(&credentials.email).await {
            Ok(user) => user,
            Err(ApiError::UserNotFound) => return Err(ApiError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        if !verify_password(&credentials.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(ApiError::InvalidCredentials);
        }

        self.start_session(&user.id, &device).await
    }

    async fn refresh(&self, refresh_token: &str, device: DeviceInfo) -> ApiResult<TokenPair> {
        let now = self.clock.now();

        let mut tx = self.db.begin().await?;
        let session = db::users::get_session_by_refresh_token(&mut tx, refresh_token).await?;

        if session.expires_at <= now {
            db::users::delete_session(&mut tx, session.id).await?;
            tx.commit().await?;
            return Err(ApiError::RefreshTokenExpired);
        }

        // A live user is required; deleted users have no sessions left
        db::users::get_user_by_id(&mut tx, &session.user_id)
            .await
            .map_err(|_| ApiError::UserUnauthenticated)?;

        let rotated = jwt::new_refresh_token();
        let refresh_expires_at = now + Duration::seconds(self.config.refresh_ttl);
        db::users::create_session(
            &mut tx,
            &session.user_id,
            &session.device_id,
            &rotated,
            refresh_expires_at,
            self.config.max_sessions,
        )
        .await?;
        tx.commit().await?;

        tracing::debug!(user_id = %session.user_id, ip = %device.ip, "Rotated refresh token");
        Ok(TokenPair {
            access_token: jwt::issue(&session.user_id, now, &self.config)?,
            refresh_token: rotated,
            refresh_expires_at,
        })
    }

    async fn logout(&self, user_id: &str, device: DeviceInfo) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        let device = db::users::get_active_device(&mut tx, user_id, &device.user_agent).await?;
        db::users::delete_sessions_by_device(&mut tx, user_id, &device.id).await?;
        db::users::detach_device(&mut tx, &device.id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> ApiResult<User> {
        self.users.get_user_by_id(user_id).await
    }

    async fn update_user(&self, user_id: &str, changes: UserChanges) -> ApiResult<User> {
        let password_hash = changes.password.as_deref().map(hash_password).transpose()?;
        self.users
            .update_user(user_id, changes.email.as_deref(), password_hash.as_deref())
            .await
    }

    async fn delete_user(&self, user_id: &str) -> ApiResult<()> {
        self.users.delete_user(user_id).await
    }

    fn verify_access_token(&self, token: &str) -> ApiResult<Claims> {
        jwt::verify(token, self.clock.now(), &self.config)
    }
}
