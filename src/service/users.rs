/// User management: registration with revive-on-reuse, profile updates and
/// soft deletion
use crate::{
    db::{self, models::User},
    error::{ApiError, ApiResult},
    ksuid,
    service::lists,
};
use sqlx::PgPool;
use tracing::info;

/// User manager service
pub struct UserManager {
    db: PgPool,
}

impl UserManager {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a user, or revive a soft-deleted one with the same email.
    ///
    /// The Inbox list and its default heading are created in the same
    /// transaction. A live user with this email is `UserAlreadyExists`.
    pub async fn create_user(&self, email: &str, password_hash: &str) -> ApiResult<User> {
        let mut tx = self.db.begin().await?;

        let user = match db::users::find_user_by_email_for_update(&mut tx, email).await? {
            Some(existing) if existing.deleted_at.is_none() => {
                return Err(ApiError::UserAlreadyExists);
            }
            Some(deleted) => {
                info!(user_id = %deleted.id, "Reviving soft-deleted user");
                db::users::revive_user(&mut tx, &deleted.id, password_hash).await?
            }
            None => db::users::insert_user(&mut tx, &ksuid::new_id(), email, password_hash).await?,
        };

        lists::create_default_list_in(&mut tx, &user.id).await?;

        tx.commit().await?;

        Ok(user)
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> ApiResult<User> {
        let mut conn = self.db.acquire().await?;
        db::users::get_user_by_id(&mut conn, user_id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> ApiResult<User> {
        let mut conn = self.db.acquire().await?;
        db::users::get_user_by_email(&mut conn, email).await
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> ApiResult<User> {
        let mut conn = self.db.acquire().await?;
        db::users::update_user(&mut conn, user_id, email, password_hash).await
    }

    /// Soft-delete the user, detach every device and drop every session
    pub async fn delete_user(&self, user_id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        db::users::delete_user(&mut tx, user_id).await?;
        let devices = db::users::detach_devices_by_user(&mut tx, user_id).await?;
        let sessions = db::users::delete_sessions_by_user(&mut tx, user_id).await?;

        tx.commit().await?;

        info!(user_id, devices, sessions, "Deleted user");
        Ok(())
    }
}
