/// List lifecycle: creation with a default heading, the per-user Inbox, and
/// cascading deletion
use crate::{
    db::{self, models::List},
    error::{ApiError, ApiResult},
    ksuid,
    pagination::Pagination,
    service::tasks::{archive_tasks_in, ArchiveScope},
};
use sqlx::{PgConnection, PgPool};
use tracing::info;

pub const DEFAULT_LIST_TITLE: &str = "Inbox";
pub const DEFAULT_HEADING_TITLE: &str = "Default";

/// Create the user's default list and its default heading unless they exist.
///
/// Runs on the caller's connection so registration can include it in the
/// user-creation transaction.
pub async fn create_default_list_in(conn: &mut PgConnection, user_id: &str) -> ApiResult<List> {
    let created =
        db::lists::create_default_list_if_missing(&mut *conn, &ksuid::new_id(), DEFAULT_LIST_TITLE, user_id)
            .await?;

    match created {
        Some(list) => {
            db::headings::create_heading(
                &mut *conn,
                &ksuid::new_id(),
                DEFAULT_HEADING_TITLE,
                &list.id,
                user_id,
                true,
            )
            .await?;
            Ok(list)
        }
        None => {
            let list_id = db::lists::get_default_list_id(&mut *conn, user_id).await?;
            db::lists::get_list_by_id(conn, &list_id, user_id).await
        }
    }
}

/// List manager service
pub struct ListManager {
    db: PgPool,
}

impl ListManager {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a list together with its default heading
    pub async fn create_list(&self, user_id: &str, title: &str) -> ApiResult<List> {
        let mut tx = self.db.begin().await?;

        let list = db::lists::create_list(&mut *tx, &ksuid::new_id(), title, user_id, false).await?;
        db::headings::create_heading(
            &mut *tx,
            &ksuid::new_id(),
            DEFAULT_HEADING_TITLE,
            &list.id,
            user_id,
            true,
        )
        .await?;

        tx.commit().await?;

        info!(list_id = %list.id, user_id, "Created list");
        Ok(list)
    }

    /// Idempotent: returns the existing Inbox when there is one
    pub async fn create_default_list(&self, user_id: &str) -> ApiResult<List> {
        let mut tx = self.db.begin().await?;
        let list = create_default_list_in(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(list)
    }

    pub async fn get_list(&self, list_id: &str, user_id: &str) -> ApiResult<List> {
        let mut conn = self.db.acquire().await?;
        db::lists::get_list_by_id(&mut conn, list_id, user_id).await
    }

    pub async fn get_lists(&self, user_id: &str, pagination: &Pagination) -> ApiResult<Vec<List>> {
        let mut conn = self.db.acquire().await?;
        db::lists::get_lists_by_user_id(&mut conn, user_id, pagination).await
    }

    pub async fn get_default_list(&self, user_id: &str) -> ApiResult<List> {
        let mut conn = self.db.acquire().await?;
        let list_id = db::lists::get_default_list_id(&mut conn, user_id).await?;
        db::lists::get_list_by_id(&mut conn, &list_id, user_id).await
    }

    pub async fn update_list(&self, list_id: &str, user_id: &str, title: &str) -> ApiResult<List> {
        let mut conn = self.db.acquire().await?;
        db::lists::update_list(&mut conn, list_id, user_id, title).await
    }

    /// Soft-delete a list with its headings and archive its tasks.
    ///
    /// The default list is refused.
    pub async fn delete_list(&self, list_id: &str, user_id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        let list = db::lists::get_list_by_id(&mut tx, list_id, user_id).await?;
        if list.is_default {
            return Err(ApiError::CannotDeleteDefaultList);
        }

        db::lists::delete_list(&mut tx, list_id, user_id).await?;
        let headings = db::headings::delete_headings_by_list_id(&mut tx, list_id, user_id).await?;
        let tasks = archive_tasks_in(&mut tx, ArchiveScope::List(list_id), user_id).await?;

        tx.commit().await?;

        info!(list_id, user_id, headings, tasks, "Deleted list");
        Ok(())
    }
}
