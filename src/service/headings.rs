/// Heading operations scoped to the list named in the request path
use crate::{
    clock::Clock,
    db::{
        self,
        models::{Heading, HeadingTasks},
    },
    error::{ApiError, ApiResult},
    ksuid,
    pagination::Pagination,
    service::tasks::{archive_tasks_in, ArchiveScope},
};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::info;

/// Load a live heading and check that it sits in `list_id`
async fn get_heading_in_list(
    conn: &mut PgConnection,
    list_id: &str,
    heading_id: &str,
    user_id: &str,
) -> ApiResult<Heading> {
    let heading = db::headings::get_heading_by_id(conn, heading_id, user_id).await?;
    if heading.list_id != list_id {
        return Err(ApiError::HeadingNotFound);
    }
    Ok(heading)
}

/// Heading manager service
pub struct HeadingManager {
    db: PgPool,
    clock: Arc<dyn Clock>,
}

impl HeadingManager {
    pub fn new(db: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn create_heading(
        &self,
        list_id: &str,
        user_id: &str,
        title: &str,
    ) -> ApiResult<Heading> {
        let mut tx = self.db.begin().await?;
        db::lists::lock_live_list(&mut tx, list_id, user_id).await?;
        let heading =
            db::headings::create_heading(&mut tx, &ksuid::new_id(), title, list_id, user_id, false)
                .await?;
        tx.commit().await?;

        Ok(heading)
    }

    pub async fn get_heading(
        &self,
        list_id: &str,
        heading_id: &str,
        user_id: &str,
    ) -> ApiResult<Heading> {
        let mut conn = self.db.acquire().await?;
        get_heading_in_list(&mut conn, list_id, heading_id, user_id).await
    }

    /// Headings of a live list; an unknown list is `ListNotFound`
    pub async fn get_headings(
        &self,
        list_id: &str,
        user_id: &str,
        pagination: &Pagination,
    ) -> ApiResult<Vec<Heading>> {
        let mut conn = self.db.acquire().await?;
        db::lists::get_list_by_id(&mut conn, list_id, user_id).await?;
        db::headings::get_headings_by_list_id(&mut conn, list_id, user_id, pagination).await
    }

    /// Every live heading of the list with its tasks
    pub async fn get_tasks_grouped_by_headings(
        &self,
        list_id: &str,
        user_id: &str,
    ) -> ApiResult<Vec<HeadingTasks>> {
        let mut conn = self.db.acquire().await?;
        db::tasks::get_tasks_grouped_by_headings(&mut conn, list_id, user_id, self.clock.today())
            .await
    }

    pub async fn update_heading(
        &self,
        list_id: &str,
        heading_id: &str,
        user_id: &str,
        title: &str,
    ) -> ApiResult<Heading> {
        let mut tx = self.db.begin().await?;
        get_heading_in_list(&mut tx, list_id, heading_id, user_id).await?;
        let heading = db::headings::update_heading(&mut tx, heading_id, user_id, title).await?;
        tx.commit().await?;
        Ok(heading)
    }

    /// Re-parent a non-default heading and its live tasks to another list
    pub async fn move_heading_to_another_list(
        &self,
        list_id: &str,
        heading_id: &str,
        user_id: &str,
        target_list_id: &str,
    ) -> ApiResult<Heading> {
        let mut tx = self.db.begin().await?;

        let heading = get_heading_in_list(&mut tx, list_id, heading_id, user_id).await?;
        if heading.is_default {
            return Err(ApiError::CannotMoveDefaultHeading);
        }

        db::lists::lock_live_list(&mut tx, target_list_id, user_id).await?;

        let heading =
            db::headings::move_heading_to_another_list(&mut tx, heading_id, user_id, target_list_id)
                .await?;

        tx.commit().await?;

        info!(heading_id, from = list_id, to = target_list_id, "Moved heading");
        Ok(heading)
    }

    /// Soft-delete a non-default heading and archive every live task under it
    pub async fn delete_heading(
        &self,
        list_id: &str,
        heading_id: &str,
        user_id: &str,
    ) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        let heading = get_heading_in_list(&mut tx, list_id, heading_id, user_id).await?;
        if heading.is_default {
            return Err(ApiError::CannotDeleteDefaultHeading);
        }

        // The row lock taken here waits for task inserts holding FOR SHARE
        db::headings::delete_heading(&mut tx, heading_id, user_id).await?;
        let archived = archive_tasks_in(&mut tx, ArchiveScope::Heading(heading_id), user_id).await?;

        tx.commit().await?;

        info!(heading_id, user_id, archived, "Deleted heading");
        Ok(())
    }
}
