/// Heading persistence
use crate::{
    db::models::Heading,
    error::{ApiError, ApiResult},
    pagination::Pagination,
};
use sqlx::PgConnection;

const HEADING_COLUMNS: &str = "id, title, list_id, user_id, is_default, updated_at";

/// Insert a heading under a live list owned by the same user.
///
/// Callers outside the list's own creating transaction hold
/// `lists::lock_live_list` first; the statement alone does not block a
/// concurrent list delete.
pub async fn create_heading(
    conn: &mut PgConnection,
    id: &str,
    title: &str,
    list_id: &str,
    user_id: &str,
    is_default: bool,
) -> ApiResult<Heading> {
    sqlx::query_as::<_, Heading>(&format!(
        "INSERT INTO headings (id, title, list_id, user_id, is_default)
         SELECT $1, $2, l.id, l.user_id, $5
         FROM lists l
         WHERE l.id = $3 AND l.user_id = $4 AND l.deleted_at IS NULL
         RETURNING {HEADING_COLUMNS}"
    ))
    .bind(id)
    .bind(title)
    .bind(list_id)
    .bind(user_id)
    .bind(is_default)
    .fetch_optional(conn)
    .await
    .map_err(crate::db::map_foreign_key_error)?
    .ok_or(ApiError::ListNotFound)
}

pub async fn get_heading_by_id(
    conn: &mut PgConnection,
    heading_id: &str,
    user_id: &str,
) -> ApiResult<Heading> {
    sqlx::query_as::<_, Heading>(&format!(
        "SELECT {HEADING_COLUMNS} FROM headings
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
    ))
    .bind(heading_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::HeadingNotFound)
}

/// Take a share lock on a live heading of the given list.
///
/// Task writes call this first: a concurrent heading delete either waits for
/// the task write to commit (and then archives the task) or has already
/// committed, in which case this returns `HeadingNotFound`.
pub async fn lock_live_heading(
    conn: &mut PgConnection,
    heading_id: &str,
    list_id: &str,
    user_id: &str,
) -> ApiResult<()> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM headings
         WHERE id = $1 AND list_id = $2 AND user_id = $3 AND deleted_at IS NULL
         FOR SHARE",
    )
    .bind(heading_id)
    .bind(list_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .map(|_| ())
    .ok_or(ApiError::HeadingNotFound)
}

/// Live headings of a list, keyset-paginated by id
pub async fn get_headings_by_list_id(
    conn: &mut PgConnection,
    list_id: &str,
    user_id: &str,
    pagination: &Pagination,
) -> ApiResult<Vec<Heading>> {
    if pagination.is_empty_page() {
        return Ok(Vec::new());
    }

    let headings = sqlx::query_as::<_, Heading>(&format!(
        "SELECT {HEADING_COLUMNS} FROM headings
         WHERE list_id = $1 AND user_id = $2 AND deleted_at IS NULL AND id > $3
         ORDER BY id
         LIMIT $4"
    ))
    .bind(list_id)
    .bind(user_id)
    .bind(pagination.after_id_or_start())
    .bind(pagination.limit)
    .fetch_all(conn)
    .await?;

    if headings.is_empty() {
        return Err(ApiError::NoHeadingsFound);
    }

    Ok(headings)
}

pub async fn get_default_heading_id(
    conn: &mut PgConnection,
    list_id: &str,
    user_id: &str,
) -> ApiResult<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM headings
         WHERE list_id = $1 AND user_id = $2 AND is_default AND deleted_at IS NULL",
    )
    .bind(list_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::HeadingNotFound)
}

pub async fn update_heading(
    conn: &mut PgConnection,
    heading_id: &str,
    user_id: &str,
    title: &str,
) -> ApiResult<Heading> {
    sqlx::query_as::<_, Heading>(&format!(
        "UPDATE headings SET title = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
         RETURNING {HEADING_COLUMNS}"
    ))
    .bind(heading_id)
    .bind(user_id)
    .bind(title)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::HeadingNotFound)
}

/// Re-parent a heading and every live task under it.
///
/// A heading without tasks is not an error: the second update simply
/// touches no rows.
pub async fn move_heading_to_another_list(
    conn: &mut PgConnection,
    heading_id: &str,
    user_id: &str,
    list_id: &str,
) -> ApiResult<Heading> {
    let heading = sqlx::query_as::<_, Heading>(&format!(
        "UPDATE headings SET list_id = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
         RETURNING {HEADING_COLUMNS}"
    ))
    .bind(heading_id)
    .bind(user_id)
    .bind(list_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(crate::db::map_foreign_key_error)?
    .ok_or(ApiError::HeadingNotFound)?;

    let moved = sqlx::query(
        "UPDATE tasks SET list_id = $3, updated_at = now()
         WHERE heading_id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(heading_id)
    .bind(user_id)
    .bind(list_id)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        heading_id,
        list_id,
        tasks = moved.rows_affected(),
        "Moved heading to another list"
    );

    Ok(heading)
}

/// Soft-delete one heading
pub async fn delete_heading(
    conn: &mut PgConnection,
    heading_id: &str,
    user_id: &str,
) -> ApiResult<()> {
    let result = sqlx::query(
        "UPDATE headings SET deleted_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(heading_id)
    .bind(user_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::HeadingNotFound);
    }

    Ok(())
}

/// Soft-delete every heading of a list, default included
pub async fn delete_headings_by_list_id(
    conn: &mut PgConnection,
    list_id: &str,
    user_id: &str,
) -> ApiResult<u64> {
    let result = sqlx::query(
        "UPDATE headings SET deleted_at = now()
         WHERE list_id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(list_id)
    .bind(user_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
