/// List persistence
use crate::{
    db::models::List,
    error::{ApiError, ApiResult},
    pagination::Pagination,
};
use sqlx::PgConnection;

const LIST_COLUMNS: &str = "id, title, user_id, is_default, updated_at";

pub async fn create_list(
    conn: &mut PgConnection,
    id: &str,
    title: &str,
    user_id: &str,
    is_default: bool,
) -> ApiResult<List> {
    let list = sqlx::query_as::<_, List>(&format!(
        "INSERT INTO lists (id, title, user_id, is_default) VALUES ($1, $2, $3, $4)
         RETURNING {LIST_COLUMNS}"
    ))
    .bind(id)
    .bind(title)
    .bind(user_id)
    .bind(is_default)
    .fetch_one(conn)
    .await
    .map_err(crate::db::map_foreign_key_error)?;

    Ok(list)
}

/// Insert the user's default list unless a live one already exists.
///
/// Returns `None` when the partial unique index rejected the insert.
pub async fn create_default_list_if_missing(
    conn: &mut PgConnection,
    id: &str,
    title: &str,
    user_id: &str,
) -> ApiResult<Option<List>> {
    let list = sqlx::query_as::<_, List>(&format!(
        "INSERT INTO lists (id, title, user_id, is_default) VALUES ($1, $2, $3, TRUE)
         ON CONFLICT (user_id) WHERE is_default AND deleted_at IS NULL DO NOTHING
         RETURNING {LIST_COLUMNS}"
    ))
    .bind(id)
    .bind(title)
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(crate::db::map_foreign_key_error)?;

    Ok(list)
}

pub async fn get_list_by_id(
    conn: &mut PgConnection,
    list_id: &str,
    user_id: &str,
) -> ApiResult<List> {
    sqlx::query_as::<_, List>(&format!(
        "SELECT {LIST_COLUMNS} FROM lists
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
    ))
    .bind(list_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::ListNotFound)
}

/// Take a share lock on a live list.
///
/// Heading inserts and moves call this first: a concurrent list delete either
/// waits for them to commit (and then deletes the heading too) or has already
/// committed, in which case this returns `ListNotFound`.
pub async fn lock_live_list(conn: &mut PgConnection, list_id: &str, user_id: &str) -> ApiResult<()> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM lists
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
         FOR SHARE",
    )
    .bind(list_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .map(|_| ())
    .ok_or(ApiError::ListNotFound)
}

/// Live lists of a user, keyset-paginated by id
pub async fn get_lists_by_user_id(
    conn: &mut PgConnection,
    user_id: &str,
    pagination: &Pagination,
) -> ApiResult<Vec<List>> {
    if pagination.is_empty_page() {
        return Ok(Vec::new());
    }

    let lists = sqlx::query_as::<_, List>(&format!(
        "SELECT {LIST_COLUMNS} FROM lists
         WHERE user_id = $1 AND deleted_at IS NULL AND id > $2
         ORDER BY id
         LIMIT $3"
    ))
    .bind(user_id)
    .bind(pagination.after_id_or_start())
    .bind(pagination.limit)
    .fetch_all(conn)
    .await?;

    if lists.is_empty() {
        return Err(ApiError::NoListsFound);
    }

    Ok(lists)
}

pub async fn get_default_list_id(conn: &mut PgConnection, user_id: &str) -> ApiResult<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM lists WHERE user_id = $1 AND is_default AND deleted_at IS NULL",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::DefaultListNotFound)
}

pub async fn update_list(
    conn: &mut PgConnection,
    list_id: &str,
    user_id: &str,
    title: &str,
) -> ApiResult<List> {
    sqlx::query_as::<_, List>(&format!(
        "UPDATE lists SET title = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
         RETURNING {LIST_COLUMNS}"
    ))
    .bind(list_id)
    .bind(user_id)
    .bind(title)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::ListNotFound)
}

/// Soft-delete one list
pub async fn delete_list(conn: &mut PgConnection, list_id: &str, user_id: &str) -> ApiResult<()> {
    let result = sqlx::query(
        "UPDATE lists SET deleted_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(list_id)
    .bind(user_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::ListNotFound);
    }

    Ok(())
}
