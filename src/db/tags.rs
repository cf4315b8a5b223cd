/// Tag persistence and task links
///
/// The only place that canonicalizes text: titles are folded to lower case on
/// the way in and compared lower-cased on lookup.
use crate::{
    db::models::Tag,
    error::{ApiError, ApiResult},
    ksuid,
};
use sqlx::PgConnection;

const TAG_COLUMNS: &str = "id, title, user_id, updated_at";

/// Canonical form of a tag title
pub fn canonical_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Canonicalize and de-duplicate titles, keeping first-seen order
pub fn canonical_titles<S: AsRef<str>>(titles: &[S]) -> Vec<String> {
    let mut seen = Vec::with_capacity(titles.len());
    for title in titles {
        let title = canonical_title(title.as_ref());
        if !title.is_empty() && !seen.contains(&title) {
            seen.push(title);
        }
    }
    seen
}

/// Insert a tag unless a live tag with the same folded title exists.
///
/// Returns the live tag either way.
pub async fn create_tag(conn: &mut PgConnection, title: &str, user_id: &str) -> ApiResult<Tag> {
    let title = canonical_title(title);

    let inserted = sqlx::query_as::<_, Tag>(&format!(
        "INSERT INTO tags (id, title, user_id) VALUES ($1, $2, $3)
         ON CONFLICT (user_id, lower(title)) WHERE deleted_at IS NULL DO NOTHING
         RETURNING {TAG_COLUMNS}"
    ))
    .bind(ksuid::new_id())
    .bind(&title)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(crate::db::map_foreign_key_error)?;

    match inserted {
        Some(tag) => Ok(tag),
        None => get_tag_by_title(conn, &title, user_id).await,
    }
}

async fn get_tag_by_title(conn: &mut PgConnection, title: &str, user_id: &str) -> ApiResult<Tag> {
    sqlx::query_as::<_, Tag>(&format!(
        "SELECT {TAG_COLUMNS} FROM tags
         WHERE user_id = $1 AND lower(title) = $2 AND deleted_at IS NULL"
    ))
    .bind(user_id)
    .bind(canonical_title(title))
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::TagNotFound)
}

pub async fn get_tag_id_by_title(
    conn: &mut PgConnection,
    title: &str,
    user_id: &str,
) -> ApiResult<String> {
    get_tag_by_title(conn, title, user_id).await.map(|tag| tag.id)
}

/// Link tags to a task in the given order; already-linked tags are skipped
pub async fn link_tags_to_task<S: AsRef<str>>(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    titles: &[S],
) -> ApiResult<()> {
    for title in canonical_titles(titles) {
        let tag_id = get_tag_id_by_title(&mut *conn, &title, user_id).await?;

        sqlx::query(
            "INSERT INTO tasks_tags (task_id, tag_id) VALUES ($1, $2)
             ON CONFLICT (task_id, tag_id) DO NOTHING",
        )
        .bind(task_id)
        .bind(&tag_id)
        .execute(&mut *conn)
        .await
        .map_err(crate::db::map_foreign_key_error)?;
    }

    Ok(())
}

pub async fn unlink_tags_from_task<S: AsRef<str>>(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
    titles: &[S],
) -> ApiResult<u64> {
    let titles = canonical_titles(titles);
    if titles.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "DELETE FROM tasks_tags
         WHERE task_id = $1 AND tag_id IN (
             SELECT id FROM tags WHERE user_id = $2 AND lower(title) = ANY($3)
         )",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(&titles)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Live tags of a user, ordered by id
pub async fn get_tags_by_user_id(conn: &mut PgConnection, user_id: &str) -> ApiResult<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(&format!(
        "SELECT {TAG_COLUMNS} FROM tags
         WHERE user_id = $1 AND deleted_at IS NULL
         ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    if tags.is_empty() {
        return Err(ApiError::NoTagsFound);
    }

    Ok(tags)
}

/// Titles linked to a task, in link order
pub async fn get_tags_by_task_id(
    conn: &mut PgConnection,
    task_id: &str,
    user_id: &str,
) -> ApiResult<Vec<String>> {
    let titles = sqlx::query_scalar::<_, String>(
        "SELECT tg.title FROM tasks_tags tt
         JOIN tags tg ON tg.id = tt.tag_id
         WHERE tt.task_id = $1 AND tg.user_id = $2 AND tg.deleted_at IS NULL
         ORDER BY tt.seq",
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(titles)
}
