/// User, device and refresh-session persistence
use crate::{
    db::{is_unique_violation, models::{Session, User, UserDevice}},
    error::{ApiError, ApiResult},
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

const USER_COLUMNS: &str = "id, email, password_hash, created_at, updated_at, deleted_at";

/// Lock every user row with this email, live or not, and return the most
/// relevant one (live first, then the most recently deleted).
///
/// Must run inside a transaction: the row lock serializes concurrent
/// registrations of the same address.
pub async fn find_user_by_email_for_update(
    conn: &mut PgConnection,
    email: &str,
) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE lower(email) = lower($1)
         ORDER BY (deleted_at IS NULL) DESC, deleted_at DESC
         LIMIT 1
         FOR UPDATE"
    ))
    .bind(email)
    .fetch_optional(conn)
    .await?;

    Ok(user)
}

pub async fn insert_user(
    conn: &mut PgConnection,
    id: &str,
    email: &str,
    password_hash: &str,
) -> ApiResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::UserAlreadyExists
        } else {
            ApiError::from(e)
        }
    })
}

/// Bring a soft-deleted user back with a new password
pub async fn revive_user(
    conn: &mut PgConnection,
    id: &str,
    password_hash: &str,
) -> ApiResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET deleted_at = NULL, password_hash = $2, updated_at = now()
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(password_hash)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::UserNotFound)
}

pub async fn get_user_by_id(conn: &mut PgConnection, id: &str) -> ApiResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::UserNotFound)
}

pub async fn get_user_by_email(conn: &mut PgConnection, email: &str) -> ApiResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL"
    ))
    .bind(email)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::UserNotFound)
}

/// Partial update; `None` leaves the column untouched
pub async fn update_user(
    conn: &mut PgConnection,
    id: &str,
    email: Option<&str>,
    password_hash: Option<&str>,
) -> ApiResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users
         SET email = COALESCE($2, email),
             password_hash = COALESCE($3, password_hash),
             updated_at = now()
         WHERE id = $1 AND deleted_at IS NULL
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::EmailAlreadyTaken
        } else {
            ApiError::from(e)
        }
    })?
    .ok_or(ApiError::UserNotFound)
}

pub async fn delete_user(conn: &mut PgConnection, id: &str) -> ApiResult<()> {
    let result = sqlx::query(
        "UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::UserNotFound);
    }

    Ok(())
}

const DEVICE_COLUMNS: &str = "id, user_id, user_agent, ip, detached, latest_login_at, detached_at";

/// Record a login from `(user_id, user_agent)`, reusing the active device row
pub async fn upsert_device(
    conn: &mut PgConnection,
    id: &str,
    user_id: &str,
    user_agent: &str,
    ip: &str,
    now: DateTime<Utc>,
) -> ApiResult<UserDevice> {
    let device = sqlx::query_as::<_, UserDevice>(&format!(
        "INSERT INTO user_devices (id, user_id, user_agent, ip, latest_login_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (user_id, user_agent) WHERE NOT detached
         DO UPDATE SET ip = EXCLUDED.ip, latest_login_at = EXCLUDED.latest_login_at
         RETURNING {DEVICE_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(user_agent)
    .bind(ip)
    .bind(now)
    .fetch_one(conn)
    .await?;

    Ok(device)
}

pub async fn get_active_device(
    conn: &mut PgConnection,
    user_id: &str,
    user_agent: &str,
) -> ApiResult<UserDevice> {
    sqlx::query_as::<_, UserDevice>(&format!(
        "SELECT {DEVICE_COLUMNS} FROM user_devices
         WHERE user_id = $1 AND user_agent = $2 AND NOT detached"
    ))
    .bind(user_id)
    .bind(user_agent)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::UserDeviceNotFound)
}

pub async fn detach_device(conn: &mut PgConnection, device_id: &str) -> ApiResult<()> {
    sqlx::query(
        "UPDATE user_devices SET detached = TRUE, detached_at = now()
         WHERE id = $1 AND NOT detached",
    )
    .bind(device_id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn detach_devices_by_user(conn: &mut PgConnection, user_id: &str) -> ApiResult<u64> {
    let result = sqlx::query(
        "UPDATE user_devices SET detached = TRUE, detached_at = now()
         WHERE user_id = $1 AND NOT detached",
    )
    .bind(user_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

const SESSION_COLUMNS: &str = "id, user_id, device_id, refresh_token, last_visit_at, expires_at";

/// Store a refresh session for a device, replacing the device's previous one
/// and evicting the user's oldest sessions beyond `max_sessions`.
pub async fn create_session(
    conn: &mut PgConnection,
    user_id: &str,
    device_id: &str,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
    max_sessions: i64,
) -> ApiResult<Session> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND device_id = $2")
        .bind(user_id)
        .bind(device_id)
        .execute(&mut *conn)
        .await?;

    let session = sqlx::query_as::<_, Session>(&format!(
        "INSERT INTO sessions (user_id, device_id, refresh_token, expires_at)
         VALUES ($1, $2, $3, $4)
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(user_id)
    .bind(device_id)
    .bind(refresh_token)
    .bind(expires_at)
    .fetch_one(&mut *conn)
    .await?;

    let evicted = sqlx::query(
        "DELETE FROM sessions
         WHERE user_id = $1 AND id NOT IN (
             SELECT id FROM sessions WHERE user_id = $1
             ORDER BY last_visit_at DESC, id DESC
             LIMIT $2
         )",
    )
    .bind(user_id)
    .bind(max_sessions)
    .execute(&mut *conn)
    .await?;

    if evicted.rows_affected() > 0 {
        tracing::debug!(
            user_id,
            evicted = evicted.rows_affected(),
            "Evicted sessions above the per-user cap"
        );
    }

    Ok(session)
}

pub async fn get_session_by_refresh_token(
    conn: &mut PgConnection,
    refresh_token: &str,
) -> ApiResult<Session> {
    sqlx::query_as::<_, Session>(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE refresh_token = $1"
    ))
    .bind(refresh_token)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::SessionNotFound)
}

pub async fn delete_session(conn: &mut PgConnection, id: i64) -> ApiResult<()> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn delete_sessions_by_device(
    conn: &mut PgConnection,
    user_id: &str,
    device_id: &str,
) -> ApiResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND device_id = $2")
        .bind(user_id)
        .bind(device_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_sessions_by_user(conn: &mut PgConnection, user_id: &str) -> ApiResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

/// Hard-delete sessions whose refresh token has expired
pub async fn delete_expired_sessions(conn: &mut PgConnection, now: DateTime<Utc>) -> ApiResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
        .bind(now)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}
