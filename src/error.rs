/// Unified error types for Tasklane
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
///
/// Every variant carries a stable message; the transport layer maps kinds to
/// HTTP statuses in [`ApiError::status_code`].
#[derive(Error, Debug)]
pub enum ApiError {
    // Auth
    #[error("user not found")]
    UserNotFound,

    #[error("user unauthenticated")]
    UserUnauthenticated,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("email already taken")]
    EmailAlreadyTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user device not found")]
    UserDeviceNotFound,

    #[error("session not found")]
    SessionNotFound,

    #[error("refresh token expired")]
    RefreshTokenExpired,

    // Request
    #[error("empty request body")]
    EmptyRequestBody,

    #[error("invalid JSON")]
    InvalidJson,

    #[error("empty data")]
    EmptyData,

    #[error("invalid data")]
    InvalidData,

    #[error("failed to parse query params")]
    FailedToParseQueryParams,

    #[error("empty query list_id")]
    EmptyQueryListId,

    #[error("empty query heading_id")]
    EmptyQueryHeadingId,

    #[error("empty query task_id")]
    EmptyQueryTaskId,

    /// Field-level validation failures, one message per offending field
    #[error("validation failed")]
    Validation(Vec<String>),

    // Lists and headings
    #[error("list not found")]
    ListNotFound,

    #[error("no lists found")]
    NoListsFound,

    #[error("default list not found")]
    DefaultListNotFound,

    #[error("cannot delete default list")]
    CannotDeleteDefaultList,

    #[error("heading not found")]
    HeadingNotFound,

    #[error("no headings found")]
    NoHeadingsFound,

    #[error("default heading not found")]
    DefaultHeadingNotFound,

    #[error("cannot delete default heading")]
    CannotDeleteDefaultHeading,

    #[error("cannot move default heading")]
    CannotMoveDefaultHeading,

    // Tasks and tags
    #[error("task not found")]
    TaskNotFound,

    #[error("no tasks found")]
    NoTasksFound,

    #[error("task status not found")]
    TaskStatusNotFound,

    #[error("invalid task time range")]
    InvalidTaskTimeRange,

    #[error("failed to create task")]
    FailedToCreateTask,

    #[error("tag not found")]
    TagNotFound,

    #[error("no tags found")]
    NoTagsFound,

    // Infrastructure
    #[error("store unavailable")]
    StoreUnavailable,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Connection-level failures surface as `StoreUnavailable`; everything else
/// keeps the underlying error for logging.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::error!(error = %err, "store unavailable");
                ApiError::StoreUnavailable
            }
            other => ApiError::Database(other),
        }
    }
}

/// Error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub status_text: String,
    pub description: String,
}

/// Validation error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub code: u16,
    pub status_text: String,
    pub data: Vec<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        use ApiError::*;

        match self {
            UserUnauthenticated | InvalidCredentials | SessionNotFound | RefreshTokenExpired
            | UserDeviceNotFound => StatusCode::UNAUTHORIZED,

            UserAlreadyExists | EmailAlreadyTaken => StatusCode::CONFLICT,

            EmptyRequestBody | InvalidJson | EmptyData | InvalidData | FailedToParseQueryParams
            | EmptyQueryListId | EmptyQueryHeadingId | EmptyQueryTaskId
            | CannotDeleteDefaultList | CannotDeleteDefaultHeading | CannotMoveDefaultHeading
            | InvalidTaskTimeRange => StatusCode::BAD_REQUEST,

            Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,

            UserNotFound | ListNotFound | NoListsFound | DefaultListNotFound | HeadingNotFound
            | NoHeadingsFound | DefaultHeadingNotFound | TaskNotFound | NoTasksFound
            | TaskStatusNotFound | TagNotFound | NoTagsFound => StatusCode::NOT_FOUND,

            RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,

            FailedToCreateTask | StoreUnavailable | Database(_) | Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();

        match self {
            ApiError::Validation(messages) => {
                let body = Json(ValidationErrorResponse {
                    code: status.as_u16(),
                    status_text,
                    data: messages,
                });
                (status, body).into_response()
            }
            err => {
                let description = match &err {
                    ApiError::Database(e) => {
                        tracing::error!(error = %e, "database error");
                        "internal server error".to_string() // Don't leak details
                    }
                    ApiError::Internal(e) => {
                        tracing::error!(error = %e, "internal error");
                        "internal server error".to_string()
                    }
                    other => other.to_string(),
                };

                let body = Json(ErrorResponse {
                    code: status.as_u16(),
                    status_text,
                    description,
                });
                (status, body).into_response()
            }
        }
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;
