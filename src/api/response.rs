/// Success envelope shared by every handler
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub status_text: String,
    pub description: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, description: impl Into<String>, data: T) -> Self {
        Self {
            code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            description: description.into(),
            data,
        }
    }

    /// 200 OK
    pub fn ok(description: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, description, data)
    }

    /// 201 Created
    pub fn created(description: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, description, data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}
