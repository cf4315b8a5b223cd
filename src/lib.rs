//! Tasklane - multi-user task management backend
//!
//! Lists, headings, tasks and tags over an HTTP/JSON API backed by
//! PostgreSQL, with soft deletion, grouped task views and keyset pagination.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod context;
pub mod datetime;
pub mod db;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod ksuid;
pub mod pagination;
pub mod rate_limit;
pub mod server;
pub mod service;

pub use context::AppContext;
pub use error::{ApiError, ApiResult};
