/// API routes and handlers
pub mod auth;
pub mod extract;
pub mod headings;
pub mod health;
pub mod lists;
pub mod middleware;
pub mod response;
pub mod tags;
pub mod tasks;
pub mod user;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(user::routes())
        .merge(lists::routes())
        .merge(headings::routes())
        .merge(tasks::routes())
        .merge(tags::routes())
}
