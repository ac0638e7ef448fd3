/// API routes and handlers
pub mod applications;
pub mod auth;
pub mod codes;
pub mod middleware;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(codes::routes())
        .merge(applications::routes())
}
