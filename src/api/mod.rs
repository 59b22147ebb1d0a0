/// API routes and handlers
pub mod ckbfs;
pub mod envelope;
pub mod health;
pub mod middleware;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(ckbfs::routes())
}
