use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{background_translate, cancel_job, get_job, health};
use crate::state::AppState;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/background-translate", post(background_translate))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/cancel", post(cancel_job))
        .route("/health", get(health))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    create_routes().with_state(state)
}
