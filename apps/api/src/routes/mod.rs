pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::chat::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/get_jobs", post(handlers::handle_get_jobs))
        .route(
            "/sessions/:session_id",
            delete(handlers::handle_clear_session),
        )
        .with_state(state)
}
