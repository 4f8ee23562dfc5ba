use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Builds the API router. The binary layers tracing and CORS on top.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth", post(handlers::users::auth))
        .route("/api/users/{id}", get(handlers::users::get_user))
        .route("/api/users/{id}", patch(handlers::users::update_profile))
        .route("/api/users/{id}/tests", post(handlers::users::add_test))
        .route(
            "/api/users/{id}/tests/{test_id}/sessions/{session_id}/toggle",
            post(handlers::users::toggle_session),
        )
        .route(
            "/api/users/{id}/tests/{test_id}",
            delete(handlers::users::delete_test),
        )
        .with_state(state)
}
