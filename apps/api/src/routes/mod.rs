pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interviews::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/interviews",
            get(handlers::handle_list_interviews).post(handlers::handle_create_interview),
        )
        .route("/api/interviews/:id", get(handlers::handle_get_interview))
        .route(
            "/api/interviews/:id/start-call",
            post(handlers::handle_start_call),
        )
        .route("/api/webhook", post(handlers::handle_call_webhook))
        .with_state(state)
}
