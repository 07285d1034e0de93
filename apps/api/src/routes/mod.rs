pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tagging::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/extract", post(handlers::handle_extract))
        .route("/api/v1/models", get(handlers::handle_list_models))
        .route(
            "/api/v1/taxonomy/stats",
            get(handlers::handle_taxonomy_stats),
        )
        .route(
            "/api/v1/prompt/default",
            get(handlers::handle_default_prompt),
        )
        .with_state(state)
}
