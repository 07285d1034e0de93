use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus whether the taxonomy is populated.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "study-tagger",
        "taxonomy_loaded": !state.taxonomy.countries().is_empty()
            || !state.taxonomy.degrees().is_empty()
            || !state.taxonomy.majors().is_empty(),
    }))
}
