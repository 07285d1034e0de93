//! Axum route handlers for the tagging API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;
use crate::tagging::{extract, is_known_model, prompts, ExtractionRequest, ExtractionResult};
use crate::taxonomy::stats::TaxonomyStats;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractBody {
    pub text: String,
    pub model: Option<String>,
    pub custom_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelOption {
    pub id: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub default: String,
    pub models: Vec<ModelOption>,
}

#[derive(Debug, Serialize)]
pub struct DefaultPromptResponse {
    pub prompt: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/extract
///
/// Extracts country, degree and major labels from `text`. A reply the model
/// botched still returns 200 with empty labels and an `error` diagnostic;
/// only a missing key or a failed backend call is an error response.
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(body): Json<ExtractBody>,
) -> Result<Json<ExtractionResult>, AppError> {
    if body.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let model = body
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.default_model.clone());
    if !is_known_model(&model) {
        return Err(AppError::Validation(format!("unknown model '{model}'")));
    }

    let request = ExtractionRequest {
        utterance: body.text,
        model,
        custom_prompt: body.custom_prompt,
    };

    let result = extract(state.llm.as_ref(), &state.taxonomy, &request).await?;

    Ok(Json(result))
}

/// GET /api/v1/models
pub async fn handle_list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default: state.config.default_model.clone(),
        models: crate::tagging::AVAILABLE_MODELS
            .iter()
            .map(|&(id, label)| ModelOption { id, label })
            .collect(),
    })
}

/// GET /api/v1/taxonomy/stats
pub async fn handle_taxonomy_stats(State(state): State<AppState>) -> Json<TaxonomyStats> {
    Json(TaxonomyStats::from(state.taxonomy.as_ref()))
}

/// GET /api/v1/prompt/default
///
/// The fully rendered default system prompt, as a starting point for custom prompts.
pub async fn handle_default_prompt(State(state): State<AppState>) -> Json<DefaultPromptResponse> {
    Json(DefaultPromptResponse {
        prompt: prompts::default_prompt(&state.taxonomy),
    })
}
