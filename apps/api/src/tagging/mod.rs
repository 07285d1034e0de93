//! Label extraction pipeline: prompt → model → parse → validate.
//!
//! Holds no state between calls. The only shared input is the read-only
//! taxonomy; each call returns a fresh `ExtractionResult` that the caller owns.

pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod validator;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::llm_client::{ChatBackend, LlmError};
use crate::taxonomy::Taxonomy;
use parser::RawCandidate;
use validator::{LabelIds, ValidatedLabels};

/// Model identifiers offered to users, with display labels.
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[
    ("deepseek-chat", "DeepSeek"),
    ("qwen-plus", "通义千问 Plus"),
    ("qwen-max", "通义千问 Max"),
    ("qwen-turbo", "通义千问 Turbo"),
    ("baichuan2-turbo", "百川2 Turbo"),
    ("yi-large", "零一万物 Large"),
];

pub fn is_known_model(model: &str) -> bool {
    AVAILABLE_MODELS.iter().any(|(id, _)| *id == model)
}

#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub utterance: String,
    pub model: String,
    pub custom_prompt: Option<String>,
}

/// Validated labels plus the raw material they were derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    #[serde(flatten)]
    pub labels: ValidatedLabels,
    /// Taxonomy ids of `labels`, field for field.
    pub ids: LabelIds,
    /// Set only when the model reply could not be decoded (or the model supplied one).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The decoded reply JSON exactly as the model sent it; `None` if it did not decode.
    #[serde(rename = "_raw_ai_response")]
    pub raw_ai_response: Option<Value>,
    #[serde(rename = "_full_ai_response")]
    pub full_ai_response: Option<String>,
}

impl ExtractionResult {
    /// Display form of the major, e.g. `理工科 → 计算机`.
    pub fn major_path(&self) -> Option<String> {
        let major = self.labels.major.as_ref()?;
        Some(match &self.labels.sub_major {
            Some(sub_major) => format!("{} → {}", major.as_str(), sub_major.as_str()),
            None => major.as_str().to_string(),
        })
    }
}

/// Validates a parsed candidate. Any `error` on the candidate is carried through.
pub fn normalize(candidate: &RawCandidate, taxonomy: &Taxonomy) -> ExtractionResult {
    let labels = validator::validate(candidate, taxonomy);
    ExtractionResult {
        ids: labels.ids(),
        labels,
        error: candidate.error.clone(),
        raw_ai_response: None,
        full_ai_response: None,
    }
}

/// Runs one extraction. Configuration and transport failures propagate;
/// unparseable or off-vocabulary replies degrade to empty labels.
pub async fn extract(
    backend: &dyn ChatBackend,
    taxonomy: &Taxonomy,
    request: &ExtractionRequest,
) -> Result<ExtractionResult, LlmError> {
    let (system_prompt, source) =
        prompts::build_system_prompt(taxonomy, request.custom_prompt.as_deref());
    debug!(
        "Extracting with model={} prompt_source={source:?} prompt_chars={}",
        request.model,
        system_prompt.chars().count()
    );

    let reply = backend
        .complete(&request.model, &system_prompt, &request.utterance)
        .await?;

    let parsed = parser::parse_response(&reply);
    let mut result = normalize(&parsed.candidate, taxonomy);
    result.raw_ai_response = parsed.value;
    result.full_ai_response = Some(reply);

    info!(
        "Extraction done: model={} country={:?} degree={:?} major={:?} parse_error={}",
        request.model,
        result.labels.country.as_ref().map(|l| l.as_str()),
        result.labels.degree.as_ref().map(|l| l.as_str()),
        result.major_path(),
        result.error.is_some()
    );

    Ok(result)
}
