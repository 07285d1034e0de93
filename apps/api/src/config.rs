use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::llm_client::telemetry::TelemetryConfig;
use crate::llm_client::{LlmConfig, DEFAULT_BASE_URL};
use crate::tagging::{is_known_model, AVAILABLE_MODELS};

const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_TELEMETRY_PROJECT: &str = "留学标签识别";

/// Application configuration loaded from environment variables.
///
/// The API key is optional at startup: the service still serves the taxonomy
/// and prompt endpoints, and extraction reports the missing key per request.
#[derive(Debug, Clone)]
pub struct Config {
    pub dashscope_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_timeout_secs: u64,
    pub default_model: String,
    pub taxonomy_dir: PathBuf,
    pub langchain_api_key: Option<String>,
    pub langchain_project: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            dashscope_api_key: optional_env("DASHSCOPE_API_KEY"),
            llm_base_url: env_or("LLM_BASE_URL", DEFAULT_BASE_URL),
            llm_timeout_secs: env_or("LLM_TIMEOUT_SECS", "60")
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            default_model: check_default_model(env_or("DEFAULT_MODEL", DEFAULT_MODEL))?,
            taxonomy_dir: PathBuf::from(env_or("TAXONOMY_DIR", "output")),
            langchain_api_key: optional_env("LANGCHAIN_API_KEY"),
            langchain_project: env_or("LANGCHAIN_PROJECT", DEFAULT_TELEMETRY_PROJECT),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.llm_base_url.clone(),
            api_key: self.dashscope_api_key.clone(),
            timeout_secs: self.llm_timeout_secs,
            telemetry: TelemetryConfig::from_credential(
                self.langchain_api_key.as_deref(),
                &self.langchain_project,
            ),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Requests that omit `model` fall back to this one, so it must be selectable.
fn check_default_model(model: String) -> Result<String> {
    if !is_known_model(&model) {
        let known: Vec<&str> = AVAILABLE_MODELS.iter().map(|(id, _)| *id).collect();
        bail!(
            "DEFAULT_MODEL {model:?} is not an available model (expected one of: {})",
            known.join(", ")
        );
    }
    Ok(model)
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            dashscope_api_key: None,
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            llm_timeout_secs: 60,
            default_model: DEFAULT_MODEL.to_string(),
            taxonomy_dir: PathBuf::from("output"),
            langchain_api_key: None,
            langchain_project: DEFAULT_TELEMETRY_PROJECT.to_string(),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}
