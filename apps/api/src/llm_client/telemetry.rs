//! Optional per-call telemetry, enabled only when a tracing credential is configured.
//! Emits structured events on the `telemetry` target; never affects call results.

use std::time::Duration;

use tracing::info;

use super::Usage;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub project: String,
}

impl TelemetryConfig {
    /// `None` unless a non-blank tracing key is present.
    pub fn from_credential(api_key: Option<&str>, project: &str) -> Option<Self> {
        api_key
            .filter(|key| !key.trim().is_empty())
            .map(|_| Self {
                project: project.to_string(),
            })
    }

    pub fn record_call(&self, model: &str, latency: Duration, usage: Usage) {
        info!(
            target: "telemetry",
            project = %self.project,
            model,
            latency_ms = latency.as_millis() as u64,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "llm call"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_credential() {
        assert!(TelemetryConfig::from_credential(None, "p").is_none());
        assert!(TelemetryConfig::from_credential(Some(""), "p").is_none());
    }

    #[test]
    fn test_enabled_with_credential() {
        let telemetry = TelemetryConfig::from_credential(Some("ls-key"), "留学标签识别").unwrap();
        assert_eq!(telemetry.project, "留学标签识别");
        telemetry.record_call("qwen-plus", Duration::from_millis(250), Usage::default());
    }
}
