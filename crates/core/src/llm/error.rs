use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

/// Longest raw provider output carried into a log line.
pub const RAW_EXCERPT_CHARS: usize = 500;

/// An explainer call that reached the provider but produced nothing usable.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    pub fn http(provider: Provider, status: u16, body: String, json: Option<Value>) -> Self {
        Self {
            provider,
            stage: "http",
            detail: format!("status={status}"),
            raw_output: Some(body),
            raw_response_json: json,
        }
    }

    pub fn empty_text(provider: Provider, stop_reason: Option<&str>, json: Value) -> Self {
        Self {
            provider,
            stage: "empty_text",
            detail: format!("stop_reason={}", stop_reason.unwrap_or("none")),
            raw_output: None,
            raw_response_json: Some(json),
        }
    }

    /// Raw body if there is one, else the re-serialized JSON, clipped to
    /// `max_chars` characters.
    pub fn raw_excerpt(&self, max_chars: usize) -> Option<String> {
        let raw = match (&self.raw_output, &self.raw_response_json) {
            (Some(text), _) => text.clone(),
            (None, Some(json)) => json.to_string(),
            (None, None) => return None,
        };
        if raw.chars().count() <= max_chars {
            return Some(raw);
        }
        let mut clipped: String = raw.chars().take(max_chars).collect();
        clipped.push_str("...");
        Some(clipped)
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "explainer error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}
