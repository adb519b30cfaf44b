use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{ExplainInput, Explainer, Provider};
use crate::pricing::policy::money;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 200;
const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<(serde_json::Value, CreateMessageResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError::http(
                Provider::Anthropic,
                status.as_u16(),
                text,
                raw_response_json,
            )
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse Anthropic response JSON: {text}"))?;
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone())
            .context("failed to decode Anthropic response into CreateMessageResponse")?;
        Ok((raw_json, parsed))
    }

    fn system_prompt() -> &'static str {
        "You are a travel pricing expert. Answer in 2-3 conversational sentences of plain prose. \
         No markdown, no lists, no headings."
    }

    fn user_prompt(input: &ExplainInput) -> String {
        let cheapest = input
            .cheapest_price
            .map(|p| format!("${}", money(p)))
            .unwrap_or_else(|| "N/A".to_string());
        let (decision, confidence) = input
            .recommendation
            .as_ref()
            .map(|r| (r.decision.label(), format!("{:.0}%", r.confidence * 100.0)))
            .unwrap_or(("N/A", "N/A".to_string()));

        format!(
            "Analyze this flight price data and give a clear, actionable explanation.\n\n\
Flight search context:\n\
- Route: {origin} -> {destination}\n\
- Budget: ${budget}\n\
- Departure: {date}\n\n\
Current analysis:\n\
- Cheapest flight: {cheapest}\n\
- Price range (10th-90th percentile): ${q10}-${q90}\n\
- Recent price trend: {momentum}\n\
- Recommendation: {decision}\n\
- Confidence: {confidence}\n\n\
The explanation must:\n\
1. Explain the current price position\n\
2. Give clear actionable advice\n\
3. Mention any budget considerations",
            origin = input.route.origin,
            destination = input.route.destination,
            budget = money(input.budget),
            date = input.departure_date,
            q10 = input.stats.q10,
            q90 = input.stats.q90,
            momentum = input.momentum,
        )
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                // Thinking, tool use and anything newer carry no prose.
                ContentBlock::Other => {}
            }
        }
        out.trim().to_string()
    }
}

#[async_trait::async_trait]
impl Explainer for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn explain(&self, input: &ExplainInput) -> anyhow::Result<String> {
        let req = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(Self::system_prompt().to_string()),
            messages: vec![Message {
                role: "user",
                content: Self::user_prompt(input),
            }],
        };

        let (raw_json, res) = self.create_message(req).await?;
        let text = Self::response_text(&res);
        if text.is_empty() {
            return Err(LlmDiagnosticsError::empty_text(
                Provider::Anthropic,
                res.stop_reason.as_deref(),
                raw_json,
            )
            .into());
        }

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::debug!(route = %input.route, max_tokens = self.max_tokens, "explanation truncated at max_tokens");
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Other,
}
