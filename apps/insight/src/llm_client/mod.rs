/// LLM Client — the single point of entry for all Claude API calls in Insight.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All LLM interactions MUST go through this module.
///
/// Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent drift)
use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls in Insight.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 8192;
/// One initial attempt plus a single retry for transient failures.
const MAX_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(1000);
const WEB_SEARCH_TOOL: &str = "web_search_20250305";
const WEB_SEARCH_MAX_USES: u32 = 5;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No API key configured; set ANTHROPIC_API_KEY")]
    MissingApiKey,

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    tool_type: &'static str,
    name: &'static str,
    max_uses: u32,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
    #[serde(default)]
    pub citations: Option<Vec<RawCitation>>,
}

/// Citation attached to a text block. Only web search citations carry a URL.
#[derive(Debug, Deserialize)]
pub struct RawCitation {
    pub url: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A web page the model consulted while answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

impl LlmResponse {
    /// Concatenates every text block in order.
    ///
    /// With web search enabled the answer is split across several text blocks
    /// interleaved with tool blocks, so the first block alone is not enough.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Web citations in first-seen order, de-duplicated by URL.
    pub fn citations(&self) -> Vec<Citation> {
        let mut seen = HashSet::new();
        self.content
            .iter()
            .filter_map(|b| b.citations.as_ref())
            .flatten()
            .filter_map(|c| {
                let url = c.url.as_deref()?.trim();
                if url.is_empty() || !seen.insert(url.to_string()) {
                    return None;
                }
                let title = c
                    .title
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or(url);
                Some(Citation {
                    title: title.to_string(),
                    url: url.to_string(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Text of a finished completion plus any web citations it carried.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Anything that can turn a prompt into a completion. `LlmClient` is the
/// production backend; tests substitute canned responses.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<Completion, LlmError>;
}

/// The single LLM client used by all services in Insight.
/// Wraps the Anthropic Messages API with a single transient retry.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    web_search: bool,
}

impl LlmClient {
    pub fn new(
        api_key: Option<String>,
        timeout: Duration,
        web_search: bool,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: ANTHROPIC_API_URL.to_string(),
            api_key,
            web_search,
        })
    }

    /// Points the client at another Messages endpoint (a local listener in tests).
    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn web_search_enabled(&self) -> bool {
        self.web_search
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Transport errors, 429 and 5xx are retried once; anything else fails immediately.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let tools = if self.web_search {
            vec![ToolSpec {
                tool_type: WEB_SEARCH_TOOL,
                name: "web_search",
                max_uses: WEB_SEARCH_MAX_USES,
            }]
        } else {
            Vec::new()
        };

        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            tools,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    RETRY_DELAY.as_millis()
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    warn!("LLM request failed: {e}");
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if is_transient_status(status) {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: api_error_message(body),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: api_error_message(body),
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}, stop_reason={:?}",
                llm_response.usage.input_tokens,
                llm_response.usage.output_tokens,
                llm_response.stop_reason
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<Completion, LlmError> {
        let response = self.call(prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(Completion {
            citations: response.citations(),
            text,
        })
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pulls `error.message` out of an Anthropic error body, falling back to the raw body.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<AnthropicError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Narrows model output down to the outermost JSON object.
///
/// Handles markdown fences and any prose the model writes around the object
/// (common when it narrates its web searches).
pub fn extract_json_object(text: &str) -> &str {
    let text = strip_json_fences(text);
    if text.starts_with('{') && text.ends_with('}') {
        return text;
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
