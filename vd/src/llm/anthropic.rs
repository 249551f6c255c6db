//! Anthropic Claude API provider
//!
//! Implements the LlmProvider trait for Anthropic's Messages API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::types::{LlmRequest, LlmResponse, Role, TokenUsage};
use super::{LlmError, LlmProvider};
use crate::config::ProviderConfig;

/// Anthropic Claude API provider
pub struct AnthropicProvider {
    name: String,
    api_key: String,
    base_url: String,
    http: Client,
}

impl AnthropicProvider {
    /// Create a provider from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        let http = Client::builder().build().map_err(LlmError::Network)?;

        Ok(Self {
            name: config.name.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
        })
    }

    /// Build the request body for the Anthropic API
    fn build_request_body(&self, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .conversation()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        Role::Assistant => "assistant",
                        _ => "user",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });

        if let Some(system) = request.system_prompt() {
            body["system"] = serde_json::json!(system);
        }

        body
    }

    fn parse_response(&self, api_response: AnthropicResponse, duration_ms: u64) -> LlmResponse {
        let content = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
            })
            .collect::<Vec<_>>()
            .join("");

        let usage = TokenUsage::with_components(
            api_response.usage.input_tokens,
            api_response.usage.output_tokens,
        );
        let cost_usd = usage.cost_usd(&api_response.model);

        LlmResponse {
            content,
            model: api_response.model,
            usage,
            cost_usd,
            duration_ms,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_request_body(&request);
        let started = Instant::now();

        let response = self
            .http
            .post(url)
            .timeout(request.timeout)
            .header("x-api-key", self.api_key.clone())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status().as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status,
                message: text,
            });
        }

        let api_response: AnthropicResponse = response.json().await?;
        let duration_ms = started.elapsed().as_millis() as u64;
        Ok(self.parse_response(api_response, duration_ms))
    }
}

// Anthropic API response types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
