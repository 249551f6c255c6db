//! OpenAI-compatible chat completions provider
//!
//! Works against api.openai.com and any endpoint speaking the same protocol
//! (the non-reasoning modes typically bind here).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::types::{LlmRequest, LlmResponse, Role, TokenUsage};
use super::{LlmError, LlmProvider};
use crate::config::ProviderConfig;

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    name: String,
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenAiProvider {
    /// Create a provider from configuration
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

    fn build_request_body(&self, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();

        serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    fn parse_response(
        &self,
        api_response: OpenAiResponse,
        duration_ms: u64,
    ) -> Result<LlmResponse, LlmError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

        // Some compatible endpoints omit the component counts
        let usage = match api_response.usage {
            Some(u) => match (u.prompt_tokens, u.completion_tokens) {
                (Some(p), Some(c)) => TokenUsage::with_components(p, c),
                _ => TokenUsage::total_only(u.total_tokens.unwrap_or(0)),
            },
            None => TokenUsage::default(),
        };
        let cost_usd = usage.cost_usd(&api_response.model);

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model,
            usage,
            cost_usd,
            duration_ms,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(&request);
        let started = Instant::now();

        let response = self
            .http
            .post(url)
            .timeout(request.timeout)
            .bearer_auth(self.api_key.clone())
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

        let api_response: OpenAiResponse = response.json().await?;
        let duration_ms = started.elapsed().as_millis() as u64;
        self.parse_response(api_response, duration_ms)
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}
