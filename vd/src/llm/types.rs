//! LLM request/response types
//!
//! Provider-agnostic; each provider converts to its own wire format.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One completion request - everything needed for a single LLM call
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-attempt timeout; the retry engine enforces it
    pub timeout: Duration,
}

impl LlmRequest {
    /// Concatenated system message content, if any
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Messages excluding system ones
    pub fn conversation(&self) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect()
    }
}

/// Token usage for one call
///
/// When a provider reports only a total, the component fields stay `None`;
/// when both components are reported, `prompt + completion == total`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Usage with both components reported
    pub fn with_components(prompt: u64, completion: u64) -> Self {
        Self {
            prompt_tokens: Some(prompt),
            completion_tokens: Some(completion),
            total_tokens: prompt + completion,
        }
    }

    /// Usage with only a total reported
    pub fn total_only(total: u64) -> Self {
        Self {
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: total,
        }
    }

    /// Calculate cost in USD based on model pricing
    pub fn cost_usd(&self, model: &str) -> f64 {
        let (input_price, output_price) = match model {
            m if m.contains("opus") => (15.0, 75.0),
            m if m.contains("sonnet") => (3.0, 15.0),
            m if m.contains("haiku") => (0.25, 1.25),
            m if m.contains("gpt-4o-mini") => (0.15, 0.6),
            m if m.contains("gpt-4o") => (2.5, 10.0),
            m if m.contains("o3") => (2.0, 8.0),
            _ => (3.0, 15.0), // Assume mid-tier pricing for unknown models
        };

        match (self.prompt_tokens, self.completion_tokens) {
            (Some(input), Some(output)) => {
                (input as f64 / 1_000_000.0) * input_price
                    + (output as f64 / 1_000_000.0) * output_price
            }
            // Only a total: price it all at the input rate
            _ => (self.total_tokens as f64 / 1_000_000.0) * input_price,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    /// The model that actually served the request
    pub model: String,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub duration_ms: u64,
}
