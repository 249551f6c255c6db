//! LLM providers
//!
//! - [`types`] - request/response types shared by all providers
//! - [`error`] - the retryable-vs-terminal error taxonomy
//! - [`client`] - the [`LlmProvider`] trait
//! - [`anthropic`] - Anthropic Messages API provider
//! - [`openai`] - OpenAI-compatible chat completions provider
//! - [`factory`] - name → provider resolution

pub mod anthropic;
pub mod client;
pub mod error;
pub mod factory;
pub mod openai;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use client::LlmProvider;
pub use error::LlmError;
pub use factory::ProviderFactory;
pub use openai::OpenAiProvider;
pub use types::{ChatMessage, LlmRequest, LlmResponse, Role, TokenUsage};
