//! Row types for the store
//!
//! `New*` types describe rows to insert (ids and timestamps are assigned by
//! the store); `*Row` types are what queries return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A poem to insert
#[derive(Debug, Clone)]
pub struct NewPoem {
    pub poet_name: String,
    pub poem_title: String,
    pub original_text: String,
    pub source_language: String,
}

/// A stored poem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoemRow {
    pub id: String,
    pub poet_name: String,
    pub poem_title: String,
    pub original_text: String,
    pub source_language: String,
    pub created_at: DateTime<Utc>,
}

/// A translation artifact to insert
///
/// Language fields hold canonical codes (e.g. `zh-CN`), not display names.
/// The caller normalizes before persisting.
#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub poem_id: String,
    pub source_language: String,
    pub target_language: String,
    pub translated_text: String,
    pub translated_poem_title: Option<String>,
    pub translated_poet_name: Option<String>,
    pub translator_type: String,
    pub translator_info: Option<String>,
}

/// A stored translation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRow {
    pub id: String,
    pub poem_id: String,
    pub source_language: String,
    pub target_language: String,
    pub translated_text: String,
    pub translated_poem_title: Option<String>,
    pub translated_poet_name: Option<String>,
    pub translator_type: String,
    pub translator_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An AI log row to insert (one per translation)
#[derive(Debug, Clone)]
pub struct NewAiLog {
    pub model_name: String,
    pub workflow_mode: String,
    /// Aggregated token usage, serialized as JSON
    pub token_usage: serde_json::Value,
    /// Aggregated cost info, serialized as JSON
    pub cost_info: serde_json::Value,
    pub runtime_seconds: f64,
    pub notes: Option<String>,
}

/// A stored AI log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiLogRow {
    pub id: String,
    pub translation_id: String,
    pub model_name: String,
    pub workflow_mode: String,
    pub token_usage: serde_json::Value,
    pub cost_info: serde_json::Value,
    pub runtime_seconds: f64,
    pub notes: Option<String>,
}

/// A workflow step row to insert
#[derive(Debug, Clone)]
pub struct NewWorkflowStep {
    pub workflow_id: String,
    /// Canonical step vocabulary: `initial_translation`, `editor_review`,
    /// `revised_translation`
    pub step_type: String,
    /// 1-based position in the workflow
    pub step_order: u32,
    pub content: String,
    pub notes: Option<String>,
    pub model_info: serde_json::Value,
    pub tokens_used: Option<u64>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub duration_seconds: Option<f64>,
    pub cost: Option<f64>,
    pub translated_title: Option<String>,
    pub translated_poet_name: Option<String>,
}

/// A stored workflow step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStepRow {
    pub id: String,
    pub translation_id: String,
    pub ai_log_id: String,
    pub workflow_id: String,
    pub step_type: String,
    pub step_order: u32,
    pub content: String,
    pub notes: Option<String>,
    pub model_info: serde_json::Value,
    pub tokens_used: Option<u64>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub duration_seconds: Option<f64>,
    pub cost: Option<f64>,
    pub translated_title: Option<String>,
    pub translated_poet_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Everything one workflow run persists, written atomically
#[derive(Debug, Clone)]
pub struct TranslationBundle {
    pub translation: NewTranslation,
    pub ai_log: NewAiLog,
    pub steps: Vec<NewWorkflowStep>,
}
