//! Workflow steps - specs, kinds, and results
//!
//! The step vocabulary is fixed: `initial_translation`, `editor_review`,
//! `revised_translation`, in that order, `step_order` starting at 1.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The three stages of a translation workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    InitialTranslation,
    EditorReview,
    RevisedTranslation,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::InitialTranslation => "initial_translation",
            StepKind::EditorReview => "editor_review",
            StepKind::RevisedTranslation => "revised_translation",
        }
    }

    /// The parsed field holding this step's main output
    pub fn content_field(&self) -> &'static str {
        match self {
            StepKind::InitialTranslation => "initial_translation",
            StepKind::EditorReview => "editor_suggestions",
            StepKind::RevisedTranslation => "revised_translation",
        }
    }

    /// The parsed field holding translator notes, if this step produces any
    pub fn notes_field(&self) -> Option<&'static str> {
        match self {
            StepKind::InitialTranslation => Some("initial_translation_notes"),
            StepKind::EditorReview => None,
            StepKind::RevisedTranslation => Some("revised_translation_notes"),
        }
    }

    /// The parsed field holding the translated poem title, if any
    pub fn title_field(&self) -> Option<&'static str> {
        match self {
            StepKind::InitialTranslation => Some("translated_poem_title"),
            StepKind::EditorReview => None,
            StepKind::RevisedTranslation => Some("refined_translated_poem_title"),
        }
    }

    /// The parsed field holding the translated poet name, if any
    pub fn poet_field(&self) -> Option<&'static str> {
        match self {
            StepKind::InitialTranslation => Some("translated_poet_name"),
            StepKind::EditorReview => None,
            StepKind::RevisedTranslation => Some("refined_translated_poet_name"),
        }
    }

    /// True for steps whose content is a translation of the poem
    pub fn produces_translation(&self) -> bool {
        !matches!(self, StepKind::EditorReview)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "initial_translation" => Ok(StepKind::InitialTranslation),
            "editor_review" => Ok(StepKind::EditorReview),
            // The legacy vocabulary used "translator_revision" in places
            "revised_translation" | "translator_revision" => Ok(StepKind::RevisedTranslation),
            other => Err(format!("unknown step kind: {}", other)),
        }
    }
}

/// Everything needed to execute one step
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub kind: StepKind,
    pub provider: String,
    pub model: String,
    pub prompt_template: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Fields the output parser must find for the step to succeed
    pub required_fields: Vec<String>,
    /// When true, a failure on this step aborts the whole workflow
    pub fatal: bool,
}

/// Status of an executed (or not-yet-executed) step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Result of executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub kind: StepKind,
    pub status: StepStatus,
    /// Parsed output fields (tag name → trimmed content)
    pub fields: BTreeMap<String, String>,
    /// The provider's raw response text, kept even when parsing failed
    pub raw_response: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: u64,
    pub duration_ms: u64,
    pub cost_usd: f64,
    pub provider: String,
    pub model: String,
    pub error: Option<String>,
}

impl StepResult {
    /// An empty failed result carrying an error message
    pub fn failed(kind: StepKind, provider: &str, model: &str, error: impl Into<String>) -> Self {
        Self {
            kind,
            status: StepStatus::Failed,
            fields: BTreeMap::new(),
            raw_response: String::new(),
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: 0,
            duration_ms: 0,
            cost_usd: 0.0,
            provider: provider.to_string(),
            model: model.to_string(),
            error: Some(error.into()),
        }
    }

    /// This step's main output, if parsed
    pub fn content(&self) -> Option<&str> {
        self.fields.get(self.kind.content_field()).map(|s| s.as_str())
    }

    /// This step's translator notes, if parsed
    pub fn notes(&self) -> Option<&str> {
        self.kind
            .notes_field()
            .and_then(|f| self.fields.get(f))
            .map(|s| s.as_str())
    }

    /// Model info as a JSON object for persistence
    pub fn model_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": self.provider,
            "model": self.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_kind_vocabulary() {
        assert_eq!(StepKind::InitialTranslation.as_str(), "initial_translation");
        assert_eq!(StepKind::EditorReview.as_str(), "editor_review");
        assert_eq!(StepKind::RevisedTranslation.as_str(), "revised_translation");
    }

    #[test]
    fn test_step_kind_legacy_alias() {
        assert_eq!(
            "translator_revision".parse::<StepKind>().unwrap(),
            StepKind::RevisedTranslation
        );
    }

    #[test]
    fn test_content_fields() {
        assert_eq!(StepKind::EditorReview.content_field(), "editor_suggestions");
        assert_eq!(StepKind::EditorReview.notes_field(), None);
        assert!(!StepKind::EditorReview.produces_translation());
        assert!(StepKind::RevisedTranslation.produces_translation());
    }

    #[test]
    fn test_step_result_accessors() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "revised_translation".to_string(),
            "Bright moonlight before my bed".to_string(),
        );
        fields.insert(
            "revised_translation_notes".to_string(),
            "Tightened the opening image".to_string(),
        );
        let result = StepResult {
            kind: StepKind::RevisedTranslation,
            status: StepStatus::Completed,
            fields,
            raw_response: String::new(),
            prompt_tokens: Some(100),
            completion_tokens: Some(40),
            total_tokens: 140,
            duration_ms: 1200,
            cost_usd: 0.002,
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            error: None,
        };
        assert_eq!(result.content(), Some("Bright moonlight before my bed"));
        assert_eq!(result.notes(), Some("Tightened the opening image"));
        assert_eq!(result.model_info()["provider"], "anthropic");
    }
}
