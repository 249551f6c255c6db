//! Workflow configuration and aggregated results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::WorkflowMode;
use super::step::{StepResult, StepSpec, StepStatus};

/// An ordered list of step specs bound to one mode
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub name: String,
    pub mode: WorkflowMode,
    pub steps: Vec<StepSpec>,
}

/// The final fields selected from the executed steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalSelection {
    pub translated_text: String,
    pub translated_poem_title: Option<String>,
    pub translated_poet_name: Option<String>,
}

impl FinalSelection {
    /// Pick the final translation from the executed steps.
    ///
    /// The last completed translation-producing step wins (the revised
    /// translation when it succeeded, else the initial translation). Title
    /// and poet name prefer the revised step's `refined_*` fields, falling
    /// back to the initial step's `translated_*` fields.
    pub fn from_steps(steps: &[StepResult]) -> Self {
        let mut selection = FinalSelection::default();
        for step in steps {
            if step.status != StepStatus::Completed || !step.kind.produces_translation() {
                continue;
            }
            if let Some(text) = step.content() {
                selection.translated_text = text.to_string();
            }
            if let Some(field) = step.kind.title_field() {
                if let Some(title) = step.fields.get(field) {
                    if !title.trim().is_empty() {
                        selection.translated_poem_title = Some(title.clone());
                    }
                }
            }
            if let Some(field) = step.kind.poet_field() {
                if let Some(poet) = step.fields.get(field) {
                    if !poet.trim().is_empty() {
                        selection.translated_poet_name = Some(poet.clone());
                    }
                }
            }
        }
        selection
    }
}

/// Aggregated outcome of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Same as the task id
    pub workflow_id: String,
    pub mode: WorkflowMode,
    pub steps: Vec<StepResult>,
    pub translated_text: String,
    pub translated_poem_title: Option<String>,
    pub translated_poet_name: Option<String>,
    pub total_tokens: u64,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_cost_usd: f64,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WorkflowResult {
    /// Aggregate step results into a workflow result
    pub fn aggregate(
        workflow_id: impl Into<String>,
        mode: WorkflowMode,
        steps: Vec<StepResult>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let selection = FinalSelection::from_steps(&steps);
        let total_tokens = steps.iter().map(|s| s.total_tokens).sum();
        let total_cost_usd = steps.iter().map(|s| s.cost_usd).sum();
        let duration_ms = steps.iter().map(|s| s.duration_ms).sum();

        // Component sums only make sense when every step reported components
        let prompt_tokens = steps
            .iter()
            .map(|s| s.prompt_tokens)
            .collect::<Option<Vec<_>>>()
            .map(|v| v.iter().sum());
        let completion_tokens = steps
            .iter()
            .map(|s| s.completion_tokens)
            .collect::<Option<Vec<_>>>()
            .map(|v| v.iter().sum());

        Self {
            workflow_id: workflow_id.into(),
            mode,
            steps,
            translated_text: selection.translated_text,
            translated_poem_title: selection.translated_poem_title,
            translated_poet_name: selection.translated_poet_name,
            total_tokens,
            prompt_tokens,
            completion_tokens,
            total_cost_usd,
            duration_ms,
            started_at,
            finished_at,
        }
    }

    /// The model identity of the initial step, used as translator info
    pub fn initial_model(&self) -> Option<&str> {
        self.steps.first().map(|s| s.model.as_str())
    }

    /// True if any executed step failed
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }

    /// Messages for each failed step
    pub fn failure_messages(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .map(|s| {
                format!(
                    "{}: {}",
                    s.kind,
                    s.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::StepKind;
    use std::collections::BTreeMap;

    fn step(kind: StepKind, status: StepStatus, fields: &[(&str, &str)]) -> StepResult {
        StepResult {
            kind,
            status,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            raw_response: String::new(),
            prompt_tokens: Some(100),
            completion_tokens: Some(50),
            total_tokens: 150,
            duration_ms: 1000,
            cost_usd: 0.01,
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            error: None,
        }
    }

    #[test]
    fn test_final_selection_prefers_revised() {
        let steps = vec![
            step(
                StepKind::InitialTranslation,
                StepStatus::Completed,
                &[
                    ("initial_translation", "Moonlight before my bed"),
                    ("translated_poem_title", "Night Thoughts"),
                    ("translated_poet_name", "Li Bai"),
                ],
            ),
            step(
                StepKind::EditorReview,
                StepStatus::Completed,
                &[("editor_suggestions", "Sharpen the image")],
            ),
            step(
                StepKind::RevisedTranslation,
                StepStatus::Completed,
                &[
                    ("revised_translation", "Bright moonlight before my bed"),
                    ("refined_translated_poem_title", "Quiet Night Thoughts"),
                ],
            ),
        ];
        let selection = FinalSelection::from_steps(&steps);
        assert_eq!(selection.translated_text, "Bright moonlight before my bed");
        assert_eq!(
            selection.translated_poem_title.as_deref(),
            Some("Quiet Night Thoughts")
        );
        // Revised step reported no poet name, initial one stands
        assert_eq!(selection.translated_poet_name.as_deref(), Some("Li Bai"));
    }

    #[test]
    fn test_final_selection_falls_back_to_initial_when_revised_failed() {
        let mut revised = step(StepKind::RevisedTranslation, StepStatus::Failed, &[]);
        revised.error = Some("parse failure".to_string());
        let steps = vec![
            step(
                StepKind::InitialTranslation,
                StepStatus::Completed,
                &[("initial_translation", "Moonlight before my bed")],
            ),
            revised,
        ];
        let selection = FinalSelection::from_steps(&steps);
        assert_eq!(selection.translated_text, "Moonlight before my bed");
    }

    #[test]
    fn test_aggregate_sums_and_components() {
        let steps = vec![
            step(
                StepKind::InitialTranslation,
                StepStatus::Completed,
                &[("initial_translation", "Moonlight")],
            ),
            step(
                StepKind::EditorReview,
                StepStatus::Completed,
                &[("editor_suggestions", "Good")],
            ),
        ];
        let now = Utc::now();
        let result =
            WorkflowResult::aggregate("wf-1", WorkflowMode::NonReasoning, steps, now, now);
        assert_eq!(result.total_tokens, 300);
        assert_eq!(result.prompt_tokens, Some(200));
        assert_eq!(result.completion_tokens, Some(100));
        assert_eq!(result.duration_ms, 2000);
        assert!(!result.has_failures());
    }

    #[test]
    fn test_aggregate_component_tokens_null_when_any_step_lacks_them() {
        let mut s1 = step(
            StepKind::InitialTranslation,
            StepStatus::Completed,
            &[("initial_translation", "Moonlight")],
        );
        s1.prompt_tokens = None;
        s1.completion_tokens = None;
        let s2 = step(
            StepKind::EditorReview,
            StepStatus::Completed,
            &[("editor_suggestions", "Good")],
        );
        let now = Utc::now();
        let result =
            WorkflowResult::aggregate("wf-1", WorkflowMode::Reasoning, vec![s1, s2], now, now);
        assert_eq!(result.prompt_tokens, None);
        assert_eq!(result.completion_tokens, None);
        assert_eq!(result.total_tokens, 300);
    }
}
