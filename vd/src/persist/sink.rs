//! Persistence sink - workflow result → atomic artifact bundle
//!
//! Builds the translation, AI log, and per-step rows from a finished
//! workflow and hands them to the repository as one bundle. Language names
//! are normalized to canonical codes on the way in. All-or-nothing: the
//! repository commits the bundle in a single transaction.

use std::sync::Arc;

use tracing::{debug, info};

use versestore::{NewAiLog, NewTranslation, NewWorkflowStep, TranslationBundle};

use crate::domain::{StepResult, StepStatus, TranslationJob, WorkflowResult};
use crate::errors::WorkflowError;

use super::language::LanguageMapper;
use super::repository::Repository;

/// Writes one workflow's artifacts in one transaction
pub struct PersistenceSink {
    repository: Arc<dyn Repository>,
    languages: LanguageMapper,
}

impl PersistenceSink {
    pub fn new(repository: Arc<dyn Repository>, languages: LanguageMapper) -> Self {
        Self {
            repository,
            languages,
        }
    }

    /// Persist a completed workflow, returning the translation id
    pub async fn persist(
        &self,
        job: &TranslationJob,
        result: &WorkflowResult,
    ) -> Result<String, WorkflowError> {
        let bundle = self.build_bundle(job, result);
        debug!(
            workflow_id = %result.workflow_id,
            steps = bundle.steps.len(),
            "Persisting translation bundle"
        );
        let translation_id = self
            .repository
            .persist_translation(bundle)
            .await
            .map_err(|e| WorkflowError::Persistence(e.to_string()))?;
        info!(%translation_id, workflow_id = %result.workflow_id, "Translation persisted");
        Ok(translation_id)
    }

    /// Assemble the bundle without writing it (tests inspect this directly)
    pub fn build_bundle(&self, job: &TranslationJob, result: &WorkflowResult) -> TranslationBundle {
        let translation = NewTranslation {
            poem_id: job.poem_id.clone(),
            source_language: self.languages.resolve(&job.source_lang),
            target_language: self.languages.resolve(&job.target_lang),
            translated_text: result.translated_text.clone(),
            translated_poem_title: result.translated_poem_title.clone(),
            translated_poet_name: result.translated_poet_name.clone(),
            translator_type: "ai".to_string(),
            translator_info: result.initial_model().map(|m| m.to_string()),
        };

        let mut token_usage = serde_json::json!({
            "total_tokens": result.total_tokens,
            "workflow_mode": result.mode.as_str(),
        });
        if let Some(prompt) = result.prompt_tokens {
            token_usage["prompt_tokens"] = serde_json::json!(prompt);
        }
        if let Some(completion) = result.completion_tokens {
            token_usage["completion_tokens"] = serde_json::json!(completion);
        }

        let ai_log = NewAiLog {
            model_name: result
                .initial_model()
                .unwrap_or("unknown")
                .to_string(),
            workflow_mode: result.mode.as_str().to_string(),
            token_usage,
            cost_info: serde_json::json!({
                "total_cost": result.total_cost_usd,
                "workflow_mode": result.mode.as_str(),
            }),
            runtime_seconds: result.duration_ms as f64 / 1000.0,
            notes: Some(format!(
                "Translation workflow completed using {} mode",
                result.mode.as_str()
            )),
        };

        let steps = result
            .steps
            .iter()
            .enumerate()
            .filter(|(_, s)| executed(s))
            .map(|(i, s)| step_row(&result.workflow_id, i as u32 + 1, s))
            .collect();

        TranslationBundle {
            translation,
            ai_log,
            steps,
        }
    }
}

/// Steps that ran (successfully or not) get a row; skipped ones don't
fn executed(step: &StepResult) -> bool {
    matches!(step.status, StepStatus::Completed | StepStatus::Failed)
}

fn step_row(workflow_id: &str, step_order: u32, step: &StepResult) -> NewWorkflowStep {
    let content = step
        .content()
        .map(|s| s.to_string())
        .unwrap_or_else(|| step.raw_response.clone());

    let translated_title = step
        .kind
        .title_field()
        .and_then(|f| step.fields.get(f))
        .cloned();
    let translated_poet_name = step
        .kind
        .poet_field()
        .and_then(|f| step.fields.get(f))
        .cloned();

    NewWorkflowStep {
        workflow_id: workflow_id.to_string(),
        step_type: step.kind.as_str().to_string(),
        step_order,
        content,
        notes: step.notes().map(|s| s.to_string()),
        model_info: step.model_info(),
        tokens_used: Some(step.total_tokens),
        prompt_tokens: step.prompt_tokens,
        completion_tokens: step.completion_tokens,
        duration_seconds: Some(step.duration_ms as f64 / 1000.0),
        cost: Some(step.cost_usd),
        translated_title,
        translated_poet_name,
    }
}
