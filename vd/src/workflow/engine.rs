//! Single-step execution: render → call → parse
//!
//! Separates step mechanics from task lifecycle. A step-level failure
//! (provider gave up, output unparseable) comes back as a failed
//! [`StepResult`]; orchestrator-level problems (unknown provider or
//! template, cancellation) come back as errors and abort the task.

use std::time::Duration;

use tracing::{info, warn};

use crate::cancel::CancelFlag;
use crate::domain::{StepResult, StepSpec, StepStatus};
use crate::llm::{ChatMessage, LlmRequest, ProviderFactory};
use crate::parser::{OutputParser, ParseVerdict};
use crate::prompts::PromptLibrary;
use crate::retry::{self, RetryError, RetryPolicy};

use super::vars::VariableBag;

/// Execute one step against the variable bag
pub async fn run_step(
    factory: &ProviderFactory,
    prompts: &PromptLibrary,
    parser: &OutputParser,
    spec: &StepSpec,
    bag: &VariableBag,
    cancel: &CancelFlag,
) -> Result<StepResult, crate::errors::WorkflowError> {
    // Misconfiguration is fatal to the task, not a step failure
    let rendered = prompts.render(&spec.prompt_template, &bag.as_json())?;
    let provider = factory.get(&spec.provider)?;

    let mut messages = Vec::with_capacity(2);
    if !rendered.system.trim().is_empty() {
        messages.push(ChatMessage::system(rendered.system.clone()));
    }
    messages.push(ChatMessage::user(rendered.user.clone()));

    let request = LlmRequest {
        model: spec.model.clone(),
        messages,
        temperature: spec.temperature,
        max_tokens: spec.max_tokens,
        timeout: spec.timeout,
    };

    let policy = RetryPolicy {
        max_attempts: spec.max_attempts,
        base_delay: Duration::from_secs(1),
        backoff_factor: 2.0,
        max_delay: spec.timeout,
        attempt_timeout: spec.timeout,
    };

    info!(
        step = %spec.kind,
        provider = %spec.provider,
        model = %spec.model,
        "Executing workflow step"
    );

    // Step duration covers every attempt and backoff wait, not just the
    // winning call; token counts come from the winning call alone
    let step_started = std::time::Instant::now();

    let response = match retry::execute(&policy, cancel, |_| provider.generate(request.clone()))
        .await
    {
        Ok(response) => response,
        Err(RetryError::Cancelled) => return Err(crate::errors::WorkflowError::Cancelled),
        Err(RetryError::Exhausted { attempts, source }) => {
            warn!(step = %spec.kind, %attempts, error = %source, "Step exhausted retries");
            let mut failed = StepResult::failed(
                spec.kind,
                &spec.provider,
                &spec.model,
                format!("all {} attempts failed: {}", attempts, source),
            );
            failed.duration_ms = step_started.elapsed().as_millis() as u64;
            return Ok(failed);
        }
        Err(RetryError::Fatal(source)) => {
            warn!(step = %spec.kind, error = %source, "Step failed on non-retriable error");
            let mut failed = StepResult::failed(
                spec.kind,
                &spec.provider,
                &spec.model,
                source.to_string(),
            );
            failed.duration_ms = step_started.elapsed().as_millis() as u64;
            return Ok(failed);
        }
    };

    let parsed = parser.parse(&response.content, &spec.required_fields);

    if parsed.verdict == ParseVerdict::Failed {
        // Keep the raw response for the record; retrying won't change it
        let mut failed = StepResult::failed(
            spec.kind,
            &spec.provider,
            &response.model,
            format!("output parsing failed: {}", parsed.errors.join("; ")),
        );
        failed.raw_response = response.content;
        failed.prompt_tokens = response.usage.prompt_tokens;
        failed.completion_tokens = response.usage.completion_tokens;
        failed.total_tokens = response.usage.total_tokens;
        failed.duration_ms = step_started.elapsed().as_millis() as u64;
        failed.cost_usd = response.cost_usd;
        return Ok(failed);
    }

    if parsed.verdict == ParseVerdict::Partial {
        warn!(
            step = %spec.kind,
            errors = ?parsed.errors,
            "Step output partially parsed"
        );
    }

    Ok(StepResult {
        kind: spec.kind,
        status: StepStatus::Completed,
        fields: parsed.fields,
        raw_response: response.content,
        prompt_tokens: response.usage.prompt_tokens,
        completion_tokens: response.usage.completion_tokens,
        total_tokens: response.usage.total_tokens,
        duration_ms: step_started.elapsed().as_millis() as u64,
        cost_usd: response.cost_usd,
        provider: spec.provider.clone(),
        model: response.model,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Poem, StepKind, TranslationJob, WorkflowMode};
    use crate::llm::client::mock::{response_with, MockProvider};
    use crate::llm::LlmError;
    use std::sync::Arc;

    fn spec(kind: StepKind, max_attempts: u32) -> StepSpec {
        StepSpec {
            kind,
            provider: "mock".to_string(),
            model: "mock-model".to_string(),
            prompt_template: kind.as_str().to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(5),
            max_attempts,
            required_fields: vec![kind.content_field().to_string()],
            fatal: false,
        }
    }

    fn bag() -> VariableBag {
        let poem = Poem {
            id: "p-1".to_string(),
            poet_name: "Li Bai".to_string(),
            poem_title: "Quiet Night Thoughts".to_string(),
            original_text: "床前明月光".to_string(),
            source_language: "Chinese".to_string(),
        };
        VariableBag::new(&TranslationJob::new(
            &poem,
            "English",
            WorkflowMode::NonReasoning,
        ))
    }

    fn factory_with(provider: MockProvider) -> ProviderFactory {
        let mut factory = ProviderFactory::empty();
        factory.register("mock", Arc::new(provider));
        factory
    }

    #[tokio::test]
    async fn test_step_completes_and_parses() {
        let factory = factory_with(MockProvider::text(
            "<initial_translation>Moonlight before my bed</initial_translation>",
        ));
        let result = run_step(
            &factory,
            &PromptLibrary::embedded_only(),
            &OutputParser::new(),
            &spec(StepKind::InitialTranslation, 3),
            &bag(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, StepStatus::Completed);
        assert_eq!(result.content(), Some("Moonlight before my bed"));
        assert_eq!(result.total_tokens, 150);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_retriable_error_then_success() {
        let provider = MockProvider::new(vec![
            Err(LlmError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            }),
            Err(LlmError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            }),
            Ok(response_with(
                "<initial_translation>Moonlight</initial_translation>",
            )),
        ]);
        let factory = factory_with(provider);

        let result = run_step(
            &factory,
            &PromptLibrary::embedded_only(),
            &OutputParser::new(),
            &spec(StepKind::InitialTranslation, 3),
            &bag(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_exhausted_retries_is_step_failure() {
        let provider = MockProvider::new(vec![
            Err(LlmError::ApiError {
                status: 500,
                message: "boom".to_string(),
            }),
            Err(LlmError::ApiError {
                status: 500,
                message: "boom".to_string(),
            }),
        ]);
        let factory = factory_with(provider);

        let result = run_step(
            &factory,
            &PromptLibrary::embedded_only(),
            &OutputParser::new(),
            &spec(StepKind::InitialTranslation, 2),
            &bag(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, StepStatus::Failed);
        assert!(result.error.as_ref().unwrap().contains("2 attempts"));
    }

    #[tokio::test]
    async fn test_unparseable_output_is_step_failure_with_raw_kept() {
        let factory = factory_with(MockProvider::text("I refuse to use tags."));
        let result = run_step(
            &factory,
            &PromptLibrary::embedded_only(),
            &OutputParser::new(),
            &spec(StepKind::InitialTranslation, 1),
            &bag(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.raw_response, "I refuse to use tags.");
        assert!(result.error.as_ref().unwrap().contains("parsing failed"));
        // Tokens from the real call are still recorded
        assert_eq!(result.total_tokens, 150);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_fatal() {
        let factory = ProviderFactory::empty();
        let err = run_step(
            &factory,
            &PromptLibrary::embedded_only(),
            &OutputParser::new(),
            &spec(StepKind::InitialTranslation, 1),
            &bag(),
            &CancelFlag::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "UnknownProvider");
    }

    #[tokio::test]
    async fn test_unknown_template_is_fatal() {
        let factory = factory_with(MockProvider::text("x"));
        let mut bad_spec = spec(StepKind::InitialTranslation, 1);
        bad_spec.prompt_template = "does_not_exist".to_string();

        let err = run_step(
            &factory,
            &PromptLibrary::embedded_only(),
            &OutputParser::new(),
            &bad_spec,
            &bag(),
            &CancelFlag::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "UnknownTemplate");
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let factory = factory_with(MockProvider::text("x"));
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = run_step(
            &factory,
            &PromptLibrary::embedded_only(),
            &OutputParser::new(),
            &spec(StepKind::InitialTranslation, 1),
            &bag(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, crate::errors::WorkflowError::Cancelled));
    }
}
