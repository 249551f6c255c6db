//! Workflow orchestrator - task lifecycle from start to terminal state
//!
//! Drives the ordered steps of one translation workflow: validates input,
//! tracks the task in the registry, emits progress to the bus, and on a
//! clean run hands the result to the persistence sink and file archiver.
//! Tasks run concurrently up to a configured bound; steps within a task run
//! strictly in order.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cancel::CancelFlag;
use crate::config::{LimitsConfig, WorkflowSettings};
use crate::domain::{
    StepKind, StepState, StepStatus, TaskFilter, TaskRecord, TaskStatus, TranslationJob,
    WorkflowConfig, WorkflowMode, WorkflowResult,
};
use crate::errors::WorkflowError;
use crate::llm::ProviderFactory;
use crate::parser::OutputParser;
use crate::persist::{FileArchiver, LanguageMapper, PersistenceSink, Repository};
use crate::progress::{ProgressBus, ProgressEventKind};
use crate::prompts::PromptLibrary;
use crate::registry::TaskRegistry;
use crate::services::TaskScope;

use super::engine;
use super::vars::VariableBag;

/// Final translations shorter than this (after trim) are not persisted
const MIN_TRANSLATION_CHARS: usize = 10;

/// A request to translate one poem
#[derive(Debug, Clone)]
pub struct TranslateRequest {
    pub poem_id: String,
    pub target_lang: String,
    pub mode: WorkflowMode,
}

/// Drives translation workflows end to end
///
/// Cheap to clone: every field is shared or small. The run loop for each
/// task owns its own clone.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    bus: Arc<ProgressBus>,
    factory: Arc<ProviderFactory>,
    prompts: Arc<PromptLibrary>,
    parser: OutputParser,
    repository: Arc<dyn Repository>,
    sink: Arc<PersistenceSink>,
    archiver: Arc<FileArchiver>,
    languages: LanguageMapper,
    workflow: WorkflowSettings,
    limits: LimitsConfig,
    semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<TaskRegistry>,
        bus: Arc<ProgressBus>,
        factory: Arc<ProviderFactory>,
        prompts: Arc<PromptLibrary>,
        repository: Arc<dyn Repository>,
        sink: Arc<PersistenceSink>,
        archiver: Arc<FileArchiver>,
        languages: LanguageMapper,
        workflow: WorkflowSettings,
        limits: LimitsConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(limits.max_concurrent_tasks.max(1)));
        Self {
            registry,
            bus,
            factory,
            prompts,
            parser: OutputParser::new(),
            repository,
            sink,
            archiver,
            languages,
            workflow,
            limits,
            semaphore,
        }
    }

    /// Validate a request and schedule its workflow, returning the task id
    ///
    /// Fails synchronously with `InvalidInput` before any task is created:
    /// unknown poem, unknown/unbound mode, or identical source and target
    /// languages.
    pub async fn start(&self, request: TranslateRequest) -> Result<String, WorkflowError> {
        let specs = self
            .workflow
            .steps_for_mode(request.mode, &self.limits)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                WorkflowError::InvalidInput(format!(
                    "no steps configured for mode {}",
                    request.mode
                ))
            })?;

        let poem = self
            .repository
            .fetch_poem(&request.poem_id)
            .await
            .map_err(|e| WorkflowError::Internal(e.to_string()))?
            .ok_or_else(|| {
                WorkflowError::InvalidInput(format!("poem not found: {}", request.poem_id))
            })?;

        let target = request.target_lang.trim();
        if target.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "target language is empty".to_string(),
            ));
        }
        let source_code = self.languages.resolve(&poem.source_language);
        let target_code = self.languages.resolve(target);
        if source_code == target_code {
            return Err(WorkflowError::InvalidInput(format!(
                "source and target language are both {}",
                source_code
            )));
        }

        let job = TranslationJob::new(&poem, target, request.mode);
        let task_id = Uuid::new_v4().to_string();
        let kinds: Vec<StepKind> = specs.iter().map(|s| s.kind).collect();
        let workflow = WorkflowConfig {
            name: format!("translation_{}", request.mode),
            mode: request.mode,
            steps: specs,
        };

        let cancel = self
            .registry
            .create(TaskRecord::new(&task_id, job.clone(), &kinds));
        self.bus.open(&task_id);

        info!(%task_id, workflow = %workflow.name, poem_id = %job.poem_id, "Workflow task scheduled");

        let this = self.clone();
        let spawn_id = task_id.clone();
        tokio::spawn(async move {
            this.run(spawn_id, job, workflow, cancel).await;
        });

        Ok(task_id)
    }

    /// Snapshot a task's record
    pub fn get_status(&self, task_id: &str) -> Option<TaskRecord> {
        self.registry.get(task_id)
    }

    /// List tasks matching a filter, newest first
    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<TaskRecord> {
        self.registry.list(filter)
    }

    /// Request cooperative cancellation
    ///
    /// Returns true if a pending or running task will stop; the transition
    /// happens at the task's next suspension point.
    pub fn cancel(&self, task_id: &str) -> bool {
        let Some(record) = self.registry.get(task_id) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }
        if let Some(flag) = self.registry.cancel_flag(task_id) {
            info!(%task_id, "Cancellation requested");
            flag.cancel();
            return true;
        }
        false
    }

    /// Drop expired finished tasks and their progress channels
    pub fn gc(&self) -> usize {
        let removed = self.registry.gc();
        for task_id in &removed {
            self.bus.close(task_id);
        }
        removed.len()
    }

    /// The internal run loop for one task
    async fn run(
        self,
        task_id: String,
        job: TranslationJob,
        workflow: WorkflowConfig,
        cancel: Arc<CancelFlag>,
    ) {
        let mut scope = TaskScope::new(&task_id);

        // Wait for a concurrency slot; a cancel while queued wins the race
        let permit = tokio::select! {
            _ = cancel.cancelled() => {
                self.finish_cancelled(&task_id, 0);
                return;
            }
            permit = self.semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    let _ = self.registry.update_status(&task_id, TaskStatus::Running);
                    self.finish_fatal(&task_id, 0, &WorkflowError::Internal(
                        "concurrency limiter closed".to_string(),
                    ));
                    return;
                }
            },
        };
        scope.defer("concurrency-permit", move || drop(permit));

        if self.registry.update_status(&task_id, TaskStatus::Running).is_err() {
            // Cancelled between scheduling and start
            warn!(%task_id, "Task no longer pending at run start");
            scope.close();
            return;
        }
        self.bus.publish(
            &task_id,
            ProgressEventKind::TaskStarted,
            None,
            0,
            serde_json::json!({
                "poem_id": job.poem_id,
                "mode": workflow.mode.as_str(),
                "total_steps": workflow.steps.len(),
            }),
        );

        let started_at = Utc::now();
        let total = workflow.steps.len();
        let mut bag = VariableBag::new(&job);
        let mut results = Vec::with_capacity(total);
        let mut last_percent: u8 = 0;
        let mut any_failed = false;
        let mut aborted_fatally = false;

        for (index, spec) in workflow.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                self.finish_cancelled(&task_id, last_percent);
                scope.close();
                return;
            }

            let percent_start = (index * 100 / total) as u8;
            last_percent = last_percent.max(percent_start);
            self.registry.update_progress(
                &task_id,
                Some(spec.kind),
                percent_start,
                &[(spec.kind, StepState::Running)],
            );
            self.bus.publish(
                &task_id,
                ProgressEventKind::StepStarted,
                Some(spec.kind.as_str()),
                percent_start,
                serde_json::json!({
                    "provider": spec.provider,
                    "model": spec.model,
                    "step_number": index + 1,
                    "total_steps": total,
                }),
            );

            let step_result = match engine::run_step(
                &self.factory,
                &self.prompts,
                &self.parser,
                spec,
                &bag,
                &cancel,
            )
            .await
            {
                Ok(step_result) => step_result,
                Err(WorkflowError::Cancelled) => {
                    self.finish_cancelled(&task_id, last_percent);
                    scope.close();
                    return;
                }
                Err(e) => {
                    // Misconfiguration: abort, discard executed steps
                    error!(%task_id, step = %spec.kind, error = %e, "Fatal workflow error");
                    self.finish_fatal(&task_id, last_percent, &e);
                    scope.close();
                    return;
                }
            };

            match step_result.status {
                StepStatus::Completed => {
                    let mut percent_done = ((index + 1) * 100 / total) as u8;
                    if any_failed {
                        // A failed step means this task finishes failed;
                        // 100 is reserved for tasks that complete
                        percent_done = percent_done.min(99);
                    }
                    last_percent = last_percent.max(percent_done);
                    bag.merge_step_outputs(spec.kind, &step_result.fields);
                    self.registry.update_progress(
                        &task_id,
                        Some(spec.kind),
                        percent_done,
                        &[(spec.kind, StepState::Completed)],
                    );
                    self.bus.publish(
                        &task_id,
                        ProgressEventKind::StepCompleted,
                        Some(spec.kind.as_str()),
                        percent_done,
                        serde_json::json!({
                            "tokens": step_result.total_tokens,
                            "duration_ms": step_result.duration_ms,
                            "cost_usd": step_result.cost_usd,
                        }),
                    );
                    results.push(step_result);
                }
                _ => {
                    let message = step_result
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown step error".to_string());
                    warn!(%task_id, step = %spec.kind, error = %message, "Step failed");
                    any_failed = true;
                    // Later steps still render; this step's outputs read as
                    // empty rather than missing
                    bag.merge_step_outputs(spec.kind, &step_result.fields);
                    self.registry.update_progress(
                        &task_id,
                        Some(spec.kind),
                        percent_start,
                        &[(spec.kind, StepState::Failed)],
                    );
                    self.bus.publish(
                        &task_id,
                        ProgressEventKind::StepFailed,
                        Some(spec.kind.as_str()),
                        percent_start,
                        serde_json::json!({ "error": message }),
                    );
                    let fatal = spec.fatal;
                    results.push(step_result);
                    if fatal {
                        warn!(%task_id, step = %spec.kind, "Fatal step failed, aborting workflow");
                        aborted_fatally = true;
                        break;
                    }
                    // Non-fatal by default: record and continue
                }
            }
        }

        let result = WorkflowResult::aggregate(
            task_id.clone(),
            workflow.mode,
            results,
            started_at,
            Utc::now(),
        );
        self.finish_run(&task_id, &job, result, last_percent, aborted_fatally)
            .await;
        scope.close();
    }

    /// Wrap up after the step loop: failures, empty guard, persistence,
    /// archive, terminal event
    async fn finish_run(
        &self,
        task_id: &str,
        job: &TranslationJob,
        result: WorkflowResult,
        last_percent: u8,
        aborted_fatally: bool,
    ) {
        if result.has_failures() {
            let message = result.failure_messages().join("; ");
            self.registry.record_result(task_id, result);
            self.registry.record_error(task_id, message.clone());
            let _ = self.registry.update_status(task_id, TaskStatus::Failed);
            self.bus.publish(
                task_id,
                ProgressEventKind::TaskFailed,
                None,
                last_percent,
                serde_json::json!({
                    "error": message,
                    "error_kind": "StepFailed",
                    "aborted": aborted_fatally,
                }),
            );
            return;
        }

        // Empty final text: complete with a warning, skip both sinks
        if result.translated_text.trim().chars().count() < MIN_TRANSLATION_CHARS {
            warn!(%task_id, "Empty translation, skipping persistence and archive");
            self.registry.record_result(task_id, result);
            self.registry.add_warning(task_id, "empty_translation");
            let _ = self.registry.update_status(task_id, TaskStatus::Completed);
            self.bus.publish(
                task_id,
                ProgressEventKind::TaskCompleted,
                None,
                100,
                serde_json::json!({ "warnings": ["empty_translation"] }),
            );
            return;
        }

        let persisted = self.sink.persist(job, &result).await;

        // The archive is independent of DB persistence; its failure is only
        // ever a warning
        let mut warnings = Vec::new();
        match self.archiver.archive(job, &result) {
            Ok(path) => {
                info!(%task_id, path = %path.display(), "Workflow result archived");
            }
            Err(e) => {
                warn!(%task_id, error = %e, "Archive write failed");
                warnings.push(format!("archive_failed: {}", e));
            }
        }

        self.registry.record_result(task_id, result);
        for warning in &warnings {
            self.registry.add_warning(task_id, warning);
        }

        match persisted {
            Ok(translation_id) => {
                let _ = self.registry.update_status(task_id, TaskStatus::Completed);
                self.bus.publish(
                    task_id,
                    ProgressEventKind::TaskCompleted,
                    None,
                    100,
                    serde_json::json!({
                        "translation_id": translation_id,
                        "warnings": warnings,
                    }),
                );
            }
            Err(e) => {
                error!(%task_id, error = %e, "Persistence failed");
                self.registry.record_error(task_id, e.to_string());
                let _ = self.registry.update_status(task_id, TaskStatus::Failed);
                self.bus.publish(
                    task_id,
                    ProgressEventKind::TaskFailed,
                    None,
                    100,
                    serde_json::json!({
                        "error": e.to_string(),
                        "error_kind": e.kind(),
                        "warnings": warnings,
                    }),
                );
            }
        }
    }

    fn finish_cancelled(&self, task_id: &str, last_percent: u8) {
        info!(%task_id, "Task cancelled");
        let _ = self.registry.update_status(task_id, TaskStatus::Cancelled);
        self.bus.publish(
            task_id,
            ProgressEventKind::TaskCancelled,
            None,
            last_percent,
            serde_json::Value::Null,
        );
    }

    fn finish_fatal(&self, task_id: &str, last_percent: u8, error: &WorkflowError) {
        self.registry.record_error(task_id, error.to_string());
        let _ = self.registry.update_status(task_id, TaskStatus::Failed);
        self.bus.publish(
            task_id,
            ProgressEventKind::TaskFailed,
            None,
            last_percent,
            serde_json::json!({
                "error": error.to_string(),
                "error_kind": error.kind(),
            }),
        );
    }
}
