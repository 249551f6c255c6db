//! Task registry - process-local store of workflow tasks
//!
//! A concurrent map of task id → record, written only by the orchestrator.
//! Reads hand out cloned snapshots. Terminal records never mutate again;
//! progress updates merge step states instead of replacing them, so a
//! partial update can never drop a step the caller didn't mention.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::domain::{StepKind, StepState, TaskFilter, TaskRecord, TaskStatus};
use crate::errors::WorkflowError;

struct TaskEntry {
    record: TaskRecord,
    cancel: Arc<CancelFlag>,
}

/// Process-local store of in-flight and recently-finished tasks
pub struct TaskRegistry {
    tasks: DashMap<String, TaskEntry>,
    /// Terminal records older than this are garbage-collected
    ttl: Duration,
}

impl TaskRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tasks: DashMap::new(),
            ttl,
        }
    }

    /// Insert a fresh record, returning its cancel flag
    pub fn create(&self, record: TaskRecord) -> Arc<CancelFlag> {
        let cancel = Arc::new(CancelFlag::new());
        debug!(task_id = %record.task_id, "Registering task");
        self.tasks.insert(
            record.task_id.clone(),
            TaskEntry {
                record,
                cancel: cancel.clone(),
            },
        );
        cancel
    }

    /// Snapshot a record by id
    pub fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.get(task_id).map(|e| e.record.clone())
    }

    /// The cancel flag for a task
    pub fn cancel_flag(&self, task_id: &str) -> Option<Arc<CancelFlag>> {
        self.tasks.get(task_id).map(|e| e.cancel.clone())
    }

    /// Transition a task's status
    ///
    /// Enforces the lifecycle: terminal states are absorbing, and only the
    /// transitions the state machine allows go through. Timestamps move with
    /// the transition (`started_at` on running, `finished_at` on terminal).
    pub fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<(), WorkflowError> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| WorkflowError::UnknownTask(task_id.to_string()))?;

        let current = entry.record.status;
        if !current.can_transition_to(status) {
            return Err(WorkflowError::IllegalTransition(format!(
                "{} -> {} for task {}",
                current.as_str(),
                status.as_str(),
                task_id
            )));
        }

        let now = Utc::now();
        entry.record.status = status;
        entry.record.updated_at = now;
        if status == TaskStatus::Running {
            entry.record.started_at = Some(now);
        }
        if status.is_terminal() {
            entry.record.finished_at = Some(now);
            entry.record.current_step = None;
        }
        debug!(%task_id, status = status.as_str(), "Task status updated");
        Ok(())
    }

    /// Merge a progress update into a record
    ///
    /// Progress percent only moves forward, and `step_updates` merges into
    /// the existing step states without touching steps it doesn't name.
    /// Updates against terminal records are dropped.
    pub fn update_progress(
        &self,
        task_id: &str,
        current_step: Option<StepKind>,
        progress_percent: u8,
        step_updates: &[(StepKind, StepState)],
    ) {
        let Some(mut entry) = self.tasks.get_mut(task_id) else {
            warn!(%task_id, "Progress update for unknown task");
            return;
        };

        if entry.record.status.is_terminal() {
            warn!(%task_id, "Dropping progress update for terminal task");
            return;
        }

        let record = &mut entry.record;
        record.current_step = current_step;
        record.progress_percent = record.progress_percent.max(progress_percent.min(100));
        for (kind, state) in step_updates {
            record
                .step_states
                .insert(kind.as_str().to_string(), *state);
        }
        record.updated_at = Utc::now();
    }

    /// Attach the final result to a running task
    pub fn record_result(&self, task_id: &str, result: crate::domain::WorkflowResult) {
        if let Some(mut entry) = self.tasks.get_mut(task_id) {
            if entry.record.status.is_terminal() {
                warn!(%task_id, "Dropping result for terminal task");
                return;
            }
            entry.record.result = Some(result);
            entry.record.updated_at = Utc::now();
        }
    }

    /// Attach an error message to a running task
    pub fn record_error(&self, task_id: &str, error: impl Into<String>) {
        if let Some(mut entry) = self.tasks.get_mut(task_id) {
            if entry.record.status.is_terminal() {
                return;
            }
            entry.record.error = Some(error.into());
            entry.record.updated_at = Utc::now();
        }
    }

    /// Append a warning to a task
    pub fn add_warning(&self, task_id: &str, warning: impl Into<String>) {
        if let Some(mut entry) = self.tasks.get_mut(task_id) {
            if entry.record.status.is_terminal() {
                return;
            }
            entry.record.warnings.push(warning.into());
            entry.record.updated_at = Utc::now();
        }
    }

    /// Snapshot all records matching a filter, newest first
    pub fn list(&self, filter: &TaskFilter) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> = self
            .tasks
            .iter()
            .filter(|e| filter.matches(&e.record))
            .map(|e| e.record.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Remove terminal records older than the TTL, returning their ids
    pub fn gc(&self) -> Vec<String> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        let mut removed = Vec::new();
        self.tasks.retain(|task_id, entry| {
            if !entry.record.status.is_terminal() {
                return true;
            }
            let finished = entry.record.finished_at.unwrap_or(entry.record.updated_at);
            if finished > cutoff {
                true
            } else {
                removed.push(task_id.clone());
                false
            }
        });
        if !removed.is_empty() {
            info!(removed = removed.len(), "Garbage-collected expired tasks");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
