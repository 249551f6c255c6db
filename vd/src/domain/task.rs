//! Task records - the registry's view of a workflow run

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::TranslationJob;
use super::step::StepKind;
use super::workflow::WorkflowResult;

/// Task lifecycle status
///
/// ```text
/// pending → running → completed | failed | cancelled
/// pending → cancelled (before the run begins)
/// ```
/// Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether `self → next` is a legal transition
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Pending, TaskStatus::Running) => true,
            (TaskStatus::Pending, TaskStatus::Cancelled) => true,
            (TaskStatus::Running, TaskStatus::Completed) => true,
            (TaskStatus::Running, TaskStatus::Failed) => true,
            (TaskStatus::Running, TaskStatus::Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

/// Per-step state as surfaced to progress subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Waiting,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// The registry's record of one workflow task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub job: TranslationJob,
    pub status: TaskStatus,
    /// Non-decreasing, 0–100
    pub progress_percent: u8,
    pub current_step: Option<StepKind>,
    /// Step name → state; keys are the configured steps
    pub step_states: BTreeMap<String, StepState>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub result: Option<WorkflowResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// A fresh pending record with every configured step waiting
    pub fn new(task_id: impl Into<String>, job: TranslationJob, steps: &[StepKind]) -> Self {
        let now = Utc::now();
        let step_states = steps
            .iter()
            .map(|k| (k.as_str().to_string(), StepState::Waiting))
            .collect();
        Self {
            task_id: task_id.into(),
            job,
            status: TaskStatus::Pending,
            progress_percent: 0,
            current_step: None,
            step_states,
            warnings: Vec::new(),
            error: None,
            result: None,
            created_at: now,
            started_at: None,
            updated_at: now,
            finished_at: None,
        }
    }
}

/// Filter for listing tasks
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub poem_id: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, record: &TaskRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(ref poem_id) = self.poem_id {
            if &record.job.poem_id != poem_id {
                return false;
            }
        }
        true
    }
}
