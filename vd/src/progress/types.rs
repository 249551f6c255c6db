//! Progress event types
//!
//! Events are append-only per task, with a strictly increasing `seq`
//! assigned at publish time. A terminal event is the last event a task ever
//! emits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The progress event vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    TaskStarted,
    StepStarted,
    StepProgress,
    StepCompleted,
    StepFailed,
    TaskCompleted,
    TaskFailed,
    TaskCancelled,
    Heartbeat,
    /// The ring buffer overflowed and events before this one were dropped
    BackpressureDrop,
}

impl ProgressEventKind {
    /// Terminal kinds end the stream for their task
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEventKind::TaskCompleted
                | ProgressEventKind::TaskFailed
                | ProgressEventKind::TaskCancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressEventKind::TaskStarted => "task_started",
            ProgressEventKind::StepStarted => "step_started",
            ProgressEventKind::StepProgress => "step_progress",
            ProgressEventKind::StepCompleted => "step_completed",
            ProgressEventKind::StepFailed => "step_failed",
            ProgressEventKind::TaskCompleted => "task_completed",
            ProgressEventKind::TaskFailed => "task_failed",
            ProgressEventKind::TaskCancelled => "task_cancelled",
            ProgressEventKind::Heartbeat => "heartbeat",
            ProgressEventKind::BackpressureDrop => "backpressure_drop",
        }
    }
}

/// One progress event for one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: String,
    /// Strictly increasing per task, assigned at publish time
    pub seq: u64,
    pub kind: ProgressEventKind,
    /// Canonical step name, for step-scoped kinds
    pub step: Option<String>,
    pub progress_percent: u8,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_kinds() {
        assert!(ProgressEventKind::TaskCompleted.is_terminal());
        assert!(ProgressEventKind::TaskFailed.is_terminal());
        assert!(ProgressEventKind::TaskCancelled.is_terminal());
        assert!(!ProgressEventKind::StepCompleted.is_terminal());
        assert!(!ProgressEventKind::Heartbeat.is_terminal());
    }

    #[test]
    fn test_event_serialization_snake_case() {
        let event = ProgressEvent {
            task_id: "t-1".to_string(),
            seq: 3,
            kind: ProgressEventKind::StepCompleted,
            step: Some("initial_translation".to_string()),
            progress_percent: 33,
            payload: serde_json::json!({"tokens": 150}),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"step_completed\""));
        assert!(json.contains("\"initial_translation\""));

        let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.seq, 3);
        assert_eq!(parsed.kind, ProgressEventKind::StepCompleted);
    }
}
