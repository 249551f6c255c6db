//! Workflow error taxonomy
//!
//! Every failure the core can surface maps to a stable kind string and an
//! HTTP status for the web layer sitting in front of the daemon.

use thiserror::Error;
use uuid::Uuid;

use crate::llm::LlmError;
use crate::prompts::PromptError;

/// Errors surfaced by the orchestrator and its collaborators
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Unknown poem, same source/target language, unknown mode
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// Configuration names a provider the factory doesn't know
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Prompt rendering failed (unknown template or missing variable)
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    /// Required output fields absent; not retryable
    #[error("Parsing error: {0}")]
    Parse(String),

    /// The DB transaction failed; no artifact exists
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The JSON archive write failed; recorded as a warning
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Task was cancelled")]
    Cancelled,

    #[error("Illegal state transition: {0}")]
    IllegalTransition(String),

    #[error("Task timeout exceeded: {0}")]
    TaskTimeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Stable kind string for error bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::InvalidInput(_) => "InvalidInput",
            WorkflowError::UnknownTask(_) => "UnknownTask",
            WorkflowError::UnknownProvider(_) => "UnknownProvider",
            WorkflowError::Prompt(PromptError::UnknownTemplate(_)) => "UnknownTemplate",
            WorkflowError::Prompt(_) => "PromptError",
            WorkflowError::Provider(LlmError::Timeout(_)) => "ProviderTimeout",
            WorkflowError::Provider(e) if e.is_retryable() => "ProviderTransportError",
            WorkflowError::Provider(_) => "ProviderError",
            WorkflowError::Parse(_) => "ParsingError",
            WorkflowError::Persistence(_) => "PersistenceError",
            WorkflowError::Archive(_) => "ArchiveError",
            WorkflowError::Cancelled => "Cancelled",
            WorkflowError::IllegalTransition(_) => "IllegalTransition",
            WorkflowError::TaskTimeout(_) => "TaskTimeout",
            WorkflowError::Internal(_) => "InternalError",
        }
    }

    /// HTTP status the web layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            WorkflowError::InvalidInput(_) => 400,
            WorkflowError::UnknownTask(_) => 404,
            WorkflowError::IllegalTransition(_) => 409,
            WorkflowError::TaskTimeout(_) => 504,
            _ => 500,
        }
    }

    /// JSON error body: `{error, error_id, type}`
    ///
    /// The `error_id` is freshly generated per body so users can report a
    /// specific occurrence.
    pub fn error_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.to_string(),
            "error_id": Uuid::new_v4().to_string(),
            "type": self.kind(),
        })
    }
}

impl From<versestore::StoreError> for WorkflowError {
    fn from(e: versestore::StoreError) -> Self {
        WorkflowError::Persistence(e.to_string())
    }
}
