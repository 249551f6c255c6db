//! versed - AI poetry translation workflow daemon
//!
//! versed runs multi-stage translation workflows against LLM providers:
//! an initial translation, an editor review, and a revised translation,
//! executed strictly in order with outputs threaded into the next step's
//! prompt. Tasks run concurrently up to a configured bound, stream
//! per-step progress to subscribers, and persist their artifacts
//! atomically.
//!
//! # Core pieces
//!
//! - [`workflow`] - the orchestrator driving step execution
//! - [`registry`] - in-memory task records with status and progress
//! - [`progress`] - per-task event streams with replay and heartbeats
//! - [`llm`] - provider trait, Anthropic/OpenAI clients, factory
//! - [`prompts`] - handlebars prompt pairs with embedded defaults
//! - [`parser`] - XML-tag field extraction from model output
//! - [`retry`] - bounded attempts with exponential backoff
//! - [`persist`] - transactional DB sink, JSON archiver, language codes
//! - [`services`] - explicit wiring and per-task scopes
//!
//! # Guarantees
//!
//! - Per-task progress percent is non-decreasing; event `seq` is strictly
//!   increasing; exactly one terminal event ends each stream.
//! - Artifacts commit all-or-nothing: one translation, one AI log, and one
//!   row per executed step, or none of them.
//! - Step failures are non-fatal by default; the task finishes `failed`
//!   but later steps still run. Cancellation is cooperative and takes
//!   effect at the next suspension point.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod llm;
pub mod parser;
pub mod persist;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod retry;
pub mod services;
pub mod workflow;

// Re-export commonly used types
pub use cancel::CancelFlag;
pub use config::{Config, LimitsConfig, ProviderConfig, ProviderKind, StepBinding, WorkflowSettings};
pub use domain::{
    Poem, StepKind, StepResult, StepSpec, StepState, StepStatus, TaskFilter, TaskRecord,
    TaskStatus, TranslationJob, WorkflowMode, WorkflowResult,
};
pub use errors::WorkflowError;
pub use llm::{AnthropicProvider, ChatMessage, LlmError, LlmProvider, LlmRequest, LlmResponse, OpenAiProvider, ProviderFactory, TokenUsage};
pub use parser::{OutputParser, ParseVerdict, ParsedOutput};
pub use persist::{FileArchiver, LanguageMapper, PersistenceSink, Repository, StoreHandle};
pub use progress::{ProgressBus, ProgressEvent, ProgressEventKind, Subscription};
pub use prompts::{PromptError, PromptLibrary, RenderedPrompt};
pub use registry::TaskRegistry;
pub use retry::{RetryError, RetryPolicy};
pub use services::{Services, TaskScope};
pub use workflow::{Orchestrator, TranslateRequest, VariableBag};
