//! Domain types for translation workflows
//!
//! - [`poem`] - source poems as the store hands them to the core
//! - [`job`] - validated, immutable translation job inputs
//! - [`step`] - step specs, step kinds, and per-step results
//! - [`task`] - task records tracked by the registry
//! - [`workflow`] - workflow configs and aggregated results

pub mod job;
pub mod poem;
pub mod step;
pub mod task;
pub mod workflow;

pub use job::{TranslationJob, WorkflowMode};
pub use poem::Poem;
pub use step::{StepKind, StepResult, StepSpec, StepStatus};
pub use task::{StepState, TaskFilter, TaskRecord, TaskStatus};
pub use workflow::{FinalSelection, WorkflowConfig, WorkflowResult};
