//! VerseStore - durable storage for poems and AI translation artifacts
//!
//! VerseStore owns the SQLite database behind the versed daemon. It stores
//! source poems and, for each completed workflow run, the translation
//! artifact bundle: one `translations` row, one `ai_logs` row, and one
//! `translation_workflow_steps` row per executed step.
//!
//! # Guarantees
//!
//! - **Atomic bundles**: [`Store::persist_bundle`] writes the translation,
//!   its AI log, and all step rows in a single transaction. Either all rows
//!   are committed or none are.
//! - **Single writer**: `Store` holds the connection and is `!Sync` by
//!   design. Callers that need shared access should own the store on a
//!   dedicated thread (the daemon wraps it in an actor).

pub mod error;
pub mod models;
pub mod store;

pub use error::StoreError;
pub use models::{
    AiLogRow, NewAiLog, NewPoem, NewTranslation, NewWorkflowStep, PoemRow, TranslationBundle,
    TranslationRow, WorkflowStepRow,
};
pub use store::Store;
