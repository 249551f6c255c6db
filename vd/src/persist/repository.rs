//! Repository - the narrow store interface the core consumes
//!
//! The orchestrator needs exactly two things from durable storage: read a
//! poem at task start, and persist one workflow's artifact bundle
//! atomically at task end. The bundle carries the translation, AI log, and
//! step rows together because they commit in one transaction.

use async_trait::async_trait;
use versestore::{StoreError, TranslationBundle};

use crate::domain::Poem;

/// Narrow CRUD surface backing the persistence sink
#[async_trait]
pub trait Repository: Send + Sync {
    /// Read a poem by id
    async fn fetch_poem(&self, poem_id: &str) -> Result<Option<Poem>, StoreError>;

    /// Persist one workflow's artifacts atomically, returning the new
    /// translation id
    async fn persist_translation(&self, bundle: TranslationBundle) -> Result<String, StoreError>;
}
