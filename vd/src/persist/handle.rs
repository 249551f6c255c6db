//! StoreHandle - actor that owns the VerseStore
//!
//! The rusqlite store is single-writer, so one actor task owns it and
//! serializes access. Callers send typed commands over a channel and await
//! replies on oneshot channels; the handle is cheap to clone.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use versestore::{NewPoem, PoemRow, Store, StoreError, TranslationBundle, TranslationRow};

use crate::domain::Poem;

use super::repository::Repository;

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

/// Commands processed by the store actor
enum StoreCommand {
    FetchPoem {
        poem_id: String,
        reply: Reply<Option<PoemRow>>,
    },
    CreatePoem {
        new: NewPoem,
        reply: Reply<PoemRow>,
    },
    ListPoems {
        reply: Reply<Vec<PoemRow>>,
    },
    Persist {
        bundle: TranslationBundle,
        reply: Reply<String>,
    },
    ListTranslations {
        poem_id: String,
        reply: Reply<Vec<TranslationRow>>,
    },
}

/// Handle to send commands to the store actor
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Open the store and spawn its actor
    pub fn spawn(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Store::open(path.as_ref())?;
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!(path = %path.as_ref().display(), "Store actor spawned");
        Ok(Self { tx })
    }

    /// Spawn an actor over an already-open store (tests use in-memory)
    pub fn spawn_with_store(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        Self { tx }
    }

    async fn send<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> StoreCommand,
    ) -> Result<T, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StoreError::NotFound("store actor stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| StoreError::NotFound("store actor dropped reply".to_string()))?
    }

    /// Insert a poem
    pub async fn create_poem(&self, new: NewPoem) -> Result<PoemRow, StoreError> {
        self.send(|reply| StoreCommand::CreatePoem { new, reply }).await
    }

    /// List all poems
    pub async fn list_poems(&self) -> Result<Vec<PoemRow>, StoreError> {
        self.send(|reply| StoreCommand::ListPoems { reply }).await
    }

    /// List translations for a poem
    pub async fn list_translations(
        &self,
        poem_id: &str,
    ) -> Result<Vec<TranslationRow>, StoreError> {
        let poem_id = poem_id.to_string();
        self.send(|reply| StoreCommand::ListTranslations { poem_id, reply })
            .await
    }
}

#[async_trait]
impl Repository for StoreHandle {
    async fn fetch_poem(&self, poem_id: &str) -> Result<Option<Poem>, StoreError> {
        let poem_id = poem_id.to_string();
        let row = self
            .send(|reply| StoreCommand::FetchPoem { poem_id, reply })
            .await?;
        Ok(row.map(Poem::from))
    }

    async fn persist_translation(&self, bundle: TranslationBundle) -> Result<String, StoreError> {
        self.send(|reply| StoreCommand::Persist { bundle, reply })
            .await
    }
}

/// The actor: owns the store, processes commands until all handles drop
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            StoreCommand::FetchPoem { poem_id, reply } => {
                debug!(%poem_id, "Store: fetch poem");
                let _ = reply.send(store.get_poem(&poem_id));
            }
            StoreCommand::CreatePoem { new, reply } => {
                let _ = reply.send(store.create_poem(new));
            }
            StoreCommand::ListPoems { reply } => {
                let _ = reply.send(store.list_poems());
            }
            StoreCommand::Persist { bundle, reply } => {
                debug!(steps = bundle.steps.len(), "Store: persist bundle");
                let _ = reply.send(store.persist_bundle(bundle));
            }
            StoreCommand::ListTranslations { poem_id, reply } => {
                let _ = reply.send(store.list_translations(&poem_id));
            }
        }
    }
    debug!("Store actor loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> StoreHandle {
        StoreHandle::spawn_with_store(Store::open_in_memory().unwrap())
    }

    fn sample_poem() -> NewPoem {
        NewPoem {
            poet_name: "Li Bai".to_string(),
            poem_title: "Quiet Night Thoughts".to_string(),
            original_text: "床前明月光".to_string(),
            source_language: "Chinese".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_poem() {
        let handle = handle();
        let row = handle.create_poem(sample_poem()).await.unwrap();

        let poem = handle.fetch_poem(&row.id).await.unwrap().unwrap();
        assert_eq!(poem.poet_name, "Li Bai");
        assert_eq!(poem.source_language, "Chinese");

        assert!(handle.fetch_poem("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_through_actor() {
        let handle = handle();
        let poem = handle.create_poem(sample_poem()).await.unwrap();

        let bundle = TranslationBundle {
            translation: versestore::NewTranslation {
                poem_id: poem.id.clone(),
                source_language: "zh-CN".to_string(),
                target_language: "en".to_string(),
                translated_text: "Bright moonlight before my bed".to_string(),
                translated_poem_title: None,
                translated_poet_name: None,
                translator_type: "ai".to_string(),
                translator_info: None,
            },
            ai_log: versestore::NewAiLog {
                model_name: "mock-model".to_string(),
                workflow_mode: "hybrid".to_string(),
                token_usage: serde_json::json!({"total_tokens": 100}),
                cost_info: serde_json::json!({"total_cost": 0.001}),
                runtime_seconds: 1.0,
                notes: None,
            },
            steps: vec![],
        };

        let id = handle.persist_translation(bundle).await.unwrap();
        let translations = handle.list_translations(&poem.id).await.unwrap();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0].id, id);
    }

    #[tokio::test]
    async fn test_clone_handles_share_actor() {
        let handle = handle();
        let other = handle.clone();
        let row = handle.create_poem(sample_poem()).await.unwrap();
        assert!(other.fetch_poem(&row.id).await.unwrap().is_some());
    }
}
