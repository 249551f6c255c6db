//! Core Store implementation
//!
//! One rusqlite connection, schema bootstrapped on open. The daemon owns a
//! `Store` on a dedicated thread and serializes access through a command
//! channel; tests use [`Store::open_in_memory`] directly.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AiLogRow, NewAiLog, NewPoem, NewTranslation, NewWorkflowStep, PoemRow, TranslationBundle,
    TranslationRow, WorkflowStepRow,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS poems (
    id              TEXT PRIMARY KEY,
    poet_name       TEXT NOT NULL,
    poem_title      TEXT NOT NULL,
    original_text   TEXT NOT NULL,
    source_language TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS translations (
    id                    TEXT PRIMARY KEY,
    poem_id               TEXT NOT NULL REFERENCES poems(id),
    source_language       TEXT NOT NULL,
    target_language       TEXT NOT NULL,
    translated_text       TEXT NOT NULL,
    translated_poem_title TEXT,
    translated_poet_name  TEXT,
    translator_type       TEXT NOT NULL,
    translator_info       TEXT,
    created_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ai_logs (
    id               TEXT PRIMARY KEY,
    translation_id   TEXT NOT NULL REFERENCES translations(id),
    model_name       TEXT NOT NULL,
    workflow_mode    TEXT NOT NULL,
    token_usage_json TEXT NOT NULL,
    cost_info_json   TEXT NOT NULL,
    runtime_seconds  REAL NOT NULL,
    notes            TEXT
);

CREATE TABLE IF NOT EXISTS translation_workflow_steps (
    id                   TEXT PRIMARY KEY,
    translation_id       TEXT NOT NULL REFERENCES translations(id),
    ai_log_id            TEXT NOT NULL REFERENCES ai_logs(id),
    workflow_id          TEXT NOT NULL,
    step_type            TEXT NOT NULL,
    step_order           INTEGER NOT NULL,
    content              TEXT NOT NULL,
    notes                TEXT,
    model_info_json      TEXT NOT NULL,
    tokens_used          INTEGER,
    prompt_tokens        INTEGER,
    completion_tokens    INTEGER,
    duration_seconds     REAL,
    cost                 REAL,
    translated_title     TEXT,
    translated_poet_name TEXT,
    timestamp            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_translations_poem
    ON translations(poem_id);
CREATE INDEX IF NOT EXISTS idx_ai_logs_translation
    ON ai_logs(translation_id);
CREATE INDEX IF NOT EXISTS idx_steps_translation
    ON translation_workflow_steps(translation_id, step_order);
";

/// The durable store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.as_ref().display(), "Opened verse store");
        Ok(Self { conn })
    }

    /// Open an in-memory store (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // === Poems ===

    /// Insert a poem, returning the stored row
    pub fn create_poem(&self, new: NewPoem) -> Result<PoemRow, StoreError> {
        let row = PoemRow {
            id: Uuid::new_v4().to_string(),
            poet_name: new.poet_name,
            poem_title: new.poem_title,
            original_text: new.original_text,
            source_language: new.source_language,
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO poems (id, poet_name, poem_title, original_text, source_language, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.poet_name,
                row.poem_title,
                row.original_text,
                row.source_language,
                row.created_at.to_rfc3339(),
            ],
        )?;
        debug!(poem_id = %row.id, poet = %row.poet_name, "Created poem");
        Ok(row)
    }

    /// Fetch a poem by id
    pub fn get_poem(&self, id: &str) -> Result<Option<PoemRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, poet_name, poem_title, original_text, source_language, created_at
                 FROM poems WHERE id = ?1",
                params![id],
                poem_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List all poems, newest first
    pub fn list_poems(&self) -> Result<Vec<PoemRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, poet_name, poem_title, original_text, source_language, created_at
             FROM poems ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map([], poem_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // === Translation bundles ===

    /// Persist one workflow run's artifacts in a single transaction.
    ///
    /// Inserts the translation, its AI log, and every step row; if any
    /// insert fails the transaction rolls back and no rows are visible.
    /// Returns the new translation id.
    pub fn persist_bundle(&mut self, bundle: TranslationBundle) -> Result<String, StoreError> {
        let now = Utc::now();
        let translation_id = Uuid::new_v4().to_string();
        let ai_log_id = Uuid::new_v4().to_string();

        let tx = self.conn.transaction()?;

        let t = &bundle.translation;
        tx.execute(
            "INSERT INTO translations
                 (id, poem_id, source_language, target_language, translated_text,
                  translated_poem_title, translated_poet_name, translator_type,
                  translator_info, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                translation_id,
                t.poem_id,
                t.source_language,
                t.target_language,
                t.translated_text,
                t.translated_poem_title,
                t.translated_poet_name,
                t.translator_type,
                t.translator_info,
                now.to_rfc3339(),
            ],
        )?;

        let log = &bundle.ai_log;
        tx.execute(
            "INSERT INTO ai_logs
                 (id, translation_id, model_name, workflow_mode, token_usage_json,
                  cost_info_json, runtime_seconds, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                ai_log_id,
                translation_id,
                log.model_name,
                log.workflow_mode,
                serde_json::to_string(&log.token_usage)?,
                serde_json::to_string(&log.cost_info)?,
                log.runtime_seconds,
                log.notes,
            ],
        )?;

        for step in &bundle.steps {
            tx.execute(
                "INSERT INTO translation_workflow_steps
                     (id, translation_id, ai_log_id, workflow_id, step_type, step_order,
                      content, notes, model_info_json, tokens_used, prompt_tokens,
                      completion_tokens, duration_seconds, cost, translated_title,
                      translated_poet_name, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    Uuid::new_v4().to_string(),
                    translation_id,
                    ai_log_id,
                    step.workflow_id,
                    step.step_type,
                    step.step_order,
                    step.content,
                    step.notes,
                    serde_json::to_string(&step.model_info)?,
                    step.tokens_used.map(|v| v as i64),
                    step.prompt_tokens.map(|v| v as i64),
                    step.completion_tokens.map(|v| v as i64),
                    step.duration_seconds,
                    step.cost,
                    step.translated_title,
                    step.translated_poet_name,
                    now.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!(%translation_id, steps = bundle.steps.len(), "Persisted translation bundle");
        Ok(translation_id)
    }

    /// Fetch a translation by id
    pub fn get_translation(&self, id: &str) -> Result<Option<TranslationRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, poem_id, source_language, target_language, translated_text,
                        translated_poem_title, translated_poet_name, translator_type,
                        translator_info, created_at
                 FROM translations WHERE id = ?1",
                params![id],
                translation_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List translations for a poem, newest first
    pub fn list_translations(&self, poem_id: &str) -> Result<Vec<TranslationRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, poem_id, source_language, target_language, translated_text,
                    translated_poem_title, translated_poet_name, translator_type,
                    translator_info, created_at
             FROM translations WHERE poem_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![poem_id], translation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Fetch the AI log for a translation
    pub fn get_ai_log(&self, translation_id: &str) -> Result<Option<AiLogRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, translation_id, model_name, workflow_mode, token_usage_json,
                        cost_info_json, runtime_seconds, notes
                 FROM ai_logs WHERE translation_id = ?1",
                params![translation_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((id, translation_id, model_name, workflow_mode, usage, cost, runtime, notes)) => {
                Ok(Some(AiLogRow {
                    id,
                    translation_id,
                    model_name,
                    workflow_mode,
                    token_usage: serde_json::from_str(&usage)?,
                    cost_info: serde_json::from_str(&cost)?,
                    runtime_seconds: runtime,
                    notes,
                }))
            }
        }
    }

    /// Fetch a translation's workflow steps in step order
    pub fn get_workflow_steps(
        &self,
        translation_id: &str,
    ) -> Result<Vec<WorkflowStepRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, translation_id, ai_log_id, workflow_id, step_type, step_order,
                    content, notes, model_info_json, tokens_used, prompt_tokens,
                    completion_tokens, duration_seconds, cost, translated_title,
                    translated_poet_name, timestamp
             FROM translation_workflow_steps
             WHERE translation_id = ?1 ORDER BY step_order ASC",
        )?;
        let raw = stmt
            .query_map(params![translation_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, Option<i64>>(9)?,
                    row.get::<_, Option<i64>>(10)?,
                    row.get::<_, Option<i64>>(11)?,
                    row.get::<_, Option<f64>>(12)?,
                    row.get::<_, Option<f64>>(13)?,
                    row.get::<_, Option<String>>(14)?,
                    row.get::<_, Option<String>>(15)?,
                    row.get::<_, String>(16)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for r in raw {
            rows.push(WorkflowStepRow {
                id: r.0,
                translation_id: r.1,
                ai_log_id: r.2,
                workflow_id: r.3,
                step_type: r.4,
                step_order: r.5 as u32,
                content: r.6,
                notes: r.7,
                model_info: serde_json::from_str(&r.8)?,
                tokens_used: r.9.map(|v| v as u64),
                prompt_tokens: r.10.map(|v| v as u64),
                completion_tokens: r.11.map(|v| v as u64),
                duration_seconds: r.12,
                cost: r.13,
                translated_title: r.14,
                translated_poet_name: r.15,
                timestamp: parse_timestamp(&r.16)?,
            });
        }
        Ok(rows)
    }

    /// Row counts per artifact table (used by tests and maintenance listing)
    pub fn artifact_counts(&self) -> Result<(u64, u64, u64), StoreError> {
        let translations: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM translations", [], |r| r.get(0))?;
        let ai_logs: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ai_logs", [], |r| r.get(0))?;
        let steps: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM translation_workflow_steps",
            [],
            |r| r.get(0),
        )?;
        Ok((translations as u64, ai_logs as u64, steps as u64))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::NotFound(format!("unparseable timestamp {}: {}", raw, e)))
}

fn poem_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PoemRow> {
    let created_at: String = row.get(5)?;
    Ok(PoemRow {
        id: row.get(0)?,
        poet_name: row.get(1)?,
        poem_title: row.get(2)?,
        original_text: row.get(3)?,
        source_language: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn translation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TranslationRow> {
    let created_at: String = row.get(9)?;
    Ok(TranslationRow {
        id: row.get(0)?,
        poem_id: row.get(1)?,
        source_language: row.get(2)?,
        target_language: row.get(3)?,
        translated_text: row.get(4)?,
        translated_poem_title: row.get(5)?,
        translated_poet_name: row.get(6)?,
        translator_type: row.get(7)?,
        translator_info: row.get(8)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_poem(store: &Store) -> PoemRow {
        store
            .create_poem(NewPoem {
                poet_name: "Li Bai".to_string(),
                poem_title: "Quiet Night Thoughts".to_string(),
                original_text: "床前明月光".to_string(),
                source_language: "Chinese".to_string(),
            })
            .unwrap()
    }

    fn sample_bundle(poem_id: &str) -> TranslationBundle {
        TranslationBundle {
            translation: NewTranslation {
                poem_id: poem_id.to_string(),
                source_language: "zh-CN".to_string(),
                target_language: "en".to_string(),
                translated_text: "Bright moonlight before my bed".to_string(),
                translated_poem_title: Some("Quiet Night Thoughts".to_string()),
                translated_poet_name: Some("Li Bai".to_string()),
                translator_type: "ai".to_string(),
                translator_info: Some("claude-sonnet-4-20250514".to_string()),
            },
            ai_log: NewAiLog {
                model_name: "claude-sonnet-4-20250514".to_string(),
                workflow_mode: "non_reasoning".to_string(),
                token_usage: serde_json::json!({"total_tokens": 420}),
                cost_info: serde_json::json!({"total_cost": 0.012}),
                runtime_seconds: 9.5,
                notes: Some("Translation workflow completed using non_reasoning mode".to_string()),
            },
            steps: vec![
                NewWorkflowStep {
                    workflow_id: "wf-1".to_string(),
                    step_type: "initial_translation".to_string(),
                    step_order: 1,
                    content: "Moonlight before my bed".to_string(),
                    notes: None,
                    model_info: serde_json::json!({"model": "claude-sonnet-4-20250514"}),
                    tokens_used: Some(200),
                    prompt_tokens: Some(150),
                    completion_tokens: Some(50),
                    duration_seconds: Some(3.1),
                    cost: Some(0.004),
                    translated_title: Some("Quiet Night Thoughts".to_string()),
                    translated_poet_name: Some("Li Bai".to_string()),
                },
                NewWorkflowStep {
                    workflow_id: "wf-1".to_string(),
                    step_type: "revised_translation".to_string(),
                    step_order: 2,
                    content: "Bright moonlight before my bed".to_string(),
                    notes: None,
                    model_info: serde_json::json!({"model": "claude-sonnet-4-20250514"}),
                    tokens_used: Some(220),
                    prompt_tokens: None,
                    completion_tokens: None,
                    duration_seconds: Some(4.0),
                    cost: Some(0.006),
                    translated_title: None,
                    translated_poet_name: None,
                },
            ],
        }
    }

    #[test]
    fn test_create_and_get_poem() {
        let store = Store::open_in_memory().unwrap();
        let poem = sample_poem(&store);

        let fetched = store.get_poem(&poem.id).unwrap().unwrap();
        assert_eq!(fetched.poet_name, "Li Bai");
        assert_eq!(fetched.original_text, "床前明月光");

        assert!(store.get_poem("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_poems() {
        let store = Store::open_in_memory().unwrap();
        sample_poem(&store);
        sample_poem(&store);
        assert_eq!(store.list_poems().unwrap().len(), 2);
    }

    #[test]
    fn test_persist_bundle_atomic_success() {
        let mut store = Store::open_in_memory().unwrap();
        let poem = sample_poem(&store);

        let id = store.persist_bundle(sample_bundle(&poem.id)).unwrap();

        let translation = store.get_translation(&id).unwrap().unwrap();
        assert_eq!(translation.translated_text, "Bright moonlight before my bed");
        assert_eq!(translation.source_language, "zh-CN");

        let log = store.get_ai_log(&id).unwrap().unwrap();
        assert_eq!(log.workflow_mode, "non_reasoning");
        assert_eq!(log.token_usage["total_tokens"], 420);

        let steps = store.get_workflow_steps(&id).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_order, 1);
        assert_eq!(steps[0].step_type, "initial_translation");
        assert_eq!(steps[1].step_order, 2);
        // Provider reported only a total for step 2
        assert_eq!(steps[1].prompt_tokens, None);
        assert_eq!(steps[1].completion_tokens, None);
        assert_eq!(steps[1].tokens_used, Some(220));

        assert_eq!(store.artifact_counts().unwrap(), (1, 1, 2));
    }

    #[test]
    fn test_persist_bundle_rolls_back_on_failure() {
        let mut store = Store::open_in_memory().unwrap();
        let poem = sample_poem(&store);

        // Unknown poem id violates the foreign key, failing the first insert
        let mut bundle = sample_bundle(&poem.id);
        bundle.translation.poem_id = "no-such-poem".to_string();

        let result = store.persist_bundle(bundle);
        assert!(result.is_err());
        assert_eq!(store.artifact_counts().unwrap(), (0, 0, 0));
    }

    #[test]
    fn test_persist_bundle_to_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verse.db");

        let id = {
            let mut store = Store::open(&path).unwrap();
            let poem = sample_poem(&store);
            store.persist_bundle(sample_bundle(&poem.id)).unwrap()
        };

        // Reopen and read back
        let store = Store::open(&path).unwrap();
        let translation = store.get_translation(&id).unwrap().unwrap();
        assert_eq!(translation.translator_type, "ai");
        assert_eq!(store.get_workflow_steps(&id).unwrap().len(), 2);
    }

    #[test]
    fn test_list_translations_for_poem() {
        let mut store = Store::open_in_memory().unwrap();
        let poem = sample_poem(&store);
        store.persist_bundle(sample_bundle(&poem.id)).unwrap();
        store.persist_bundle(sample_bundle(&poem.id)).unwrap();

        let rows = store.list_translations(&poem.id).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(store.list_translations("other").unwrap().is_empty());
    }
}
