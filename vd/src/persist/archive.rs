//! File archiver - best-effort JSON artifacts on disk
//!
//! Mirrors each workflow result as a JSON document under a poet-scoped
//! directory. The filename encodes the poem title, the run's finish
//! timestamp, and the mode, so byte-identical results land on the same
//! path; writing the same result twice is a no-op. The DB remains
//! authoritative; archive failures never change task status.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{TranslationJob, WorkflowResult};

/// Errors from archive writes (always non-fatal for the task)
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes workflow results as JSON artifacts
pub struct FileArchiver {
    root: PathBuf,
}

impl FileArchiver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Archive a workflow result, returning the artifact path
    ///
    /// Idempotent: if the target file already holds identical bytes, nothing
    /// is rewritten.
    pub fn archive(
        &self,
        job: &TranslationJob,
        result: &WorkflowResult,
    ) -> Result<PathBuf, ArchiveError> {
        let poet_dir = self.root.join(slug(&job.poet_name));
        std::fs::create_dir_all(&poet_dir)?;

        let filename = format!(
            "{}_{}_{}.json",
            slug(&job.poem_title),
            result.finished_at.format("%Y%m%d-%H%M%S"),
            result.mode.as_str(),
        );
        let path = poet_dir.join(filename);

        let document = self.build_document(job, result);
        let bytes = serde_json::to_vec_pretty(&document)?;

        if path.exists() {
            let existing = std::fs::read(&path)?;
            if existing == bytes {
                debug!(path = %path.display(), "Archive unchanged, skipping write");
                return Ok(path);
            }
        }

        std::fs::write(&path, &bytes)?;
        info!(path = %path.display(), "Archived workflow result");
        Ok(path)
    }

    fn build_document(&self, job: &TranslationJob, result: &WorkflowResult) -> serde_json::Value {
        serde_json::json!({
            "input": {
                "poem_id": job.poem_id,
                "source_lang": job.source_lang,
                "target_lang": job.target_lang,
                "poet_name": job.poet_name,
                "poem_title": job.poem_title,
                "original_poem": job.original_text,
            },
            "mode": result.mode.as_str(),
            "workflow_id": result.workflow_id,
            "steps": result.steps,
            "translated_text": result.translated_text,
            "translated_poem_title": result.translated_poem_title,
            "translated_poet_name": result.translated_poet_name,
            "totals": {
                "tokens": result.total_tokens,
                "cost_usd": result.total_cost_usd,
                "duration_ms": result.duration_ms,
            },
            "started_at": result.started_at,
            "finished_at": result.finished_at,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Filesystem-safe slug: lowercase alphanumerics with dashes
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed = out.trim_end_matches('-').to_string();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed
    }
}
