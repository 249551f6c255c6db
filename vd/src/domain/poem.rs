//! Poem - the source text a workflow translates
//!
//! Read-only to the core; the store owns the rows.

use serde::{Deserialize, Serialize};

/// A source poem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poem {
    pub id: String,
    pub poet_name: String,
    pub poem_title: String,
    pub original_text: String,
    /// Human-readable language name (e.g. "Chinese"), as stored
    pub source_language: String,
}

impl From<versestore::PoemRow> for Poem {
    fn from(row: versestore::PoemRow) -> Self {
        Self {
            id: row.id,
            poet_name: row.poet_name,
            poem_title: row.poem_title,
            original_text: row.original_text,
            source_language: row.source_language,
        }
    }
}
