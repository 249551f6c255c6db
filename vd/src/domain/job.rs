//! Translation job inputs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::poem::Poem;

/// Which provider/model/template bindings a workflow uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    /// All steps bound to reasoning-capable models
    Reasoning,
    /// All steps bound to fast non-reasoning models
    NonReasoning,
    /// Translation steps on reasoning models, editor review on a fast model
    Hybrid,
}

impl WorkflowMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowMode::Reasoning => "reasoning",
            WorkflowMode::NonReasoning => "non_reasoning",
            WorkflowMode::Hybrid => "hybrid",
        }
    }

    /// All known modes
    pub fn all() -> [WorkflowMode; 3] {
        [
            WorkflowMode::Reasoning,
            WorkflowMode::NonReasoning,
            WorkflowMode::Hybrid,
        ]
    }
}

impl fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkflowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reasoning" => Ok(WorkflowMode::Reasoning),
            "non_reasoning" | "non-reasoning" => Ok(WorkflowMode::NonReasoning),
            "hybrid" => Ok(WorkflowMode::Hybrid),
            other => Err(format!("unknown workflow mode: {}", other)),
        }
    }
}

/// A validated translation job. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationJob {
    pub poem_id: String,
    /// Human-readable source language name (from the poem)
    pub source_lang: String,
    /// Human-readable target language name (from the request)
    pub target_lang: String,
    pub mode: WorkflowMode,
    pub poet_name: String,
    pub poem_title: String,
    pub original_text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl TranslationJob {
    /// Build a job from a poem and a translation request
    pub fn new(poem: &Poem, target_lang: impl Into<String>, mode: WorkflowMode) -> Self {
        Self {
            poem_id: poem.id.clone(),
            source_lang: poem.source_language.clone(),
            target_lang: target_lang.into(),
            mode,
            poet_name: poem.poet_name.clone(),
            poem_title: poem.poem_title.clone(),
            original_text: poem.original_text.clone(),
            metadata: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_roundtrip() {
        for mode in WorkflowMode::all() {
            assert_eq!(mode.as_str().parse::<WorkflowMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_from_str_variants() {
        assert_eq!(
            "non-reasoning".parse::<WorkflowMode>().unwrap(),
            WorkflowMode::NonReasoning
        );
        assert_eq!("HYBRID".parse::<WorkflowMode>().unwrap(), WorkflowMode::Hybrid);
        assert!("fastest".parse::<WorkflowMode>().is_err());
    }

    #[test]
    fn test_mode_serde_snake_case() {
        let json = serde_json::to_string(&WorkflowMode::NonReasoning).unwrap();
        assert_eq!(json, "\"non_reasoning\"");
    }
}
