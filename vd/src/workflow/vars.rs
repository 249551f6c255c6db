//! Variable bag - template variables accumulated across steps
//!
//! Seeded from the job input; each completed step merges its parsed fields
//! under a key equal to the step name, so later templates reference earlier
//! outputs as `{{initial_translation.initial_translation}}`. Key collisions
//! are last-writer-wins.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::domain::{StepKind, TranslationJob};

/// Template variables for prompt rendering
#[derive(Debug, Clone)]
pub struct VariableBag {
    root: Map<String, Value>,
}

impl VariableBag {
    /// Seed the bag from a job's input
    pub fn new(job: &TranslationJob) -> Self {
        let mut root = Map::new();
        root.insert("poem_id".to_string(), Value::String(job.poem_id.clone()));
        root.insert(
            "source_lang".to_string(),
            Value::String(job.source_lang.clone()),
        );
        root.insert(
            "target_lang".to_string(),
            Value::String(job.target_lang.clone()),
        );
        root.insert(
            "poet_name".to_string(),
            Value::String(job.poet_name.clone()),
        );
        root.insert(
            "poem_title".to_string(),
            Value::String(job.poem_title.clone()),
        );
        root.insert(
            "original_poem".to_string(),
            Value::String(job.original_text.clone()),
        );
        root.insert("mode".to_string(), Value::String(job.mode.to_string()));
        if !job.metadata.is_null() {
            root.insert("metadata".to_string(), job.metadata.clone());
        }
        Self { root }
    }

    /// Merge a step's parsed fields under the step's name
    pub fn merge_step(&mut self, step_name: &str, fields: &BTreeMap<String, String>) {
        let object: Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        self.root
            .insert(step_name.to_string(), Value::Object(object));
    }

    /// Merge a step's outputs, pre-seeding the step's known fields
    ///
    /// Later templates reference optional fields (notes, titles) in strict
    /// mode; a model that omitted an optional tag must render as empty, not
    /// kill the task. Required-field enforcement already happened in the
    /// parser.
    pub fn merge_step_outputs(&mut self, kind: StepKind, fields: &BTreeMap<String, String>) {
        let mut seeded = BTreeMap::new();
        seeded.insert(kind.content_field().to_string(), String::new());
        for known in [kind.notes_field(), kind.title_field(), kind.poet_field()]
            .into_iter()
            .flatten()
        {
            seeded.insert(known.to_string(), String::new());
        }
        for (name, value) in fields {
            seeded.insert(name.clone(), value.clone());
        }
        self.merge_step(kind.as_str(), &seeded);
    }

    /// The bag as a JSON object for handlebars
    pub fn as_json(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Look up a nested value by step and field name
    pub fn get(&self, step_name: &str, field: &str) -> Option<&str> {
        self.root
            .get(step_name)
            .and_then(|v| v.get(field))
            .and_then(|v| v.as_str())
    }
}
