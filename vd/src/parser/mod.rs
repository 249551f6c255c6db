//! Output parser - extract structured fields from model responses
//!
//! Providers are prompted to answer with XML-tag-delimited fields. The
//! parser collects every `<tag>...</tag>` pair in the response and grades
//! the result against the step's required fields. Missing required fields
//! are reported, never silently defaulted, and parsing failures are not
//! retryable (retrying will not change what the model already said).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How much of the required output was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseVerdict {
    /// Every required field present and non-empty
    Ok,
    /// Some required fields missing, but something was parsed
    Partial,
    /// Nothing usable extracted
    Failed,
}

/// Parsed fields plus the verdict against the required set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedOutput {
    pub verdict: ParseVerdict,
    /// Tag name → trimmed content
    pub fields: BTreeMap<String, String>,
    pub errors: Vec<String>,
}

/// Extracts XML-tag fields from free-form model responses
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputParser;

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Non-greedy across newlines; tag names are identifier-like
        Regex::new(r"(?s)<([A-Za-z_][A-Za-z0-9_]*)>(.*?)</([A-Za-z_][A-Za-z0-9_]*)>")
            .expect("tag regex is valid")
    })
}

impl OutputParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw response against a set of required field names
    pub fn parse(&self, raw_text: &str, required_fields: &[String]) -> ParsedOutput {
        let mut fields = BTreeMap::new();

        for capture in tag_regex().captures_iter(raw_text) {
            let open = &capture[1];
            let close = &capture[3];
            if open != close {
                continue;
            }
            let content = capture[2].trim().to_string();
            // First occurrence wins; models sometimes echo tags in prose
            fields.entry(open.to_string()).or_insert(content);
        }

        let mut errors = Vec::new();
        let mut missing = 0usize;
        for required in required_fields {
            let present = fields
                .get(required)
                .map(|v| !v.is_empty())
                .unwrap_or(false);
            if !present {
                missing += 1;
                errors.push(format!("missing required field: {}", required));
            }
        }

        // A tag that parsed but holds nothing still counts as extracted
        // structure: only a response with no recognizable tags at all is a
        // failure. The workflow's empty-output guard handles blank content.
        let verdict = if missing == 0 {
            ParseVerdict::Ok
        } else if !fields.is_empty() {
            ParseVerdict::Partial
        } else {
            ParseVerdict::Failed
        };

        debug!(
            ?verdict,
            parsed = fields.len(),
            missing,
            "Parsed model response"
        );

        ParsedOutput {
            verdict,
            fields,
            errors,
        }
    }
}
