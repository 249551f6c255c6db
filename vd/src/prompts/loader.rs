//! Prompt Library
//!
//! Renders (system, user) prompt pairs from a template name and the
//! workflow's variable bag. Templates load from an override directory when
//! configured, falling back to embedded defaults. Rendering is strict:
//! unknown templates and missing variables fail fast, never silently empty.

use std::path::PathBuf;

use handlebars::Handlebars;
use thiserror::Error;
use tracing::debug;

use super::embedded;

/// Errors raised while loading or rendering prompts
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Unknown prompt template: {0}")]
    UnknownTemplate(String),

    #[error("Missing variable rendering template {template}: {detail}")]
    MissingVariable { template: String, detail: String },

    #[error("Failed to render template {template}: {detail}")]
    Render { template: String, detail: String },

    #[error("Failed to read template {0}: {1}")]
    Io(String, #[source] std::io::Error),
}

/// A rendered (system, user) prompt pair
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Loads and renders prompt templates
pub struct PromptLibrary {
    /// Handlebars engine in strict mode
    hbs: Handlebars<'static>,
    /// Optional on-disk override directory (`<name>.hbs`)
    override_dir: Option<PathBuf>,
}

impl PromptLibrary {
    /// Create a library with an optional override directory
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        let override_dir = override_dir.filter(|d| d.exists());
        Self { hbs, override_dir }
    }

    /// A library that only uses embedded templates (tests)
    pub fn embedded_only() -> Self {
        Self::new(None)
    }

    /// Load a template source by name
    ///
    /// Checks the override directory first, then embedded defaults.
    fn load_template(&self, name: &str) -> Result<String, PromptError> {
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.hbs", name));
            if path.exists() {
                debug!(template = %name, path = %path.display(), "Loading prompt override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| PromptError::Io(path.display().to_string(), e));
            }
        }

        embedded::get_embedded(name)
            .map(|s| s.to_string())
            .ok_or_else(|| PromptError::UnknownTemplate(name.to_string()))
    }

    /// Render a template into a (system, user) pair
    ///
    /// The template document holds the system half above a `---` line and
    /// the user half below it. A document with no separator renders
    /// entirely as the user prompt.
    pub fn render(
        &self,
        template_name: &str,
        variables: &serde_json::Value,
    ) -> Result<RenderedPrompt, PromptError> {
        let source = self.load_template(template_name)?;
        let (system_src, user_src) = split_template(&source);

        let system = self.render_half(template_name, system_src, variables)?;
        let user = self.render_half(template_name, user_src, variables)?;
        debug!(template = %template_name, "Rendered prompt pair");
        Ok(RenderedPrompt { system, user })
    }

    fn render_half(
        &self,
        name: &str,
        source: &str,
        variables: &serde_json::Value,
    ) -> Result<String, PromptError> {
        self.hbs
            .render_template(source, variables)
            .map_err(|e| classify_render_error(name, e))
    }

    /// True if the named template exists (override or embedded)
    pub fn has_template(&self, name: &str) -> bool {
        self.load_template(name).is_ok()
    }
}

/// Split a template document at the first `---` separator line
fn split_template(source: &str) -> (&str, &str) {
    match source.find("\n---\n") {
        Some(idx) => (&source[..idx], &source[idx + 5..]),
        None => ("", source),
    }
}

/// Map handlebars strict-mode failures to MissingVariable, anything else to
/// Render
fn classify_render_error(template: &str, e: handlebars::RenderError) -> PromptError {
    let detail = e.to_string();
    if detail.contains("not found") || detail.contains("missing") {
        PromptError::MissingVariable {
            template: template.to_string(),
            detail,
        }
    } else {
        PromptError::Render {
            template: template.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> serde_json::Value {
        serde_json::json!({
            "source_lang": "Chinese",
            "target_lang": "English",
            "poem_title": "Quiet Night Thoughts",
            "poet_name": "Li Bai",
            "original_poem": "床前明月光",
            "initial_translation": {
                "initial_translation": "Moonlight before my bed",
                "initial_translation_notes": "Kept the image plain",
            },
            "editor_review": {
                "editor_suggestions": "1. Consider 'bright moonlight'",
            },
        })
    }

    #[test]
    fn test_render_initial_translation() {
        let library = PromptLibrary::embedded_only();
        let prompt = library.render("initial_translation", &vars()).unwrap();
        assert!(prompt.system.contains("literary translator"));
        assert!(prompt.system.contains("English"));
        assert!(prompt.user.contains("床前明月光"));
        assert!(prompt.user.contains("Li Bai"));
    }

    #[test]
    fn test_render_revised_uses_prior_step_outputs() {
        let library = PromptLibrary::embedded_only();
        let prompt = library.render("revised_translation", &vars()).unwrap();
        assert!(prompt.user.contains("Moonlight before my bed"));
        assert!(prompt.user.contains("bright moonlight"));
    }

    #[test]
    fn test_unknown_template() {
        let library = PromptLibrary::embedded_only();
        let err = library.render("sonnet_shuffle", &vars()).unwrap_err();
        assert!(matches!(err, PromptError::UnknownTemplate(_)));
    }

    #[test]
    fn test_missing_variable_fails_fast() {
        let library = PromptLibrary::embedded_only();
        let err = library
            .render("initial_translation", &serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, PromptError::MissingVariable { .. }));
    }

    #[test]
    fn test_override_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("initial_translation.hbs"),
            "Custom system for {{target_lang}}\n---\nCustom user: {{original_poem}}\n",
        )
        .unwrap();

        let library = PromptLibrary::new(Some(dir.path().to_path_buf()));
        let prompt = library.render("initial_translation", &vars()).unwrap();
        assert_eq!(prompt.system, "Custom system for English");
        assert!(prompt.user.starts_with("Custom user: 床前明月光"));
    }

    #[test]
    fn test_split_template_without_separator() {
        let (system, user) = split_template("just a user prompt");
        assert_eq!(system, "");
        assert_eq!(user, "just a user prompt");
    }

    #[test]
    fn test_has_template() {
        let library = PromptLibrary::embedded_only();
        assert!(library.has_template("editor_review"));
        assert!(!library.has_template("limerick_mode"));
    }
}
