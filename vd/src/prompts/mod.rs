//! Prompt templates
//!
//! - [`loader`] - the handlebars-backed prompt library
//! - [`embedded`] - default templates compiled into the binary

pub mod embedded;
pub mod loader;

pub use loader::{PromptError, PromptLibrary, RenderedPrompt};
