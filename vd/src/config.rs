//! Daemon configuration types and loading

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{StepKind, StepSpec, WorkflowMode};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Concurrency, timeout, and retention limits
    pub limits: LimitsConfig,

    /// Store and archive paths
    pub storage: StorageConfig,

    /// LLM provider credentials and endpoints
    pub providers: Vec<ProviderConfig>,

    /// Per-mode step bindings
    pub workflow: WorkflowSettings,

    /// Extra language name → code entries merged over the built-in table
    #[serde(rename = "language-overrides")]
    pub language_overrides: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".versed.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("versed").join("versed.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to load config from {}: {}",
                            user_config.display(),
                            e
                        );
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Concurrency, timeout, and retention limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum workflows running at once
    #[serde(rename = "max-concurrent-tasks")]
    pub max_concurrent_tasks: usize,

    /// Per-attempt step timeout in seconds
    #[serde(rename = "default-step-timeout-seconds")]
    pub default_step_timeout_seconds: u64,

    /// Attempts per step before it fails
    #[serde(rename = "default-max-attempts")]
    pub default_max_attempts: u32,

    /// Heartbeat interval for quiet progress streams
    #[serde(rename = "progress-heartbeat-seconds")]
    pub progress_heartbeat_seconds: u64,

    /// How long finished tasks stay queryable
    #[serde(rename = "task-ttl-hours")]
    pub task_ttl_hours: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            default_step_timeout_seconds: 300,
            default_max_attempts: 3,
            progress_heartbeat_seconds: 30,
            task_ttl_hours: 24,
        }
    }
}

impl LimitsConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.default_step_timeout_seconds)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.progress_heartbeat_seconds)
    }

    pub fn task_ttl(&self) -> Duration {
        Duration::from_secs(self.task_ttl_hours * 3600)
    }
}

/// Store and archive paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    #[serde(rename = "database-path")]
    pub database_path: PathBuf,

    /// Root directory for JSON workflow artifacts
    #[serde(rename = "archive-directory")]
    pub archive_directory: PathBuf,

    /// Optional prompt template override directory
    #[serde(rename = "prompt-directory")]
    pub prompt_directory: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("versed");
        Self {
            database_path: data_dir.join("verse.db"),
            archive_directory: data_dir.join("archives"),
            prompt_directory: None,
        }
    }
}

/// Which wire protocol a provider speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

/// One LLM provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name steps bind to (e.g. "anthropic")
    pub name: String,

    pub kind: ProviderKind,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl ProviderConfig {
    fn anthropic_default() -> Self {
        Self {
            name: "anthropic".to_string(),
            kind: ProviderKind::Anthropic,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    fn openai_default() -> Self {
        Self {
            name: "openai".to_string(),
            kind: ProviderKind::OpenAi,
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// One step's provider/model/template binding within a mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepBinding {
    pub step: StepKind,
    pub provider: String,
    pub model: String,

    #[serde(rename = "prompt-template")]
    pub prompt_template: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(rename = "max-tokens", default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-attempt timeout override in seconds
    #[serde(rename = "timeout-seconds")]
    pub timeout_seconds: Option<u64>,

    /// Retry attempts override
    #[serde(rename = "max-attempts")]
    pub max_attempts: Option<u32>,

    /// Required output fields override; defaults to the step's content field
    #[serde(rename = "required-fields")]
    pub required_fields: Option<Vec<String>>,

    /// When true, a failure on this step aborts the workflow
    #[serde(default)]
    pub fatal: bool,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl StepBinding {
    fn new(step: StepKind, provider: &str, model: &str, template: &str) -> Self {
        Self {
            step,
            provider: provider.to_string(),
            model: model.to_string(),
            prompt_template: template.to_string(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: None,
            max_attempts: None,
            required_fields: None,
            fatal: false,
        }
    }

    /// Resolve this binding into a step spec, applying daemon-wide defaults
    pub fn to_spec(&self, limits: &LimitsConfig) -> StepSpec {
        StepSpec {
            kind: self.step,
            provider: self.provider.clone(),
            model: self.model.clone(),
            prompt_template: self.prompt_template.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(
                self.timeout_seconds
                    .unwrap_or(limits.default_step_timeout_seconds),
            ),
            max_attempts: self.max_attempts.unwrap_or(limits.default_max_attempts),
            required_fields: self
                .required_fields
                .clone()
                .unwrap_or_else(|| vec![self.step.content_field().to_string()]),
            fatal: self.fatal,
        }
    }
}

/// Per-mode step bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub modes: BTreeMap<WorkflowMode, Vec<StepBinding>>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        let reasoning_model = "claude-sonnet-4-20250514";
        let fast_model = "gpt-4o";

        let mut modes = BTreeMap::new();
        modes.insert(
            WorkflowMode::Reasoning,
            vec![
                StepBinding::new(
                    StepKind::InitialTranslation,
                    "anthropic",
                    reasoning_model,
                    "initial_translation_reasoning",
                ),
                StepBinding::new(
                    StepKind::EditorReview,
                    "anthropic",
                    reasoning_model,
                    "editor_review_reasoning",
                ),
                StepBinding::new(
                    StepKind::RevisedTranslation,
                    "anthropic",
                    reasoning_model,
                    "revised_translation_reasoning",
                ),
            ],
        );
        modes.insert(
            WorkflowMode::NonReasoning,
            vec![
                StepBinding::new(
                    StepKind::InitialTranslation,
                    "openai",
                    fast_model,
                    "initial_translation",
                ),
                StepBinding::new(StepKind::EditorReview, "openai", fast_model, "editor_review"),
                StepBinding::new(
                    StepKind::RevisedTranslation,
                    "openai",
                    fast_model,
                    "revised_translation",
                ),
            ],
        );
        modes.insert(
            WorkflowMode::Hybrid,
            vec![
                StepBinding::new(
                    StepKind::InitialTranslation,
                    "anthropic",
                    reasoning_model,
                    "initial_translation_reasoning",
                ),
                StepBinding::new(StepKind::EditorReview, "openai", fast_model, "editor_review"),
                StepBinding::new(
                    StepKind::RevisedTranslation,
                    "anthropic",
                    reasoning_model,
                    "revised_translation_reasoning",
                ),
            ],
        );
        Self { modes }
    }
}

impl WorkflowSettings {
    /// Resolve a mode's bindings into ordered step specs
    pub fn steps_for_mode(&self, mode: WorkflowMode, limits: &LimitsConfig) -> Option<Vec<StepSpec>> {
        self.modes
            .get(&mode)
            .map(|bindings| bindings.iter().map(|b| b.to_spec(limits)).collect())
    }

    /// Modes with at least one step bound
    pub fn available_modes(&self) -> Vec<WorkflowMode> {
        self.modes
            .iter()
            .filter(|(_, steps)| !steps.is_empty())
            .map(|(mode, _)| *mode)
            .collect()
    }
}

impl Config {
    /// Default provider endpoints, used when the config lists none
    pub fn effective_providers(&self) -> Vec<ProviderConfig> {
        if self.providers.is_empty() {
            vec![
                ProviderConfig::anthropic_default(),
                ProviderConfig::openai_default(),
            ]
        } else {
            self.providers.clone()
        }
    }
}
