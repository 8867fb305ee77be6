//! Configuration loading, validation, and management for issuefold.
//!
//! Loads configuration from `~/.issuefold/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The root configuration structure.
///
/// Maps directly to `~/.issuefold/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which summarization backend to use
    #[serde(default)]
    pub default_backend: Backend,

    /// Model name passed to the backend
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per summarize call (backend default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Token ceiling for one rendered prompt
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// What to do when a summarize call fails mid-run
    #[serde(default)]
    pub on_summarize_error: ErrorPolicy,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Custom prompt template file (built-in template when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,

    /// GitHub access
    #[serde(default)]
    pub github: GitHubConfig,

    /// Gemini API-key backend
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Vertex AI backend
    #[serde(default)]
    pub vertex: VertexConfig,
}

fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_token_budget() -> usize {
    30_720
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_region() -> String {
    "us-central1".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("default_backend", &self.default_backend)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("token_budget", &self.token_budget)
            .field("on_summarize_error", &self.on_summarize_error)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("prompt_file", &self.prompt_file)
            .field("github", &self.github)
            .field("gemini", &self.gemini)
            .field("vertex", &self.vertex)
            .finish()
    }
}

/// Summarization backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gemini,
    Vertex,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini",
            Backend::Vertex => "vertex",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Backend::Gemini),
            "vertex" | "vertexai" => Ok(Backend::Vertex),
            other => Err(ConfigError::ValidationError(format!(
                "unknown backend '{other}' (expected gemini or vertex)"
            ))),
        }
    }
}

/// Policy for a failed summarize call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log, keep the previous summary, move on to the next batch
    #[default]
    Skip,
    /// Stop the run and report the error
    Abort,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct VertexConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// OAuth access token (e.g. from `gcloud auth print-access-token`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            region: default_region(),
            access_token: None,
            base_url: None,
        }
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &redact(&self.token))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for VertexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexConfig")
            .field("project_id", &self.project_id)
            .field("region", &self.region)
            .field("access_token", &redact(&self.access_token))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.issuefold/config.toml).
    ///
    /// Environment variables override file values:
    /// - `GITHUB_TOKEN`
    /// - `GEMINI_API_KEY`
    /// - `VERTEX_ACCESS_TOKEN`, `GOOGLE_CLOUD_PROJECT`
    /// - `ISSUEFOLD_BACKEND`, `ISSUEFOLD_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(token) = get("VERTEX_ACCESS_TOKEN") {
            self.vertex.access_token = Some(token);
        }
        if let Some(project) = get("GOOGLE_CLOUD_PROJECT") {
            self.vertex.project_id = Some(project);
        }
        if let Some(backend) = get("ISSUEFOLD_BACKEND") {
            self.default_backend = backend.parse()?;
        }
        if let Some(model) = get("ISSUEFOLD_MODEL") {
            self.model = model;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".issuefold")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "token_budget must be > 0".into(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Credentials missing for the given backend, as human-readable hints.
    pub fn missing_credentials(&self, backend: Backend) -> Vec<&'static str> {
        let mut missing = Vec::new();
        match backend {
            Backend::Gemini => {
                if self.gemini.api_key.is_none() {
                    missing.push("gemini.api_key (or GEMINI_API_KEY)");
                }
            }
            Backend::Vertex => {
                if self.vertex.project_id.is_none() {
                    missing.push("vertex.project_id (or GOOGLE_CLOUD_PROJECT)");
                }
                if self.vertex.access_token.is_none() {
                    missing.push("vertex.access_token (or VERTEX_ACCESS_TOKEN)");
                }
            }
        }
        missing
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_backend: Backend::default(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: None,
            token_budget: default_token_budget(),
            on_summarize_error: ErrorPolicy::default(),
            request_timeout_secs: default_request_timeout_secs(),
            prompt_file: None,
            github: GitHubConfig::default(),
            gemini: GeminiConfig::default(),
            vertex: VertexConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
