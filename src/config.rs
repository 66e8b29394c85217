//! Configuration for eventscape runs.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EVENTSCAPE_MAX_WORKERS, EVENTSCAPE_GENERATOR_TIMEOUT_MS)
//! 2. Config file (EVENTSCAPE_CONFIG, else .eventscape/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - EVENTSCAPE_CONFIG names the file directly
//! - Otherwise searches the current directory and parents for .eventscape/config.yaml
//! - Finally falls back to the user config directory (eventscape/config.yaml)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{
    CompatibilityOverride, CompatibilityTable, OrchestrationLimits, Orchestrator,
    OrchestratorSettings, RetryPolicy, ScoringThresholds,
};
use crate::domain::TemplateId;

pub const CONFIG_ENV: &str = "EVENTSCAPE_CONFIG";
pub const MAX_WORKERS_ENV: &str = "EVENTSCAPE_MAX_WORKERS";
pub const GENERATOR_TIMEOUT_ENV: &str = "EVENTSCAPE_GENERATOR_TIMEOUT_MS";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub limits: OrchestrationLimits,
    #[serde(default)]
    pub scoring: ScoringThresholds,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Required templates allowed to fail without failing the run
    #[serde(default)]
    pub non_critical: Vec<TemplateId>,
    /// Culture pairs whose compatibility differs from the built-in table
    #[serde(default)]
    pub compatibility: Vec<CompatibilityOverride>,
}

fn default_version() -> String {
    "1".to_string()
}

/// Configuration after all sources are applied
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub settings: OrchestratorSettings,
    pub compatibility: Vec<CompatibilityOverride>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn compatibility_table(&self) -> CompatibilityTable {
        CompatibilityTable::with_overrides(&self.compatibility)
    }

    /// Orchestrator over the reference generators with these settings
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        Orchestrator::with_reference_generators(self.settings.clone(), self.compatibility_table())
            .context("Invalid relationship graph")
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".eventscape").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

fn user_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("eventscape").join("config.yaml");
    path.exists().then_some(path)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn env_number<T>(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid {}: '{}'", key, raw))
        })
        .transpose()
}

/// Apply a config file (if any) and environment overrides over defaults
fn resolve(config_file: Option<PathBuf>, env: &dyn Fn(&str) -> Option<String>) -> Result<ResolvedConfig> {
    let mut resolved = ResolvedConfig::default();

    if let Some(ref path) = config_file {
        let file = load_config_file(path)?;
        resolved.settings = OrchestratorSettings {
            limits: file.limits,
            scoring: file.scoring,
            retry: file.retry,
            non_critical: file.non_critical,
        };
        resolved.compatibility = file.compatibility;
    }

    if let Some(workers) = env_number::<usize>(env, MAX_WORKERS_ENV)? {
        resolved.settings.limits.max_workers = workers;
    }
    if let Some(timeout) = env_number::<u64>(env, GENERATOR_TIMEOUT_ENV)? {
        resolved.settings.limits.generator_timeout_ms = timeout;
    }

    resolved.config_file = config_file;
    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let env = |key: &str| std::env::var(key).ok();

    let config_file = match env(CONFIG_ENV) {
        Some(path) => Some(PathBuf::from(path)),
        None => {
            let cwd = std::env::current_dir().context("Failed to determine current directory")?;
            find_config_file(&cwd).or_else(user_config_file)
        }
    };

    resolve(config_file, &env)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
