//! Run configuration.
//!
//! The config is an optional JSON file. Missing fields fall back to the
//! defaults below, and the result is validated once before any stage runs.
use crate::combine::DEFAULT_MAX_ARITY;
use crate::exec::DEFAULT_SHELL;
use crate::lexicon::DEFAULT_UTILITIES;
use crate::persist::read_json;
use crate::synth::DEFAULT_TOP_N;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Per-candidate wall-clock budget during validation.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Processed candidates between checkpoint flushes.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 100;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,
    /// Overrides the built-in utility list when non-empty.
    pub utilities: Vec<String>,
    pub shell: String,
    pub generation: GenerationConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_arity: usize,
    pub top_n: usize,
    pub multiplier: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub timeout_ms: u64,
    pub checkpoint_interval: usize,
    /// Leading tokens that are never executed.
    pub excluded_utilities: Vec<String>,
    pub elevation_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            utilities: DEFAULT_UTILITIES.iter().map(|name| name.to_string()).collect(),
            shell: DEFAULT_SHELL.to_string(),
            generation: GenerationConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_arity: DEFAULT_MAX_ARITY,
            top_n: DEFAULT_TOP_N,
            multiplier: None,
            seed: None,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            excluded_utilities: ["tar", "zip", "unzip", "gzip"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            elevation_prefix: "sudo".to_string(),
        }
    }
}

/// `~/.config/cmdsynth/config.json`, when a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cmdsynth").join(CONFIG_FILE_NAME))
}

/// Load the explicit config, else the per-user one if present, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using per-user config");
                load_config(&path)?
            }
            None => Config::default(),
        },
    };
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    read_json(path).with_context(|| format!("load config {}", path.display()))
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.shell.trim().is_empty() {
        return Err(anyhow!("shell must be non-empty"));
    }
    if config.generation.max_arity == 0 {
        return Err(anyhow!("generation.max_arity must be at least 1"));
    }
    if config.generation.top_n == 0 {
        return Err(anyhow!("generation.top_n must be at least 1"));
    }
    if config.generation.multiplier == Some(0) {
        return Err(anyhow!("generation.multiplier must be positive when set"));
    }
    if config.validation.timeout_ms == 0 {
        return Err(anyhow!("validation.timeout_ms must be positive"));
    }
    if config.validation.checkpoint_interval == 0 {
        return Err(anyhow!("validation.checkpoint_interval must be at least 1"));
    }
    if config
        .utilities
        .iter()
        .any(|name| name.trim().is_empty() || name.contains(char::is_whitespace))
    {
        return Err(anyhow!("utilities entries must be single non-empty words"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
