//! Configuration loading from TOML files

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for grantline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub openalex: OpenAlexConfig,
    pub europepmc: EuropePmcConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("./output"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENALEX_API_KEY").ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct EuropePmcConfig {
    pub concurrency: usize,
}

impl Default for EuropePmcConfig {
    fn default() -> Self {
        Self { concurrency: 5 }
    }
}

/// Deserialize a string that may contain an environment variable reference
/// like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to the environment variable's value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./grantline.toml (current directory)
    /// 2. ~/.config/grantline/config.toml
    ///
    /// If no config file is found, returns the default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("grantline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "grantline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}
