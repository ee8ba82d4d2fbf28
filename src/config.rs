use config::{Config, ConfigError, Environment, File as ConfigFile};
use crate::planner::category::is_valid_label;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;
pub const DEFAULT_HASH_ALGORITHM: &str = "md5";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source_root: Option<PathBuf>,
    #[serde(default)]
    pub target_root: Option<PathBuf>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
    /// Extension to category overrides, merged over the built-in table.
    #[serde(default)]
    pub categories: HashMap<String, String>,
}

fn default_checkpoint_interval() -> usize {
    DEFAULT_CHECKPOINT_INTERVAL
}

fn default_hash_algorithm() -> String {
    DEFAULT_HASH_ALGORITHM.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_root: None,
            target_root: None,
            ignore_patterns: Vec::new(),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            hash_algorithm: default_hash_algorithm(),
            categories: HashMap::new(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::Message(
                "checkpoint_interval must be at least 1".to_string(),
            ));
        }
        if self.hash_algorithm.trim().is_empty() {
            return Err(ConfigError::Message(
                "hash_algorithm must not be empty".to_string(),
            ));
        }
        if let Some((ext, label)) = self
            .categories
            .iter()
            .find(|(_, label)| !is_valid_label(label))
        {
            return Err(ConfigError::Message(format!(
                "category for \"{}\" must be a single directory name, got \"{}\"",
                ext, label
            )));
        }
        Ok(())
    }
}

/// Reads `Organizer.toml` (optional) and `ORGANIZER_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Organizer").required(false))
        .add_source(Environment::with_prefix("ORGANIZER"))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}
