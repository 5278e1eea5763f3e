//! Configuration management with file persistence

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use sightline_core::config::SearchConfig;
use sightline_core::infrastructure::crypto::SearchKey;
use sightline_core::storage::default_database_path;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Sightline CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub security: SecuritySection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseSection {
    /// Database file path; the platform config directory when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSection {
    pub join_timeout_secs: u64,
    pub max_workers: usize,
    pub parallel_threshold: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        let defaults = SearchConfig::default();
        Self {
            join_timeout_secs: defaults.join_timeout_secs,
            max_workers: defaults.max_workers,
            parallel_threshold: defaults.parallel_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecuritySection {
    /// Never persisted; keys come from the environment only
    #[serde(skip)]
    pub key: Option<String>,
}

impl SecuritySection {
    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.key.is_some() {
            return Err(anyhow!(
                "Search keys must be provided via the SIGHTLINE_KEY environment variable, \
                 not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl CliConfig {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("SIGHTLINE_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("sightline")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: CliConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.security.enforce_env_only()?;
        if self.search.join_timeout_secs == 0 {
            return Err(anyhow!("search.join_timeout_secs must be greater than zero"));
        }
        if self.search.max_workers == 0 {
            return Err(anyhow!("search.max_workers must be greater than zero"));
        }
        Ok(())
    }

    /// The database file to open
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// Engine tuning built from the search section
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::default()
            .join_timeout_secs(self.search.join_timeout_secs)
            .max_workers(self.search.max_workers)
            .parallel_threshold(self.search.parallel_threshold)
    }

    /// The field encryption key from the environment, if set
    pub fn resolved_key(&self) -> anyhow::Result<Option<SearchKey>> {
        self.security.enforce_env_only()?;

        match env::var("SIGHTLINE_KEY") {
            Ok(hex) => {
                let key = SearchKey::from_hex(hex.trim())
                    .map_err(|e| anyhow!("SIGHTLINE_KEY is not a valid key: {}", e))?;
                Ok(Some(key))
            }
            Err(_) => Ok(None),
        }
    }

    /// Redacted form of the environment key for display
    pub fn redacted_key(&self) -> anyhow::Result<Option<String>> {
        self.security.enforce_env_only()?;

        Ok(env::var("SIGHTLINE_KEY").ok().map(|hex| {
            let hex = hex.trim();
            if hex.len() <= 4 {
                "***".to_string()
            } else {
                format!("***{}", &hex[hex.len() - 4..])
            }
        }))
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(self.database_path().display().to_string()),

            "search.join_timeout_secs" => Ok(self.search.join_timeout_secs.to_string()),
            "search.max_workers" => Ok(self.search.max_workers.to_string()),
            "search.parallel_threshold" => Ok(self.search.parallel_threshold.to_string()),

            // Key is env-only; show redacted
            "security.key" | "key" => match self.redacted_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use the SIGHTLINE_KEY env var)".to_string()),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `sightline config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.path" => {
                self.database.path = Some(PathBuf::from(value));
            }

            "search.join_timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid join_timeout_secs value: {}", value))?;
                if secs == 0 {
                    return Err(anyhow!("join_timeout_secs must be greater than zero"));
                }
                self.search.join_timeout_secs = secs;
            }
            "search.max_workers" => {
                let max: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_workers value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("max_workers must be greater than zero"));
                }
                self.search.max_workers = max;
            }
            "search.parallel_threshold" => {
                self.search.parallel_threshold = value
                    .parse()
                    .with_context(|| format!("Invalid parallel_threshold value: {}", value))?;
            }

            // Key cannot be set via config
            "security.key" | "key" => {
                return Err(anyhow!(
                    "Search keys cannot be stored in configuration for security. \
                     Set the SIGHTLINE_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `sightline config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "database.path",
            "search.join_timeout_secs",
            "search.max_workers",
            "search.parallel_threshold",
            "security.key",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
