//! Configuration management with file persistence

use crate::storage::default_database_path;
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "POISE_CONFIG_DIR";

/// Environment variable overriding the database path
pub const DATABASE_PATH_ENV: &str = "POISE_DATABASE_PATH";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Poise configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub shell: ShellConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file; the platform data directory is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// How many times a yes/no question is asked before giving up
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("poise")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or the defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config = Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
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
        if self.shell.max_attempts == 0 {
            return Err(anyhow!("shell.max_attempts must be at least 1"));
        }
        if !LOG_LEVELS.contains(&self.log.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level: {}. Valid options: {}",
                self.log.level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }

    /// Database path: `POISE_DATABASE_PATH`, then the config file, then the
    /// platform default
    pub fn database_path(&self) -> PathBuf {
        env::var_os(DATABASE_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(default_database_path)
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(match &self.database.path {
                Some(path) => path.display().to_string(),
                None => format!("(default: {})", default_database_path().display()),
            }),
            "shell.max_attempts" => Ok(self.shell.max_attempts.to_string()),
            "log.level" => Ok(self.log.level.clone()),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `poise config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.path" => {
                let value = value.trim();
                self.database.path = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "shell.max_attempts" => {
                let attempts: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_attempts value: {}", value))?;
                if attempts == 0 {
                    return Err(anyhow!("shell.max_attempts must be at least 1"));
                }
                self.shell.max_attempts = attempts;
            }
            "log.level" => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(anyhow!(
                        "Invalid log level: {}. Valid options: {}",
                        value,
                        LOG_LEVELS.join(", ")
                    ));
                }
                self.log.level = level;
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `poise config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        ["database.path", "shell.max_attempts", "log.level"]
            .into_iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }
}
