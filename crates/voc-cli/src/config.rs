//! Configuration file handling for voc-cli

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use voc_client::ClientConfig;

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default account username
    pub username: Option<String>,
    /// Default region
    pub region: Option<String>,
    /// Explicit API root (overrides region)
    pub base_url: Option<String>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Delay between remote operation polls
    pub poll_interval_ms: Option<u64>,
    /// Give up on a remote operation after this long (0 disables the limit)
    pub operation_timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("voc-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &ArgOverrides<'_>) -> MergedConfig {
        MergedConfig {
            username: args
                .username
                .map(String::from)
                .or_else(|| self.username.clone()),
            region: args
                .region
                .map(String::from)
                .or_else(|| self.region.clone())
                .unwrap_or_else(|| voc_client::config::DEFAULT_REGION.to_string()),
            base_url: args
                .base_url
                .map(String::from)
                .or_else(|| self.base_url.clone()),
            no_color: args.no_color || self.no_color.unwrap_or(false),
            poll_interval_ms: self.poll_interval_ms,
            operation_timeout_ms: self.operation_timeout_ms,
        }
    }
}

/// Values given on the command line, which win over the config file
#[derive(Debug, Default)]
pub struct ArgOverrides<'a> {
    pub username: Option<&'a str>,
    pub region: Option<&'a str>,
    pub base_url: Option<&'a str>,
    pub no_color: bool,
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub username: Option<String>,
    pub region: String,
    pub base_url: Option<String>,
    pub no_color: bool,
    pub poll_interval_ms: Option<u64>,
    pub operation_timeout_ms: Option<u64>,
}

impl MergedConfig {
    /// Client configuration for the resolved settings
    pub fn client_config(&self) -> ClientConfig {
        let mut builder = ClientConfig::builder().region(self.region.clone());
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            builder = builder.poll_interval_ms(ms);
        }
        if let Some(ms) = self.operation_timeout_ms {
            builder = builder.operation_timeout_ms((ms > 0).then_some(ms));
        }
        builder.build()
    }
}
