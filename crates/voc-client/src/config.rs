//! Client configuration with YAML/JSON support

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Region served by the vendor's default host
pub const DEFAULT_REGION: &str = "eu";

/// VOC client configuration
///
/// Can be loaded from YAML or JSON, or constructed programmatically.
///
/// ```yaml
/// connection:
///   region: "na"
///   request_ms: 30000
///
/// polling:
///   interval_ms: 5000
///   timeout_ms: 600000   # null disables the limit
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Remote operation polling settings
    #[serde(default)]
    pub polling: PollingConfig,

    /// Client identification sent with every request
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Region selector; picks the API host
    #[serde(default = "default_region")]
    pub region: String,

    /// Explicit API root, overriding the region-derived host
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout in milliseconds (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_ms: u64,

    /// Connect timeout in milliseconds (default: 10s)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            base_url: None,
            request_ms: default_request_timeout(),
            connect_ms: default_connect_timeout(),
        }
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_request_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_connect_timeout() -> u64 {
    10_000 // 10 seconds
}

impl ConnectionConfig {
    /// API root URL, always ending in `/`
    pub fn api_base_url(&self) -> String {
        let base = match &self.base_url {
            Some(url) => url.clone(),
            None => region_base_url(&self.region),
        };
        if base.ends_with('/') {
            base
        } else {
            format!("{}/", base)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }
}

/// API root for a region: the default region uses the bare host, any other
/// region gets a `-{region}` host suffix.
pub fn region_base_url(region: &str) -> String {
    let suffix = if region == DEFAULT_REGION {
        String::new()
    } else {
        format!("-{}", region)
    };
    format!(
        "https://vocapi{}.wirelesscar.net/customerapi/rest/v3.0/",
        suffix
    )
}

/// Polling configuration for remote operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between status polls in milliseconds (default: 5s)
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    /// Upper bound on a whole submit-and-poll sequence in milliseconds
    /// (default: 10 minutes). `None` polls until a terminal state.
    #[serde(default = "default_operation_timeout")]
    pub timeout_ms: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            timeout_ms: default_operation_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    5_000 // 5 seconds
}

fn default_operation_timeout() -> Option<u64> {
    Some(600_000) // 10 minutes
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Device identification headers expected by the vendor API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_device_id")]
    pub device_id: String,
    #[serde(default = "default_os_type")]
    pub os_type: String,
    #[serde(default = "default_originator_type")]
    pub originator_type: String,
    #[serde(default = "default_os_version")]
    pub os_version: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            device_id: default_device_id(),
            os_type: default_os_type(),
            originator_type: default_originator_type(),
            os_version: default_os_version(),
        }
    }
}

fn default_user_agent() -> String {
    "yes".to_string()
}

fn default_device_id() -> String {
    "Device".to_string()
}

fn default_os_type() -> String {
    "Android".to_string()
}

fn default_originator_type() -> String {
    "App".to_string()
}

fn default_os_version() -> String {
    "22".to_string()
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Create a builder for programmatic configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the region selector
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.connection.region = region.into();
        self
    }

    /// Point the client at an explicit API root
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.connection.base_url = Some(url.into());
        self
    }

    /// Set request timeout in milliseconds
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connection.request_ms = ms;
        self
    }

    /// Set connect timeout in milliseconds
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connection.connect_ms = ms;
        self
    }

    /// Set poll interval in milliseconds
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.polling.interval_ms = ms;
        self
    }

    /// Set the operation timeout; `None` disables it
    pub fn operation_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.config.polling.timeout_ms = ms;
        self
    }

    /// Replace the device identification
    pub fn device(mut self, device: DeviceConfig) -> Self {
        self.config.device = device;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
