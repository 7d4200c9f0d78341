//! Server configuration
//!
//! Precedence: config file, then environment variables, then CLI flags.

use assay_grounding::GroundingConfig;
use assay_ingress::StreamSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub streaming: StreamSettings,

    #[serde(default)]
    pub grounding: GroundingConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub anthropic: Option<ProviderSettings>,
    pub openai: Option<ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// OpenAI only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            organization: None,
            enabled: true,
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub log_requests: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_requests: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Business-layer endpoint that executes tool calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_tools_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_tools_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
            streaming: StreamSettings::default(),
            grounding: GroundingConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from YAML, or TOML when the extension is `.toml`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            self.providers
                .anthropic
                .get_or_insert_with(ProviderSettings::default)
                .api_key = Some(api_key);
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            self.providers
                .openai
                .get_or_insert_with(ProviderSettings::default)
                .api_key = Some(api_key);
        }

        if let Ok(val) = std::env::var("ASSAY_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("ASSAY_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: ignoring invalid ASSAY_PORT '{}'", val),
            }
        }

        if let Ok(val) = std::env::var("ASSAY_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("ASSAY_LOG_REQUESTS")
            && let Ok(enabled) = val.parse::<bool>()
        {
            self.logging.log_requests = enabled;
        }

        if let Ok(val) = std::env::var("ASSAY_TOOLS_ENDPOINT")
            && !val.trim().is_empty()
        {
            self.tools.endpoint = Some(val);
        }
    }

    /// Listen address as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    120
}

fn default_tools_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
