//! Configuration for the agent launch client

pub mod networks;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

pub use networks::{NetworkConfig, NetworkTable};

/// Environment variable names
mod env_vars {
    pub const API_URL: &str = "AGENT_API_URL";
    pub const SOCKET_URL: &str = "AGENT_SOCKET_URL";
    pub const STATE_DIR: &str = "AGENT_STATE_DIR";
    pub const SIGNALS_PAGE_SIZE: &str = "AGENT_SIGNALS_PAGE_SIZE";
}

pub const DEFAULT_API_URL: &str = "http://localhost:5500/api/v1";
pub const DEFAULT_SOCKET_URL: &str = "https://test-api2.slinky.build";

/// Deployment provider codes understood by the backend
pub const ELIZA_CODE: &str = "110";
pub const FLEEK_CODE: &str = "113";

/// A hosting provider an agent can be deployed to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderOption {
    pub code: String,
    pub name: String,
    /// Monthly price in USD before any free trial
    pub price_usd: u32,
}

/// Provider catalog shown on the final wizard step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCatalog {
    pub options: Vec<ProviderOption>,
    /// Code preselected when the wizard mounts
    pub default_code: String,
}

impl ProviderCatalog {
    pub fn get(&self, code: &str) -> Option<&ProviderOption> {
        self.options.iter().find(|opt| opt.code == code)
    }

    pub fn price_for(&self, code: &str) -> Option<u32> {
        self.get(code).map(|opt| opt.price_usd)
    }
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        Self {
            options: vec![
                ProviderOption {
                    code: ELIZA_CODE.to_string(),
                    name: "ElizaOS".to_string(),
                    price_usd: 10,
                },
                ProviderOption {
                    code: FLEEK_CODE.to_string(),
                    name: "Fleek".to_string(),
                    price_usd: 15,
                },
            ],
            default_code: ELIZA_CODE.to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend REST API base URL
    pub api_url: String,
    /// Realtime signal feed endpoint
    pub socket_url: String,
    /// Signals fetched per page on the review screen
    #[serde(default = "default_page_size")]
    pub signals_page_size: u32,
    /// Restrict each wallet to the free-trial agent allowance
    #[serde(default = "default_true")]
    pub free_trial_only: bool,
    /// Number of agents a free-trial wallet may own
    #[serde(default = "default_agent_limit")]
    pub agent_limit: usize,
    #[serde(default)]
    pub providers: ProviderCatalog,
    /// Directory holding the persisted session and exchange credentials
    pub state_dir: PathBuf,
    #[serde(default)]
    pub networks: NetworkTable,
}

fn default_page_size() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

fn default_agent_limit() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            signals_page_size: default_page_size(),
            free_trial_only: true,
            agent_limit: default_agent_limit(),
            providers: ProviderCatalog::default(),
            state_dir: PathBuf::from(".agent-launch"),
            networks: NetworkTable::default(),
        }
    }
}

impl Config {
    /// Build configuration from environment variables over the defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(env_vars::API_URL) {
            tracing::debug!("Using AGENT_API_URL for backend");
            config.api_url = url;
        }
        if let Ok(url) = std::env::var(env_vars::SOCKET_URL) {
            tracing::debug!("Using AGENT_SOCKET_URL for realtime feed");
            config.socket_url = url;
        }
        if let Ok(dir) = std::env::var(env_vars::STATE_DIR) {
            config.state_dir = PathBuf::from(dir);
        }
        if let Ok(size) = std::env::var(env_vars::SIGNALS_PAGE_SIZE) {
            match size.parse() {
                Ok(size) => config.signals_page_size = size,
                Err(_) => tracing::warn!(value = %size, "Ignoring unparsable signals page size"),
            }
        }

        config
    }

    /// Load a JSON config file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api_url)
            .map_err(|e| Error::Config(format!("Invalid api_url {}: {}", self.api_url, e)))?;
        Url::parse(&self.socket_url)
            .map_err(|e| Error::Config(format!("Invalid socket_url {}: {}", self.socket_url, e)))?;
        if self.signals_page_size == 0 {
            return Err(Error::Config("signals_page_size must be positive".to_string()));
        }
        if self.providers.get(&self.providers.default_code).is_none() {
            return Err(Error::Config(format!(
                "Default provider {} is not in the catalog",
                self.providers.default_code
            )));
        }
        Ok(())
    }

    pub fn session_path(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }

    pub fn exchange_credentials_path(&self) -> PathBuf {
        self.state_dir.join("exchange_credentials.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.signals_page_size, 50);
        assert_eq!(config.providers.price_for(FLEEK_CODE), Some(15));
        assert_eq!(config.providers.price_for(ELIZA_CODE), Some(10));
    }

    #[test]
    fn deserialize_fills_defaults() {
        let value = serde_json::json!({
            "api_url": "https://api.example.com/v1",
            "socket_url": "https://socket.example.com",
            "state_dir": "/tmp/agent-launch"
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert!(parsed.free_trial_only);
        assert_eq!(parsed.agent_limit, 1);
        assert_eq!(parsed.providers.default_code, ELIZA_CODE);
        assert!(parsed.networks.get("ethereum").is_some());
        assert_eq!(
            parsed.session_path(),
            PathBuf::from("/tmp/agent-launch/session.json")
        );
    }

    #[test]
    fn validate_rejects_bad_urls_and_page_size() {
        let mut config = Config {
            api_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.api_url = DEFAULT_API_URL.to_string();
        config.signals_page_size = 0;
        assert!(config.validate().is_err());
    }
}
