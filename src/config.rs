//! Configuration management for CertChain

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ChainError;

pub const DEFAULT_CONFIG_PATH: &str = "certchain.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served for any path outside `/api`.
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Snapshot imported at startup when set.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

/// Parse a TOML document and validate it.
pub fn parse_config(text: &str) -> Result<Config, ChainError> {
    let config: Config = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load `path`, falling back to defaults when the file is absent.
/// `PORT` in the environment overrides `server.port`.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        parse_config(&config_str)?
    } else {
        Config::default()
    };

    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        config.server.port = port;
    }

    config.validate()?;
    Ok(config)
}

impl Config {
    /// Replace the port, then re-run validation.
    pub fn override_port(&mut self, port: u16) -> Result<(), ChainError> {
        self.server.port = port;
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.server.host.trim().is_empty() {
            return Err(ChainError::ConfigError("server.host must not be empty".to_string()));
        }
        if self.server.port == 0 {
            return Err(ChainError::ConfigError("server.port must be non-zero".to_string()));
        }
        if matches!(&self.ledger.snapshot_path, Some(p) if p.trim().is_empty()) {
            return Err(ChainError::ConfigError(
                "ledger.snapshot_path must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
