//! Server configuration
//!
//! Settings come from, in increasing priority: built-in defaults, a JSON
//! file named by `CHAT_CONFIG`, the `CHAT_HOST` / `CHAT_PORT` /
//! `CHAT_MAX_CLIENTS` environment variables, and the positional command
//! line arguments `[port] [max_clients]`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default listening port
pub const DEFAULT_PORT: u16 = 55065;

/// Default client capacity
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Server configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_clients: usize,
    /// Lines queued per client before further lines are dropped
    pub outbound_buffer: usize,
    pub backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            outbound_buffer: 32,
            backlog: 128,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment and command line
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a configuration from explicit sources
    ///
    /// `env` looks up an environment variable by name.
    pub fn from_sources<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match env("CHAT_CONFIG") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(host) = env("CHAT_HOST") {
            config.host = host;
        }
        if let Some(port) = env("CHAT_PORT") {
            config.port = parse_port(&port)?;
        }
        if let Some(max) = env("CHAT_MAX_CLIENTS") {
            config.max_clients = parse_max_clients(&max)?;
        }

        if let Some(port) = args.first() {
            config.port = parse_port(port)?;
        }
        if let Some(max) = args.get(1) {
            config.max_clients = parse_max_clients(max)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::ReadFile { path, source })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Zero {
                field: "max_clients",
            });
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::Zero {
                field: "outbound_buffer",
            });
        }
        Ok(())
    }

    /// The address to listen on
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}

fn parse_max_clients(raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidMaxClients(raw.to_string()))
}
