use std::{env, net::SocketAddr};

use thiserror::Error;

pub const DEFAULT_INSTANCE_NAME: &str = "uptime monitor";

#[derive(Debug, Clone)]
pub struct Config {
    pub admin_secret: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub instance_name: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ADMIN_SECRET is required and must not be empty")]
    MissingAdminSecret,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin_secret = lookup("ADMIN_SECRET")
            .map(|secret| secret.trim().to_string())
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingAdminSecret)?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = lookup("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);
        let instance_name = lookup("INSTANCE_NAME")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_INSTANCE_NAME.to_string());

        let config = Self {
            admin_secret,
            bind_addr,
            bind_port,
            instance_name,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
