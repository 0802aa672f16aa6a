//! Configuration loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the listening port.
pub const PORT_ENV: &str = "ICAP_PORT";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("ICAP_PORT='{0}' is not a valid port")]
    InvalidPort(String),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the effective configuration: file (or defaults), then `ICAP_PORT`, then validation.
pub fn resolve_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    resolve_with_port(path, std::env::var(PORT_ENV).ok().as_deref())
}

/// As [`resolve_config`], with the port override passed explicitly.
pub fn resolve_with_port(path: Option<&Path>, port: Option<&str>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ServiceConfig::default(),
    };

    apply_port_override(&mut config, port)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Replace the port of `listener.bind_address` with `port`, when given.
///
/// An unparsable bind address is left alone so validation reports it.
pub fn apply_port_override(config: &mut ServiceConfig, port: Option<&str>) -> Result<(), ConfigError> {
    let Some(raw) = port.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let port: u16 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))?;

    if let Ok(mut addr) = config.listener.bind_address.parse::<SocketAddr>() {
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }
    Ok(())
}
