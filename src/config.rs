//! CLI configuration: named hosts and defaults, loaded from TOML.
//!
//! Lookup order: an explicit `--config` path wins, otherwise
//! `~/.sshusers/config.toml` if present, otherwise built-in defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runner::{SshRunner, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// One administrable host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// ssh destination, `user@host` or a Host alias from ssh_config
    pub destination: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Per-host skeleton override for home creation
    #[serde(default)]
    pub skel_dir: Option<String>,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl HostConfig {
    pub fn runner(&self) -> SshRunner {
        SshRunner::new(&self.destination)
            .port(self.port)
            .identity_file(self.identity_file.clone())
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .command_timeout(Duration::from_secs(self.command_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Defaults {
    /// Host used when the CLI gives no --host
    #[serde(default)]
    pub host: Option<String>,
    /// Skeleton directory used when neither host nor CLI overrides it
    #[serde(default)]
    pub skel_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub hosts: HashMap<String, HostConfig>,
}

impl Config {
    /// Load configuration from the default path (~/.sshusers/config.toml),
    /// falling back to an empty config when none exists.
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".sshusers").join("config.toml");
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Config::default())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, host) in &self.hosts {
            if host.destination.is_empty() {
                errors.push(ValidationError {
                    field: format!("hosts.{}.destination", name),
                    message: "Destination must not be empty".to_string(),
                });
            }
            if host.command_timeout_secs == 0 {
                errors.push(ValidationError {
                    field: format!("hosts.{}.command_timeout_secs", name),
                    message: "Must be greater than 0".to_string(),
                });
            }
        }

        if let Some(default_host) = &self.defaults.host {
            if !self.hosts.contains_key(default_host) {
                errors.push(ValidationError {
                    field: "defaults.host".to_string(),
                    message: format!("Unknown host '{}'", default_host),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolve the host to operate on: CLI override first, then the
    /// configured default.
    pub fn resolve_host<'a>(&'a self, cli_host: Option<&'a str>) -> Result<(&'a str, &'a HostConfig)> {
        let name = cli_host
            .or(self.defaults.host.as_deref())
            .ok_or_else(|| anyhow::anyhow!("no host given: pass --host or set defaults.host"))?;
        let host = self
            .hosts
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("host '{}' not found in config", name))?;
        Ok((name, host))
    }

    /// Effective skeleton directory for a host, with CLI > host > defaults
    /// precedence handled by the caller passing `cli_skel`.
    pub fn skel_dir_for(&self, host: &HostConfig, cli_skel: Option<&str>) -> Option<String> {
        cli_skel
            .map(str::to_string)
            .or_else(|| host.skel_dir.clone())
            .or_else(|| self.defaults.skel_dir.clone())
    }
}
