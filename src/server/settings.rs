// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered server settings.
//!
//! Settings are resolved from several sources with a fixed precedence, highest
//! first:
//!
//! 1. Command-line arguments
//! 2. Environment variables prefixed with `CONFIG_REGISTRY_`
//! 3. A YAML settings file (`--config`, `CONFIG_REGISTRY_CONFIG`, or the OS default location)
//! 4. Built-in defaults
//!
//! Each source produces a [`PartialSettings`]; layers are merged and the result
//! is validated into [`ServerSettings`].

use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by every environment variable the server reads.
pub const ENV_PREFIX: &str = "CONFIG_REGISTRY_";

/// Maximum accepted size of a settings file (1MB)
const MAX_SETTINGS_FILE_SIZE: u64 = 1024 * 1024;

const DEFAULT_ETCD_ENDPOINT: &str = "localhost:2379";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors raised while loading server settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings file '{}': {message}", .path.display())]
    Io {
        /// Path of the settings file
        path: PathBuf,
        /// Description of the failure
        message: String,
        /// Underlying I/O error, if any
        #[source]
        source: Option<std::io::Error>,
    },

    /// The settings file is not valid YAML for the settings schema.
    #[error("Failed to parse settings file '{}': {source}", .path.display())]
    Parse {
        /// Path of the settings file
        path: PathBuf,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// A setting has an unusable value.
    #[error("Invalid value '{value}' for setting '{key}': {message}")]
    InvalidValue {
        /// Name of the setting
        key: String,
        /// The rejected value
        value: String,
        /// Why it was rejected
        message: String,
    },
}

impl SettingsError {
    fn invalid(key: &str, value: impl fmt::Display, message: impl Into<String>) -> Self {
        SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

/// Record store backing the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local map; contents are lost on exit
    #[default]
    Memory,
    /// etcd cluster
    Etcd,
    /// Redis server
    Redis,
}

impl BackendKind {
    /// Returns the backend's lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Etcd => "etcd",
            BackendKind::Redis => "redis",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "etcd" => Ok(BackendKind::Etcd),
            "redis" => Ok(BackendKind::Redis),
            _ => Err(SettingsError::invalid(
                "backend",
                s,
                "expected one of: memory, etcd, redis",
            )),
        }
    }
}

/// One layer of settings. Unset fields defer to lower layers.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialSettings {
    /// Address the HTTP server binds to
    pub listen_addr: Option<SocketAddr>,
    /// Record store backend
    pub backend: Option<BackendKind>,
    /// etcd endpoints
    pub etcd_endpoints: Option<Vec<String>>,
    /// Redis connection URL
    pub redis_url: Option<String>,
    /// Key prefix applied by remote stores
    pub key_prefix: Option<String>,
    /// Deadline for each remote store round trip, in milliseconds
    pub request_timeout_ms: Option<u64>,
    /// Time allowed for in-flight requests to drain on shutdown, in seconds
    pub shutdown_grace_secs: Option<u64>,
    /// Admission limiter burst capacity
    pub rate_limit_capacity: Option<u32>,
    /// Admission limiter refill rate, in tokens per second
    pub rate_limit_refill_per_sec: Option<f64>,
}

impl PartialSettings {
    /// Parses a YAML settings document. `path` is used for error reporting.
    pub fn from_yaml_str(path: &Path, content: &str) -> Result<Self, SettingsError> {
        // An empty document is a valid file with nothing set.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads and parses a YAML settings file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, SettingsError> {
        let io_error = |message: &str, source: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            message: format!("{}: {}", message, source),
            source: Some(source),
        };

        let metadata = fs::metadata(path).map_err(|e| io_error("Failed to read file metadata", e))?;
        if metadata.len() > MAX_SETTINGS_FILE_SIZE {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                message: format!(
                    "Settings file too large: {} bytes (max {} bytes)",
                    metadata.len(),
                    MAX_SETTINGS_FILE_SIZE
                ),
                source: None,
            });
        }

        let content = fs::read_to_string(path).map_err(|e| io_error("Failed to read file", e))?;
        Self::from_yaml_str(path, &content)
    }

    /// Builds a layer from `CONFIG_REGISTRY_*` variables.
    ///
    /// Variables without the prefix are ignored. `CONFIG_REGISTRY_ETCD_ENDPOINTS`
    /// is a comma-separated list.
    pub fn from_env_vars<I, K, V>(vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut layer = Self::default();

        for (name, value) in vars {
            let Some(key) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();

            match key {
                "LISTEN_ADDR" => layer.listen_addr = Some(parse_value(name.as_ref(), value)?),
                "BACKEND" => layer.backend = Some(value.parse()?),
                "ETCD_ENDPOINTS" => layer.etcd_endpoints = Some(split_list(value)),
                "REDIS_URL" => layer.redis_url = Some(value.to_string()),
                "KEY_PREFIX" => layer.key_prefix = Some(value.to_string()),
                "REQUEST_TIMEOUT_MS" => {
                    layer.request_timeout_ms = Some(parse_value(name.as_ref(), value)?)
                }
                "SHUTDOWN_GRACE_SECS" => {
                    layer.shutdown_grace_secs = Some(parse_value(name.as_ref(), value)?)
                }
                "RATE_LIMIT_CAPACITY" => {
                    layer.rate_limit_capacity = Some(parse_value(name.as_ref(), value)?)
                }
                "RATE_LIMIT_REFILL_PER_SEC" => {
                    layer.rate_limit_refill_per_sec = Some(parse_value(name.as_ref(), value)?)
                }
                // Names the settings file rather than a setting.
                "CONFIG" => {}
                other => {
                    tracing::debug!(variable = other, "Ignoring unknown environment setting");
                }
            }
        }

        Ok(layer)
    }

    /// Returns `self` with every field set in `higher` taking precedence.
    pub fn overlay(self, higher: PartialSettings) -> PartialSettings {
        PartialSettings {
            listen_addr: higher.listen_addr.or(self.listen_addr),
            backend: higher.backend.or(self.backend),
            etcd_endpoints: higher.etcd_endpoints.or(self.etcd_endpoints),
            redis_url: higher.redis_url.or(self.redis_url),
            key_prefix: higher.key_prefix.or(self.key_prefix),
            request_timeout_ms: higher.request_timeout_ms.or(self.request_timeout_ms),
            shutdown_grace_secs: higher.shutdown_grace_secs.or(self.shutdown_grace_secs),
            rate_limit_capacity: higher.rate_limit_capacity.or(self.rate_limit_capacity),
            rate_limit_refill_per_sec: higher
                .rate_limit_refill_per_sec
                .or(self.rate_limit_refill_per_sec),
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| SettingsError::invalid(key, value, e.to_string()))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Command-line arguments of the `config-registry` binary.
#[derive(Debug, Default, Parser)]
#[command(name = "config-registry", version, about = "Versioned configuration registry server")]
pub struct Cli {
    /// Path to a YAML settings file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g. 0.0.0.0:8080)
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Record store backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// etcd endpoint; repeat or separate with commas
    #[arg(long = "etcd-endpoint", value_name = "HOST:PORT", value_delimiter = ',')]
    pub etcd_endpoints: Vec<String>,

    /// Redis connection URL
    #[arg(long, value_name = "URL")]
    pub redis_url: Option<String>,

    /// Key prefix used by remote stores
    #[arg(long, value_name = "PREFIX")]
    pub key_prefix: Option<String>,

    /// Deadline for each remote store round trip, in milliseconds
    #[arg(long, value_name = "MS")]
    pub request_timeout_ms: Option<u64>,

    /// Grace period for draining requests on shutdown, in seconds
    #[arg(long, value_name = "SECS")]
    pub shutdown_grace_secs: Option<u64>,

    /// Admission limiter burst capacity
    #[arg(long, value_name = "N")]
    pub rate_limit_capacity: Option<u32>,

    /// Admission limiter refill rate, in tokens per second
    #[arg(long, value_name = "RATE")]
    pub rate_limit_refill: Option<f64>,
}

impl Cli {
    /// Returns the settings given on the command line as a layer.
    pub fn to_partial(&self) -> PartialSettings {
        PartialSettings {
            listen_addr: self.listen,
            backend: self.backend,
            etcd_endpoints: if self.etcd_endpoints.is_empty() {
                None
            } else {
                Some(self.etcd_endpoints.clone())
            },
            redis_url: self.redis_url.clone(),
            key_prefix: self.key_prefix.clone(),
            request_timeout_ms: self.request_timeout_ms,
            shutdown_grace_secs: self.shutdown_grace_secs,
            rate_limit_capacity: self.rate_limit_capacity,
            rate_limit_refill_per_sec: self.rate_limit_refill,
        }
    }
}

/// Fully resolved server settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerSettings {
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,
    /// Record store backend
    pub backend: BackendKind,
    /// etcd endpoints, used by the etcd backend
    pub etcd_endpoints: Vec<String>,
    /// Redis connection URL, used by the Redis backend
    pub redis_url: String,
    /// Key prefix for remote stores; each backend has its own default
    pub key_prefix: Option<String>,
    /// Deadline for each remote store round trip
    pub request_timeout: Duration,
    /// Time allowed for in-flight requests to drain on shutdown
    pub shutdown_grace: Duration,
    /// Admission limiter burst capacity
    pub rate_limit_capacity: u32,
    /// Admission limiter refill rate, in tokens per second
    pub rate_limit_refill_per_sec: f64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            backend: BackendKind::Memory,
            etcd_endpoints: vec![DEFAULT_ETCD_ENDPOINT.to_string()],
            redis_url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            rate_limit_capacity: super::limiter::DEFAULT_CAPACITY,
            rate_limit_refill_per_sec: super::limiter::DEFAULT_REFILL_PER_SEC,
        }
    }
}

impl ServerSettings {
    /// Loads settings for the running process.
    ///
    /// The settings file is taken from `--config`, then `CONFIG_REGISTRY_CONFIG`,
    /// then the OS default location if a file exists there. An explicitly named
    /// file that cannot be read is an error.
    pub fn load(cli: &Cli) -> Result<Self, SettingsError> {
        // Non UTF-8 variables cannot be settings; skip them instead of panicking.
        let env: Vec<(String, String)> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();

        let explicit = cli.config.clone().or_else(|| {
            env.iter()
                .find(|(k, _)| k == &format!("{}CONFIG", ENV_PREFIX))
                .map(|(_, v)| PathBuf::from(v))
        });
        let file = explicit.or_else(|| default_settings_path().filter(|p| p.is_file()));

        if let Some(path) = &file {
            tracing::info!(path = %path.display(), "Loading settings file");
        }

        Self::from_sources(file.as_deref(), env, cli)
    }

    /// Resolves settings from an optional file, environment pairs and the CLI.
    pub fn from_sources<I, K, V>(
        file: Option<&Path>,
        env: I,
        cli: &Cli,
    ) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let file_layer = match file {
            Some(path) => PartialSettings::from_yaml_file(path)?,
            None => PartialSettings::default(),
        };
        let env_layer = PartialSettings::from_env_vars(env)?;

        let merged = file_layer.overlay(env_layer).overlay(cli.to_partial());
        Self::resolve(merged)
    }

    /// Applies defaults to `layer` and validates the result.
    pub fn resolve(layer: PartialSettings) -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let settings = Self {
            listen_addr: layer.listen_addr.unwrap_or(defaults.listen_addr),
            backend: layer.backend.unwrap_or(defaults.backend),
            etcd_endpoints: layer.etcd_endpoints.unwrap_or(defaults.etcd_endpoints),
            redis_url: layer.redis_url.unwrap_or(defaults.redis_url),
            key_prefix: layer.key_prefix,
            request_timeout: layer
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            shutdown_grace: layer
                .shutdown_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
            rate_limit_capacity: layer
                .rate_limit_capacity
                .unwrap_or(defaults.rate_limit_capacity),
            rate_limit_refill_per_sec: layer
                .rate_limit_refill_per_sec
                .unwrap_or(defaults.rate_limit_refill_per_sec),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.request_timeout.is_zero() {
            return Err(SettingsError::invalid(
                "request_timeout_ms",
                0,
                "must be greater than zero",
            ));
        }
        if self.rate_limit_capacity == 0 {
            return Err(SettingsError::invalid(
                "rate_limit_capacity",
                0,
                "must be at least 1",
            ));
        }
        if !self.rate_limit_refill_per_sec.is_finite() || self.rate_limit_refill_per_sec <= 0.0 {
            return Err(SettingsError::invalid(
                "rate_limit_refill_per_sec",
                self.rate_limit_refill_per_sec,
                "must be a positive number",
            ));
        }
        if self.backend == BackendKind::Etcd && self.etcd_endpoints.is_empty() {
            return Err(SettingsError::invalid(
                "etcd_endpoints",
                "[]",
                "the etcd backend needs at least one endpoint",
            ));
        }
        if self.backend == BackendKind::Redis && self.redis_url.trim().is_empty() {
            return Err(SettingsError::invalid(
                "redis_url",
                "",
                "the redis backend needs a connection URL",
            ));
        }
        Ok(())
    }
}

/// Returns the OS-appropriate location of the settings file.
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "cryptidtech", "config-registry")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}
