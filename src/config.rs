use crate::session::SessionConfig;
use crate::session::types::{DEFAULT_TOKEN_BYTES, MIN_TOKEN_BYTES};
use clap::Parser;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid duration '{input}': {source}")]
    InvalidDuration {
        input: String,
        source: humantime::DurationError,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Command-line flags. Every flag is optional and only overrides what it names.
#[derive(Debug, Default, Parser)]
#[command(name = "share-screen", version, about = "LAN screen sharing over WebRTC")]
pub struct Args {
    /// YAML config file (takes precedence over CONFIG_PATH)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Server port
    #[arg(long)]
    pub port: Option<u16>,

    /// STUN server URL
    #[arg(long = "stun", value_name = "URL")]
    pub stun_server: Option<String>,

    /// Session lifetime, e.g. 30m or 1h30m
    #[arg(long)]
    pub token_expiry: Option<humantime::Duration>,

    /// Interval between expiry sweeps
    #[arg(long)]
    pub sweep_interval: Option<humantime::Duration>,

    /// Random bytes per session token
    #[arg(long)]
    pub token_bytes: Option<usize>,

    /// Serve HTTPS with the given certificate and key
    #[arg(long)]
    pub https: bool,

    /// PEM certificate chain
    #[arg(long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// STUN server handed to the browser pages
    pub stun_server: String,
    /// Session lifetime
    #[serde(deserialize_with = "deserialize_duration")]
    pub token_expiry: Duration,
    /// Interval between expiry sweeps
    #[serde(deserialize_with = "deserialize_duration")]
    pub sweep_interval: Duration,
    /// Random bytes per session token
    pub token_bytes: usize,
    /// Serve HTTPS instead of plain HTTP
    pub enable_https: bool,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            stun_server: "stun:stun.l.google.com:19302".to_string(),
            token_expiry: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
            token_bytes: DEFAULT_TOKEN_BYTES,
            enable_https: false,
            cert_file: PathBuf::from("certs/server.crt"),
            key_file: PathBuf::from("certs/server.key"),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.token_expiry.is_zero() {
            return Err(ConfigError::Invalid(
                "token_expiry must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(ConfigError::Invalid(format!(
                "token_bytes must be at least {MIN_TOKEN_BYTES}"
            )));
        }
        if self.stun_server.trim().is_empty() {
            return Err(ConfigError::Invalid("stun_server must be set".to_string()));
        }
        if self.enable_https {
            for (name, path) in [("cert_file", &self.cert_file), ("key_file", &self.key_file)] {
                if !path.is_file() {
                    return Err(ConfigError::Invalid(format!(
                        "HTTPS enabled but {name} '{}' does not exist",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Apply command-line flags on top of the file/default values
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(stun) = &args.stun_server {
            self.stun_server = stun.clone();
        }
        if let Some(expiry) = args.token_expiry {
            self.token_expiry = expiry.into();
        }
        if let Some(interval) = args.sweep_interval {
            self.sweep_interval = interval.into();
        }
        if let Some(bytes) = args.token_bytes {
            self.token_bytes = bytes;
        }
        if args.https {
            self.enable_https = true;
        }
        if let Some(cert) = &args.cert {
            self.cert_file = cert.clone();
        }
        if let Some(key) = &args.key {
            self.key_file = key.clone();
        }
    }

    /// Apply `HOST`, `PORT`, `STUN_SERVER`, `TOKEN_EXPIRY`, `SWEEP_INTERVAL`,
    /// `TOKEN_BYTES`, `ENABLE_HTTPS`, `TLS_CERT_FILE` and `TLS_KEY_FILE`
    /// overrides. Unparseable values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Ignoring invalid PORT '{}'", port),
            }
        }
        if let Some(stun) = lookup("STUN_SERVER") {
            self.stun_server = stun;
        }
        if let Some(expiry) = lookup("TOKEN_EXPIRY") {
            match parse_duration(&expiry) {
                Ok(expiry) => self.token_expiry = expiry,
                Err(e) => warn!("Ignoring TOKEN_EXPIRY: {}", e),
            }
        }
        if let Some(interval) = lookup("SWEEP_INTERVAL") {
            match parse_duration(&interval) {
                Ok(interval) => self.sweep_interval = interval,
                Err(e) => warn!("Ignoring SWEEP_INTERVAL: {}", e),
            }
        }
        if let Some(bytes) = lookup("TOKEN_BYTES") {
            match bytes.parse() {
                Ok(bytes) => self.token_bytes = bytes,
                Err(_) => warn!("Ignoring invalid TOKEN_BYTES '{}'", bytes),
            }
        }
        if let Some(https) = lookup("ENABLE_HTTPS") {
            self.enable_https = https == "true";
        }
        if let Some(cert) = lookup("TLS_CERT_FILE") {
            self.cert_file = PathBuf::from(cert);
        }
        if let Some(key) = lookup("TLS_KEY_FILE") {
            self.key_file = PathBuf::from(key);
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scheme(&self) -> &'static str {
        if self.enable_https { "https" } else { "http" }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            token_expiry: self.token_expiry,
            sweep_interval: self.sweep_interval,
            token_bytes: self.token_bytes,
        }
    }
}

/// Read a YAML config file. Validation runs once the full layering is done.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(serde_yaml::from_str(&contents)?)
}

/// Load configuration from the process environment.
///
/// Layering: defaults < YAML file < command-line flags < environment.
pub fn load_config_with_fallback(args: &Args) -> Result<AppConfig, ConfigError> {
    let config = resolve_config(args, |key| std::env::var(key).ok())?;

    info!(
        "Configuration: listen {}://{}, STUN {}, token expiry {:?}, sweep every {:?}",
        config.scheme(),
        config.bind_addr(),
        config.stun_server,
        config.token_expiry,
        config.sweep_interval
    );

    Ok(config)
}

fn resolve_config<F>(args: &Args, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => find_config_file(&lookup)?.unwrap_or_default(),
    };

    config.apply_args(args);
    config.apply_env(lookup);
    config.validate()?;

    Ok(config)
}

fn find_config_file<F>(lookup: &F) -> Result<Option<AppConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(config_path) = lookup("CONFIG_PATH").filter(|v| !v.is_empty()) {
        return load_config(config_path).map(Some);
    }

    for path in ["config.yaml", "config.yml"] {
        if Path::new(path).exists() {
            return load_config(path).map(Some);
        }
    }

    info!("No configuration file found, using defaults and environment");
    Ok(None)
}

/// Parse a duration such as `30m`, `1h30m`, `45s` or `500ms`
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(input.trim()).map_err(|source| ConfigError::InvalidDuration {
        input: input.to_string(),
        source,
    })
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}
