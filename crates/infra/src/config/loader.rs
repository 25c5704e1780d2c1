//! Configuration loader
//!
//! Loads [`KeyturnConfig`] from environment variables or a TOML file.
//!
//! ## Loading Strategy
//! 1. If `KEYTURN_STORAGE_BACKEND` is set, the environment is authoritative
//!    and unset variables take their defaults
//! 2. Otherwise the first config file found by [`probe_config_paths`] is used
//! 3. With neither, the defaults apply
//!
//! ## Environment Variables
//! - `KEYTURN_ALGORITHM`: cipher family (`AES`, `XChaCha20`)
//! - `KEYTURN_KEY_SIZE`: key size in bits
//! - `KEYTURN_KEY_LIFETIME_SECS`: key lifetime in seconds
//! - `KEYTURN_CACHE_TTL_SECS`: engine cache TTL in seconds
//! - `KEYTURN_CACHE_MAX_ENTRIES`: engine cache capacity
//! - `KEYTURN_STORAGE_BACKEND`: `memory` or `filesystem`
//! - `KEYTURN_STORAGE_ROOT`: root directory for the filesystem backend
//! - `KEYTURN_MASTER_KEY_ENV`: name of the variable holding the master key
//! - `KEYTURN_LOG_LEVEL`: default log filter
//! - `KEYTURN_LOG_JSON`: JSON log output (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./keyturn.toml`
//! 2. `./config/keyturn.toml`
//! 3. `../keyturn.toml`

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use keyturn_common::error::CommonError;

use super::{KeyturnConfig, StorageBackend};
use crate::errors::Result;

/// Variable whose presence selects environment configuration
pub const BACKEND_ENV: &str = "KEYTURN_STORAGE_BACKEND";

/// Load configuration with automatic fallback strategy
///
/// The result is validated before it is returned.
///
/// # Errors
/// Returns `InfraError` if the chosen source is malformed or the resulting
/// configuration fails [`KeyturnConfig::validate`].
pub fn load() -> Result<KeyturnConfig> {
    let config = if std::env::var_os(BACKEND_ENV).is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        config
    } else if let Some(path) = probe_config_paths() {
        load_from_file(&path)?
    } else {
        tracing::info!("No configuration found, using defaults");
        KeyturnConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from the process environment
///
/// # Errors
/// Returns `InfraError::Common` if a variable has an invalid value.
pub fn load_from_env() -> Result<KeyturnConfig> {
    load_from_lookup(|name| std::env::var(name).ok())
}

/// Load configuration from variables resolved by `lookup`
///
/// Unset variables keep their default values.
pub fn load_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<KeyturnConfig> {
    let mut config = KeyturnConfig::default();

    if let Some(algorithm) = lookup("KEYTURN_ALGORITHM") {
        config.policy.algorithm = algorithm;
    }
    if let Some(size) = parse_var(&lookup, "KEYTURN_KEY_SIZE")? {
        config.policy.key_size = size;
    }
    if let Some(secs) = parse_var(&lookup, "KEYTURN_KEY_LIFETIME_SECS")? {
        config.policy.key_lifetime = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_var(&lookup, "KEYTURN_CACHE_TTL_SECS")? {
        config.cache.ttl = Duration::from_secs(secs);
    }
    if let Some(entries) = parse_var(&lookup, "KEYTURN_CACHE_MAX_ENTRIES")? {
        config.cache.max_entries = entries;
    }
    if let Some(backend) = lookup(BACKEND_ENV) {
        config.storage.backend = StorageBackend::from_str(&backend)?;
    }
    if let Some(root) = lookup("KEYTURN_STORAGE_ROOT") {
        config.storage.root = PathBuf::from(root);
    }
    if let Some(name) = lookup("KEYTURN_MASTER_KEY_ENV") {
        config.master_key_env = name;
    }
    if let Some(level) = lookup("KEYTURN_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("KEYTURN_LOG_JSON") {
        config.logging.json = parse_bool("KEYTURN_LOG_JSON", &json)?;
    }

    Ok(config)
}

/// Load configuration from a TOML file
///
/// # Errors
/// Returns `InfraError` if the file cannot be read or is not valid TOML.
pub fn load_from_file(path: &Path) -> Result<KeyturnConfig> {
    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path).map_err(|e| {
        CommonError::config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Probe the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let candidates =
        [cwd.join("keyturn.toml"), cwd.join("config/keyturn.toml"), cwd.join("../keyturn.toml")];

    candidates.into_iter().find(|candidate| {
        let found = candidate.is_file();
        if !found {
            tracing::trace!(path = %candidate.display(), "Config file not found");
        }
        found
    })
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| CommonError::config_field(name, format!("Invalid value '{raw}': {e}")))
        })
        .transpose()
        .map_err(Into::into)
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CommonError::config_field(name, format!("Invalid boolean '{raw}'")).into()),
    }
}
