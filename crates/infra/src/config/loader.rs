//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file from the working directory, if present
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file
//! 4. Searches several paths for a config file
//! 5. Supports JSON and TOML formats
//!
//! Whatever the source, the result is validated before it is returned.
//!
//! ## Environment Variables
//! - `ACCOUNTLINK_DATACENTER`: Datacenter name (required)
//! - `ACCOUNTLINK_HOST`: Datacenter base URL (required)
//! - `ACCOUNTLINK_ACCOUNT_CODE`: Account code (required)
//! - `ACCOUNTLINK_EMAIL` / `ACCOUNTLINK_PASSWORD`: API user credentials
//! - `ACCOUNTLINK_AUTH_TOKEN`: Preauthenticated token
//! - `ACCOUNTLINK_HTTP_TIMEOUT_MS`: Request timeout in milliseconds
//! - `ACCOUNTLINK_CONNECT_TIMEOUT_MS`: Connect timeout in milliseconds
//! - `ACCOUNTLINK_CONNECT_RETRIES`: Extra attempts after a connect failure
//! - `ACCOUNTLINK_USER_AGENT`: User agent header
//! - `ACCOUNTLINK_AUTH_LOCK_WAIT_MS`: Wait on an authentication in flight
//! - `ACCOUNTLINK_AUTH_RETRY_INTERVAL_MS`: Backoff after a failed authentication
//! - `ACCOUNTLINK_EXPIRED_TOKEN_STRATEGY`: `reauthenticate` or `fail`
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./accountlink.toml` or `./accountlink.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent directory
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use accountlink_domain::{
    AccountConfig, AccountLinkError, Config, ExpiredTokenStrategy, HttpConfig, Result, SessionConfig,
};

const CANDIDATE_NAMES: [&str; 4] = ["accountlink.toml", "accountlink.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after reading any
/// `.env` file). If a required variable is missing, falls back to loading
/// from a config file.
///
/// # Errors
/// Returns `AccountLinkError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `ACCOUNTLINK_*` environment variables
///
/// # Errors
/// Returns `AccountLinkError::Config` if required variables are missing,
/// a value cannot be parsed, or validation fails.
pub fn load_from_env() -> Result<Config> {
    let account = AccountConfig {
        datacenter: env_var("ACCOUNTLINK_DATACENTER")?,
        host: env_var("ACCOUNTLINK_HOST")?,
        account_code: env_var("ACCOUNTLINK_ACCOUNT_CODE")?,
        email: env_opt("ACCOUNTLINK_EMAIL"),
        password: env_opt("ACCOUNTLINK_PASSWORD"),
        auth_token: env_opt("ACCOUNTLINK_AUTH_TOKEN"),
    };

    let defaults = HttpConfig::default();
    let http = HttpConfig {
        timeout: env_millis("ACCOUNTLINK_HTTP_TIMEOUT_MS")?.unwrap_or(defaults.timeout),
        connect_timeout: env_millis("ACCOUNTLINK_CONNECT_TIMEOUT_MS")?.unwrap_or(defaults.connect_timeout),
        connect_retries: env_parse("ACCOUNTLINK_CONNECT_RETRIES")?.unwrap_or(defaults.connect_retries),
        user_agent: env_opt("ACCOUNTLINK_USER_AGENT"),
    };

    let defaults = SessionConfig::default();
    let session = SessionConfig {
        auth_lock_wait: env_millis("ACCOUNTLINK_AUTH_LOCK_WAIT_MS")?.unwrap_or(defaults.auth_lock_wait),
        auth_retry_interval: env_millis("ACCOUNTLINK_AUTH_RETRY_INTERVAL_MS")?
            .unwrap_or(defaults.auth_retry_interval),
        expired_token_strategy: env_opt("ACCOUNTLINK_EXPIRED_TOKEN_STRATEGY")
            .map(|value| ExpiredTokenStrategy::from_str(&value).map_err(AccountLinkError::Config))
            .transpose()?
            .unwrap_or(defaults.expired_token_strategy),
    };

    let config = Config { account, http, session };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations for a config file.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `AccountLinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AccountLinkError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            AccountLinkError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AccountLinkError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AccountLinkError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AccountLinkError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(AccountLinkError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_file() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
            roots.push(exe_dir.join(".."));
        }
    }

    roots
        .iter()
        .flat_map(|root| CANDIDATE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    env_opt(key)
        .ok_or_else(|| AccountLinkError::Config(format!("Missing required environment variable: {key}")))
}

/// Get optional environment variable; blank counts as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| AccountLinkError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

fn env_millis(key: &str) -> Result<Option<Duration>> {
    Ok(env_parse::<u64>(key)?.map(Duration::from_millis))
}
