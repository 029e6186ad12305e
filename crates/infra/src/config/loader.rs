//! Configuration loader
//!
//! Loads the login configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. Validates the result (absolute endpoint URLs, redirect port and path)
//!
//! ## Environment Variables
//! Required:
//! - `GEOPORTAL_CLIENT_ID`: OAuth client ID
//! - `GEOPORTAL_AUTH_URL`: Authorization endpoint
//! - `GEOPORTAL_TOKEN_URL`: Token endpoint
//! - `GEOPORTAL_API_KEY_URL`: Catalog API key endpoint
//!
//! Optional:
//! - `GEOPORTAL_SCOPE`: Space-separated scopes
//! - `GEOPORTAL_REDIRECT_PORT`: Loopback port (default 8989)
//! - `GEOPORTAL_REDIRECT_PATH`: Loopback path (default `/`)
//! - `GEOPORTAL_SUCCESS_URL`: Page to redirect the browser to after success
//! - `GEOPORTAL_CREDENTIAL_BACKEND`: `auto`, `keychain` or `settings`
//! - `GEOPORTAL_SETTINGS_PATH`: Settings file for the plaintext backend
//! - `GEOPORTAL_HTTP_TIMEOUT`: Request timeout in seconds
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./geoportal.toml` or `./geoportal.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use geoportal_domain::config::CredentialBackend;
use geoportal_domain::{AuthError, LoginConfig, Result};
use url::Url;

const CONFIG_FILE_NAMES: [&str; 4] = ["geoportal.toml", "geoportal.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `AuthError::InvalidConfig` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Validation fails
pub fn load() -> Result<LoginConfig> {
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

/// Load configuration from environment variables
///
/// # Errors
/// Returns `AuthError::InvalidConfig` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<LoginConfig> {
    let mut config = LoginConfig::new(
        env_var("GEOPORTAL_CLIENT_ID")?,
        env_var("GEOPORTAL_AUTH_URL")?,
        env_var("GEOPORTAL_TOKEN_URL")?,
        env_var("GEOPORTAL_API_KEY_URL")?,
    );

    if let Some(scope) = env_opt("GEOPORTAL_SCOPE") {
        config.scope = scope;
    }
    if let Some(port) = env_opt("GEOPORTAL_REDIRECT_PORT") {
        config.redirect.port = port
            .parse::<u16>()
            .map_err(|e| AuthError::config(format!("Invalid redirect port: {e}")))?;
    }
    if let Some(path) = env_opt("GEOPORTAL_REDIRECT_PATH") {
        config.redirect.path = path;
    }
    config.redirect.success_url = env_opt("GEOPORTAL_SUCCESS_URL");
    if let Some(backend) = env_opt("GEOPORTAL_CREDENTIAL_BACKEND") {
        config.storage.backend = backend.parse::<CredentialBackend>().map_err(AuthError::config)?;
    }
    config.storage.settings_path = env_opt("GEOPORTAL_SETTINGS_PATH").map(PathBuf::from);
    if let Some(timeout) = env_opt("GEOPORTAL_HTTP_TIMEOUT") {
        config.http_timeout_seconds = timeout
            .parse::<u64>()
            .map_err(|e| AuthError::config(format!("Invalid HTTP timeout: {e}")))?;
    }

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`discover_config_paths`].
///
/// # Errors
/// Returns `AuthError::InvalidConfig` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<LoginConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthError::config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => discover_config_paths().ok_or_else(|| {
            AuthError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthError::config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Check semantic constraints serde cannot express
///
/// # Errors
/// Returns `AuthError::InvalidConfig` describing the first violation.
pub fn validate(config: &LoginConfig) -> Result<()> {
    if config.client_id.trim().is_empty() {
        return Err(AuthError::config("client_id must not be empty"));
    }

    for (name, value) in [
        ("authorization_url", &config.authorization_url),
        ("token_url", &config.token_url),
        ("api_key_url", &config.api_key_url),
    ] {
        require_http_url(name, value)?;
    }
    if let Some(success_url) = &config.redirect.success_url {
        require_http_url("redirect.success_url", success_url)?;
    }

    if config.redirect.port == 0 {
        return Err(AuthError::config("redirect.port must be non-zero"));
    }
    if !config.redirect.path.starts_with('/') {
        return Err(AuthError::config("redirect.path must start with `/`"));
    }

    Ok(())
}

fn require_http_url(name: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| AuthError::config(format!("{name} is not an absolute URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AuthError::config(format!("{name} must use http or https, got `{other}`"))),
    }
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<LoginConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthError::config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthError::config(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn discover_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| AuthError::config(format!("Missing required environment variable: {key}")))
}

/// Optional environment variable; empty values count as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
