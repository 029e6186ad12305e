//! Login constants
//!
//! Defaults for the identity provider, the loopback redirect, and the API key
//! issued by the catalog service.

// Loopback redirect
pub const DEFAULT_REDIRECT_PORT: u16 = 8989;
pub const DEFAULT_REDIRECT_PATH: &str = "/";
pub const LOOPBACK_HOST: &str = "127.0.0.1";

// Identity provider
pub const DEFAULT_SCOPE: &str = "openid profile offline_access";
pub const RESPONSE_TYPE: &str = "code";
pub const RESPONSE_MODE: &str = "query";
pub const CODE_CHALLENGE_METHOD: &str = "S256";

// API key issued by the catalog service
pub const DEFAULT_API_KEY_SCOPE: &str = "catalog:read";
pub const DEFAULT_API_KEY_NAME: &str = "geoportal-desktop";
pub const DEFAULT_API_KEY_SITE: &str = "*";

// Credential storage
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "Geoportal.catalog";
pub const DEFAULT_KEYCHAIN_ACCOUNT: &str = "default";
pub const SETTINGS_FILE_NAME: &str = "credentials.toml";
pub const APP_DIR_NAME: &str = "geoportal";

// HTTP
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
