//! Credential store selection

use std::path::PathBuf;
use std::sync::Arc;

use geoportal_domain::config::{CredentialBackend, StorageConfig};
use geoportal_domain::constants::{APP_DIR_NAME, SETTINGS_FILE_NAME};
use geoportal_domain::{AuthError, Result};
use tracing::info;

use super::keychain::KeychainCredentialStore;
use super::settings::SettingsCredentialStore;
use super::traits::CredentialStore;

/// Default settings file: `{config_dir}/geoportal/credentials.toml`
///
/// # Errors
/// Returns `InvalidConfig` if the platform has no user config directory.
pub fn default_settings_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
        .ok_or_else(|| AuthError::config("no user configuration directory on this platform"))
}

/// Backend that `Auto` resolves to on the current target: the settings file
/// on macOS, the platform keychain everywhere else
#[must_use]
pub const fn platform_default_backend() -> CredentialBackend {
    if cfg!(target_os = "macos") {
        CredentialBackend::Settings
    } else {
        CredentialBackend::Keychain
    }
}

/// Build the credential store described by `config`
///
/// # Errors
/// Returns `InvalidConfig` if the settings backend is selected without an
/// explicit path on a platform with no config directory.
pub fn select_credential_store(config: &StorageConfig) -> Result<Arc<dyn CredentialStore>> {
    let backend = match config.backend {
        CredentialBackend::Auto => platform_default_backend(),
        explicit => explicit,
    };

    let store: Arc<dyn CredentialStore> = match backend {
        CredentialBackend::Settings => {
            let path = match &config.settings_path {
                Some(path) => path.clone(),
                None => default_settings_path()?,
            };
            info!(path = %path.display(), "Using plaintext settings credential store");
            Arc::new(SettingsCredentialStore::new(path))
        }
        CredentialBackend::Keychain | CredentialBackend::Auto => {
            info!(service = %config.keychain_service, "Using keychain credential store");
            Arc::new(KeychainCredentialStore::from_config(config))
        }
    };

    Ok(store)
}
