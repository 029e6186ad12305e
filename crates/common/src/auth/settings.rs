//! Plaintext settings-file credential store
//!
//! Fallback for platforms where the OS secret manager is unavailable or
//! unreliable for unsigned builds. The credential lives in a `[credential]`
//! table of an app-scoped TOML file; other tables in the same file are
//! preserved across writes.
//!
//! The file is created with `0600` permissions on unix and replaced
//! atomically (write to a sibling temp file, then rename).

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use geoportal_domain::{AuthError, Credential, Result, StoreSecurity};
use parking_lot::Mutex;
use tracing::debug;

use crate::auth::traits::CredentialStore;

const CREDENTIAL_TABLE: &str = "credential";

/// [`CredentialStore`] backed by a plaintext TOML settings file
#[derive(Debug)]
pub struct SettingsCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SettingsCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Location of the settings file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<Option<toml::Table>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        contents.parse::<toml::Table>().map(Some).map_err(|e| {
            AuthError::storage(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    fn write_table(&self, table: &toml::Table) -> Result<()> {
        let rendered = toml::to_string(table)
            .map_err(|e| AuthError::storage(format!("failed to encode settings: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let tmp_path = self.path.with_extension("toml.tmp");
        write_private(&tmp_path, rendered.as_bytes()).map_err(|e| {
            AuthError::storage(format!("failed to write {}: {e}", tmp_path.display()))
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            AuthError::storage(format!("failed to replace {}: {e}", self.path.display()))
        })
    }
}

impl CredentialStore for SettingsCredentialStore {
    fn security(&self) -> StoreSecurity {
        StoreSecurity::PlaintextSettings
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let _guard = self.write_lock.lock();
        debug!(path = %self.path.display(), "Storing credential in settings file");

        let mut table = self.read_table()?.unwrap_or_default();
        let value = toml::Value::try_from(credential)
            .map_err(|e| AuthError::storage(format!("failed to encode credential: {e}")))?;
        table.insert(CREDENTIAL_TABLE.to_string(), value);

        self.write_table(&table)
    }

    fn load(&self) -> Result<Option<Credential>> {
        let Some(mut table) = self.read_table()? else {
            return Ok(None);
        };
        let Some(value) = table.remove(CREDENTIAL_TABLE) else {
            return Ok(None);
        };

        value.try_into::<Credential>().map(Some).map_err(|e| {
            AuthError::storage(format!("invalid credential in {}: {e}", self.path.display()))
        })
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        debug!(path = %self.path.display(), "Removing credential from settings file");

        let Some(mut table) = self.read_table()? else {
            return Ok(());
        };
        if table.remove(CREDENTIAL_TABLE).is_none() {
            return Ok(());
        }

        if table.is_empty() {
            match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AuthError::storage(format!(
                    "failed to remove {}: {e}",
                    self.path.display()
                ))),
            }
        } else {
            self.write_table(&table)
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file =
        fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    // `mode` only applies on creation; tighten a pre-existing temp file too
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
