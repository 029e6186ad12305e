//! Integration tests for credential stores
//!
//! Exercises both `CredentialStore` implementations through the trait object
//! returned by `select_credential_store`, plus concurrent writers.

#![cfg(all(feature = "platform", feature = "test-utils"))]

use std::sync::Arc;
use std::thread;

use geoportal_common::auth::{
    select_credential_store, CredentialStore, KeychainCredentialStore, SettingsCredentialStore,
};
use geoportal_common::testing::MockSecretStore;
use geoportal_domain::config::{CredentialBackend, StorageConfig};
use geoportal_domain::{Credential, StoreSecurity};
use tempfile::TempDir;

fn both_stores(dir: &TempDir) -> Vec<Arc<dyn CredentialStore>> {
    vec![
        Arc::new(KeychainCredentialStore::new(Arc::new(MockSecretStore::new()), "default")),
        Arc::new(SettingsCredentialStore::new(dir.path().join("credentials.toml"))),
    ]
}

/// Validates the shared `CredentialStore` contract for both backends.
///
/// # Test Steps
/// 1. Load from an empty store -> `None`
/// 2. Save, then load -> identical credential
/// 3. Clear twice -> `None`, no error
#[test]
fn test_store_contract_for_all_backends() {
    let dir = TempDir::new().unwrap();
    for store in both_stores(&dir) {
        let credential = Credential::new("catalog-key", Some("refresh-token".into()));

        assert_eq!(store.load().unwrap(), None);
        store.save(&credential).unwrap();
        assert_eq!(store.load().unwrap(), Some(credential));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}

/// Validates that concurrent writers serialize and the file is never left
/// half-written.
///
/// # Test Steps
/// 1. Spawn several threads saving distinct credentials
/// 2. Load afterwards
/// 3. Verify the result is exactly one of the written credentials
#[test]
fn test_concurrent_saves_last_writer_wins() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SettingsCredentialStore::new(dir.path().join("credentials.toml")));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.save(&Credential::new(format!("key-{i}"), Some(format!("refresh-{i}"))))
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let loaded = store.load().unwrap().unwrap();
    let index = loaded.api_key.trim_start_matches("key-").to_string();
    assert_eq!(loaded.refresh_token, Some(format!("refresh-{index}")));
}

/// Validates that the selected store reports its security capability so the
/// caller can surface plaintext storage to the user.
#[test]
fn test_selected_store_reports_security() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig {
        backend: CredentialBackend::Settings,
        settings_path: Some(dir.path().join("geoportal").join("credentials.toml")),
        ..StorageConfig::default()
    };

    let store = select_credential_store(&config).unwrap();
    assert_eq!(store.security(), StoreSecurity::PlaintextSettings);

    store.save(&Credential::new("catalog-key", None)).unwrap();
    assert!(dir.path().join("geoportal").join("credentials.toml").exists());
}
