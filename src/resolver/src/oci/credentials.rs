//! Registry credential store.
//!
//! Credentials saved by `a3s-pin login` live at `~/.a3s/pin/credentials.json`
//! and are looked up by registry host when resolving digests. Writes go
//! through a temporary file followed by a rename.

use std::collections::BTreeMap;
use std::path::PathBuf;

use a3s_pin_core::error::{PinError, Result};
use serde::{Deserialize, Serialize};

use super::reference::normalize_registry;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialEntry {
    username: String,
    password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    registries: BTreeMap<String, CredentialEntry>,
}

/// Per-registry username/password store backed by a JSON file.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Credential store at `~/.a3s/pin/credentials.json`.
    pub fn default_path() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            PinError::CredentialError(
                "Cannot locate home directory for ~/.a3s/pin/credentials.json".to_string(),
            )
        })?;
        Ok(Self {
            path: home.join(".a3s").join("pin").join("credentials.json"),
        })
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Save credentials for a registry, replacing any previous entry.
    pub fn store(&self, registry: &str, username: &str, password: &str) -> Result<()> {
        let mut file = self.load()?;
        file.registries.insert(
            normalize_registry(registry),
            CredentialEntry {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
        self.save(&file)
    }

    /// Look up `(username, password)` for a registry.
    pub fn get(&self, registry: &str) -> Result<Option<(String, String)>> {
        let file = self.load()?;
        Ok(file
            .registries
            .get(&normalize_registry(registry))
            .map(|e| (e.username.clone(), e.password.clone())))
    }

    /// Forget a registry. Returns whether an entry existed.
    pub fn remove(&self, registry: &str) -> Result<bool> {
        let mut file = self.load()?;
        let removed = file
            .registries
            .remove(&normalize_registry(registry))
            .is_some();
        if removed {
            self.save(&file)?;
        }
        Ok(removed)
    }

    /// Registries with saved credentials, sorted.
    pub fn list_registries(&self) -> Result<Vec<String>> {
        Ok(self.load()?.registries.into_keys().collect())
    }

    fn load(&self) -> Result<CredentialFile> {
        if !self.path.exists() {
            return Ok(CredentialFile::default());
        }
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            PinError::CredentialError(format!(
                "Cannot read registry credentials from {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            PinError::CredentialError(format!(
                "Registry credentials in {} are not valid JSON (re-run `a3s-pin login`): {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, file: &CredentialFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, serde_json::to_string_pretty(file)?).map_err(|e| {
            PinError::CredentialError(format!(
                "Cannot save registry credentials to {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            PinError::CredentialError(format!(
                "Cannot move saved credentials into {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("auth").join("credentials.json"))
    }

    #[test]
    fn test_store_and_get() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.store("ghcr.io", "user1", "pass1").unwrap();
        assert_eq!(
            store.get("ghcr.io").unwrap(),
            Some(("user1".to_string(), "pass1".to_string()))
        );
    }

    #[test]
    fn test_get_without_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(test_store(&dir).get("ghcr.io").unwrap(), None);
    }

    #[test]
    fn test_overwrite_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.store("quay.io", "a", "1").unwrap();
        store.store("quay.io", "b", "2").unwrap();
        assert_eq!(
            store.get("quay.io").unwrap(),
            Some(("b".to_string(), "2".to_string()))
        );

        assert!(store.remove("quay.io").unwrap());
        assert!(!store.remove("quay.io").unwrap());
        assert_eq!(store.get("quay.io").unwrap(), None);
    }

    #[test]
    fn test_docker_hub_aliases_share_entry() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.store("docker.io", "user", "pass").unwrap();
        let expected = Some(("user".to_string(), "pass".to_string()));
        assert_eq!(store.get("index.docker.io").unwrap(), expected);
        assert_eq!(store.get("registry-1.docker.io").unwrap(), expected);
        assert_eq!(store.list_registries().unwrap(), vec!["index.docker.io"]);
    }

    #[test]
    fn test_list_sorted() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.store("quay.io", "u2", "p2").unwrap();
        store.store("ghcr.io", "u1", "p1").unwrap();
        assert_eq!(store.list_registries().unwrap(), vec!["ghcr.io", "quay.io"]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let store = CredentialStore::new(path);
        match store.get("ghcr.io") {
            Err(PinError::CredentialError(msg)) => assert!(msg.contains("a3s-pin login")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
