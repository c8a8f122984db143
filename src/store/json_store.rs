//! JSON file store: `{"mac": "AA:BB:CC:DD:EE:FF"}`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::PersistenceStore;
use crate::domain::MacAddress;
use crate::error::{MacError, MacResult};

#[derive(Debug, Serialize, Deserialize)]
struct SavedRecord {
    mac: String,
}

/// Stores the last applied address in a small JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, source: std::io::Error) -> MacError {
        MacError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

impl PersistenceStore for JsonFileStore {
    fn load(&self) -> Option<MacAddress> {
        if !self.path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read saved MAC from {:?}: {}", self.path, e);
                return None;
            }
        };

        let record: SavedRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring malformed saved MAC file {:?}: {}", self.path, e);
                return None;
            }
        };

        match MacAddress::normalize(&record.mac) {
            Ok(mac) => Some(mac),
            Err(e) => {
                warn!("Ignoring saved MAC in {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn save(&self, mac: MacAddress) -> MacResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persistence_error(e))?;
        }

        let record = SavedRecord {
            mac: mac.to_string(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| self.persistence_error(std::io::Error::other(e)))?;

        // Write a sibling file and rename it over the old one
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(|e| self.persistence_error(e))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| self.persistence_error(e))?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(|e| self.persistence_error(e))?;

        debug!("Saved {} to {:?}", mac, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_load_missing_file() {
        let dir = setup_test_dir();
        let store = JsonFileStore::new(dir.path().join("saved_mac.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = setup_test_dir();
        let path = dir.path().join("saved_mac.json");
        let mac = MacAddress::normalize("02:11:22:33:44:55").unwrap();

        JsonFileStore::new(&path).save(mac).unwrap();

        // a fresh store sees the same value
        assert_eq!(JsonFileStore::new(&path).load(), Some(mac));
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, r#"{"mac":"02:11:22:33:44:55"}"#);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = setup_test_dir();
        let path = dir.path().join("nested").join("deeper").join("saved_mac.json");
        let mac = MacAddress::normalize("02:11:22:33:44:55").unwrap();
        JsonFileStore::new(&path).save(mac).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = setup_test_dir();
        let store = JsonFileStore::new(dir.path().join("saved_mac.json"));
        let first = MacAddress::normalize("02:00:00:00:00:01").unwrap();
        let second = MacAddress::normalize("02:00:00:00:00:02").unwrap();
        store.save(first).unwrap();
        store.save(second).unwrap();
        assert_eq!(store.load(), Some(second));
    }

    #[test]
    fn test_load_accepts_original_format() {
        // files written by older versions use spaces and hyphens
        let dir = setup_test_dir();
        let path = dir.path().join("saved_mac.json");
        fs::write(&path, r#"{"mac": "98-8d-46-fb-64-45"}"#).unwrap();
        assert_eq!(
            JsonFileStore::new(&path).load().map(|m| m.to_string()),
            Some("98:8D:46:FB:64:45".to_string())
        );
    }

    #[test]
    fn test_load_malformed() {
        let dir = setup_test_dir();
        let path = dir.path().join("saved_mac.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(JsonFileStore::new(&path).load(), None);

        fs::write(&path, r#"{"mac": "12:34"}"#).unwrap();
        assert_eq!(JsonFileStore::new(&path).load(), None);

        fs::write(&path, r#"{"other": 1}"#).unwrap();
        assert_eq!(JsonFileStore::new(&path).load(), None);
    }

    #[test]
    fn test_save_into_unwritable_location() {
        let dir = setup_test_dir();
        // parent is a regular file, so the directory can't be created
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let store = JsonFileStore::new(blocker.join("saved_mac.json"));
        let mac = MacAddress::normalize("02:00:00:00:00:01").unwrap();
        assert!(matches!(store.save(mac), Err(MacError::Persistence { .. })));
    }
}
