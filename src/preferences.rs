//! TTL-bounded memo of browser and driver versions.
//!
//! Two kinds of keys are stored: the browser family (`chrome`) mapping to the installed
//! browser version, and the family plus that version (`chrome79`) mapping to the driver
//! version resolved for it. Entries expire lazily on the next read once their time to live
//! has elapsed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::WebDriverError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Preference {
    value: String,
    /// Unix seconds; `0` means the entry never became valid.
    #[serde(default)]
    expires_at: u64,
}

#[derive(Debug)]
pub struct PreferenceStore {
    entries: BTreeMap<String, Preference>,
    ttl: u64,
    path: Option<PathBuf>,
}

impl PreferenceStore {
    /// Creates a store that lives only as long as the value.
    pub fn in_memory(ttl: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            ttl,
            path: None,
        }
    }

    /// Opens a store persisted as JSON at `path`. A missing or unreadable file starts empty.
    pub fn open(path: &Path, ttl: u64) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt preferences file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        debug!("Loaded {} preferences from {}", entries.len(), path.display());
        Self {
            entries,
            ttl,
            path: Some(path.to_path_buf()),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        if !self.check_validity(key) {
            return None;
        }
        self.entries.get(key).map(|p| p.value.clone())
    }

    /// Stores `value` unless a valid entry already exists for `key`.
    pub fn put_if_absent(&mut self, key: &str, value: &str) -> Result<(), WebDriverError> {
        if self.check_validity(key) {
            return Ok(());
        }
        let expires_at = now().saturating_add(self.ttl);
        trace!("Storing preference {}={} (expires at {})", key, value, expires_at);
        self.entries.insert(
            key.to_string(),
            Preference {
                value: value.to_string(),
                expires_at,
            },
        );
        self.persist()
    }

    /// Returns whether `key` holds a live entry, purging it when expired.
    pub fn check_validity(&mut self, key: &str) -> bool {
        let Some(preference) = self.entries.get(key) else {
            return false;
        };
        if preference.expires_at == 0 || now() >= preference.expires_at {
            debug!("Preference {}={} expired", key, preference.value);
            self.entries.remove(key);
            if let Err(e) = self.persist() {
                warn!("Could not persist expired preference removal: {}", e);
            }
            return false;
        }
        true
    }

    pub fn clear(&mut self) -> Result<(), WebDriverError> {
        debug!("Clearing {} preferences", self.entries.len());
        self.entries.clear();
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<(), WebDriverError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WebDriverError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            WebDriverError::JsonParseError {
                url: path.display().to_string(),
                source: e,
            }
        })?;
        std::fs::write(path, json).map_err(|e| WebDriverError::io(path, e))
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_value() {
        let mut store = PreferenceStore::in_memory(3600);
        store.put_if_absent("chrome", "79").unwrap();
        assert_eq!(store.get("chrome").as_deref(), Some("79"));
    }

    #[test]
    fn put_if_absent_keeps_first_value() {
        let mut store = PreferenceStore::in_memory(3600);
        store.put_if_absent("chrome79", "79.0.3945.36").unwrap();
        store.put_if_absent("chrome79", "79.0.3945.16").unwrap();
        assert_eq!(store.get("chrome79").as_deref(), Some("79.0.3945.36"));
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let mut store = PreferenceStore::in_memory(0);
        store.put_if_absent("firefox", "70").unwrap();
        assert!(!store.check_validity("firefox"));
        assert_eq!(store.get("firefox"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn zero_expiry_is_treated_as_absent() {
        let mut store = PreferenceStore::in_memory(3600);
        store.entries.insert(
            "edge".to_string(),
            Preference {
                value: "79".to_string(),
                expires_at: 0,
            },
        );
        assert_eq!(store.get("edge"), None);
    }

    #[test]
    fn clear_drops_everything() {
        let mut store = PreferenceStore::in_memory(3600);
        store.put_if_absent("chrome", "79").unwrap();
        store.put_if_absent("firefox", "70").unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn persisted_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let mut store = PreferenceStore::open(&path, 3600);
        store.put_if_absent("opera", "66").unwrap();

        let mut reopened = PreferenceStore::open(&path, 3600);
        assert_eq!(reopened.get("opera").as_deref(), Some("66"));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "not json").unwrap();

        let store = PreferenceStore::open(&path, 3600);
        assert!(store.is_empty());
    }
}
