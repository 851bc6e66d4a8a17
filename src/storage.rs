//! Best-effort key/value storage. Every backend swallows its own failures.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Storage capability used for the sticky base and the tokens.
///
/// Implementations never fail: a broken backend behaves like an empty one and
/// logs what went wrong.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-lifetime storage.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

/// A flat JSON object on disk, rewritten on every change.
pub struct JsonFileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStorage {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read_all(&self) -> HashMap<String, String> {
        if !self.path.exists() {
            return HashMap::new();
        }
        match std::fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed store {}: {}", self.path.display(), e);
                HashMap::new()
            }),
            Err(e) => {
                log::warn!("Cannot read store {}: {}", self.path.display(), e);
                HashMap::new()
            }
        }
    }

    fn update(&self, change: impl FnOnce(&mut HashMap<String, String>)) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut all = self.read_all();
        change(&mut all);
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let text = serde_json::to_string_pretty(&all).unwrap_or_else(|_| "{}".to_string());
        if let Err(e) = std::fs::write(&self.path, text) {
            log::warn!("Cannot write store {}: {}", self.path.display(), e);
        }
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) {
        self.update(|all| {
            all.insert(key.to_string(), value.to_string());
        });
    }

    fn remove(&self, key: &str) {
        self.update(|all| {
            all.remove(key);
        });
    }
}

/// A missing or empty entry reads as `None`; any other keyring error is logged.
fn stored_secret(key: &str, read: keyring::Result<String>) -> Option<String> {
    match read {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) | Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            log::warn!("Keyring read for {} failed: {}", key, e);
            None
        }
    }
}

/// OS keyring, one entry per key under a fixed service name.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        KeyringStorage { service: service.into() }
    }
}

impl Storage for KeyringStorage {
    fn get(&self, key: &str) -> Option<String> {
        stored_secret(
            key,
            keyring::Entry::new(&self.service, key).and_then(|e| e.get_password()),
        )
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = keyring::Entry::new(&self.service, key).and_then(|e| e.set_password(value)) {
            log::warn!("Keyring write for {} failed: {}", key, e);
        }
    }

    fn remove(&self, key: &str) {
        match keyring::Entry::new(&self.service, key).and_then(|e| e.delete_password()) {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => log::warn!("Keyring delete for {} failed: {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trip() {
        let s = MemoryStorage::new();
        assert_eq!(s.get("k"), None);
        s.set("k", "v");
        assert_eq!(s.get("k").as_deref(), Some("v"));
        s.remove("k");
        s.remove("k");
        assert_eq!(s.get("k"), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        JsonFileStorage::new(&path).set("authToken_local", "abc");
        let reopened = JsonFileStorage::new(&path);
        assert_eq!(reopened.get("authToken_local").as_deref(), Some("abc"));
        reopened.remove("authToken_local");
        assert_eq!(JsonFileStorage::new(&path).get("authToken_local"), None);
    }

    #[test]
    fn malformed_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        let s = JsonFileStorage::new(&path);
        assert_eq!(s.get("apiBase"), None);
        s.set("apiBase", "prod");
        assert_eq!(s.get("apiBase").as_deref(), Some("prod"));
    }

    #[test]
    fn keyring_read_failures_read_as_missing() {
        assert_eq!(stored_secret("authToken_prod", Ok("jwt".into())).as_deref(), Some("jwt"));
        assert_eq!(stored_secret("authToken_prod", Ok(String::new())), None);
        assert_eq!(stored_secret("authToken_prod", Err(keyring::Error::NoEntry)), None);
        let locked = keyring::Error::Invalid("service".into(), "locked".into());
        assert_eq!(stored_secret("authToken_prod", Err(locked)), None);
    }

    #[test]
    fn unwritable_location_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail.
        let path = dir.path().join("blocked");
        std::fs::create_dir_all(&path).unwrap();
        let s = JsonFileStorage::new(&path);
        s.set("k", "v");
        assert_eq!(s.get("k"), None);
    }
}
