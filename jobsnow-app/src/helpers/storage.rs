use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Durable string key/value store for client-side preferences, backed by a
/// JSON file. Every write is flushed to disk immediately.
pub struct ClientStorage {
    path: Option<PathBuf>,
    items: RwLock<HashMap<String, String>>,
}

impl ClientStorage {
    /// Returns the path to the storage file
    ///
    /// - **macOS**: `~/Library/Application Support/jobsnow/storage.json`
    /// - **Linux**: `~/.local/share/jobsnow/storage.json`
    /// - **Windows**: `%LOCALAPPDATA%\jobsnow\storage.json`
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;
        Ok(data_dir.join("jobsnow").join("storage.json"))
    }

    pub fn open(path: &Path) -> Result<Self> {
        let items = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read storage file {}", path.display()))?;
            match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt storage file {}: {}", path.display(), e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            items: RwLock::new(items),
        })
    }

    /// Storage that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            path: None,
            items: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }

    fn flush(&self, items: &HashMap<String, String>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(items)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write storage file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = ClientStorage::open(&path).unwrap();
        storage.set_item("language", "ja").unwrap();
        storage.set_item("other", "value").unwrap();
        storage.remove_item("other").unwrap();

        let reopened = ClientStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("language").as_deref(), Some("ja"));
        assert_eq!(reopened.get_item("other"), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = ClientStorage::open(&path).unwrap();
        assert_eq!(storage.get_item("language"), None);
    }
}
