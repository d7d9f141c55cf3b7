//! Persisted table layout preferences.
//!
//! The task table reads and writes its column order through the
//! [`LayoutStore`] trait, so tests can inject an in-memory fake and the
//! table never touches the filesystem directly. Persistence is best-effort:
//! a store that cannot read or write simply behaves as if empty.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Key for the fixed-column order entry (JSON array of column codes).
pub const COLUMN_ORDER_KEY: &str = "task_table.columns";
/// Key for the custom-field column order entry (JSON array of field ids).
pub const CUSTOM_FIELD_ORDER_KEY: &str = "task_table.custom_field_columns";

pub trait LayoutStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// File-backed store under the user config directory. Entries are read once
/// at construction and flushed on every write; two concurrent processes
/// last-write-win.
#[derive(Debug, Default)]
pub struct FileLayoutStore {
    path: Option<PathBuf>,
    entries: HashMap<String, String>,
}

impl FileLayoutStore {
    fn layout_path() -> Option<PathBuf> {
        let config_dir = dirs::config_dir()?.join("encore");
        fs::create_dir_all(&config_dir).ok()?;
        Some(config_dir.join("layout.json"))
    }

    pub fn load() -> Self {
        let path = Self::layout_path();

        let entries = path
            .as_deref()
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|contents| serde_json::from_str::<HashMap<String, String>>(&contents).ok())
            .unwrap_or_default();

        Self { path, entries }
    }

    fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };

        match serde_json::to_string_pretty(&self.entries) {
            Ok(contents) => {
                if let Err(e) = fs::write(path, contents) {
                    tracing::warn!("failed to persist layout: {}", e);
                }
            }
            Err(e) => tracing::warn!("failed to serialize layout: {}", e),
        }
    }
}

impl LayoutStore for FileLayoutStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        self.flush();
    }
}

/// In-memory store for tests and headless use.
#[derive(Debug, Default, Clone)]
pub struct MemoryLayoutStore {
    entries: HashMap<String, String>,
}

impl LayoutStore for MemoryLayoutStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryLayoutStore::default();
        assert_eq!(store.get(COLUMN_ORDER_KEY), None);

        store.set(COLUMN_ORDER_KEY, "[\"task\"]".to_string());
        assert_eq!(store.get(COLUMN_ORDER_KEY).as_deref(), Some("[\"task\"]"));
    }
}
