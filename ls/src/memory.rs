//! In-process storage with no persistence

use std::collections::BTreeMap;
use std::sync::Mutex;

use eyre::Result;
use tracing::debug;

use crate::Storage;

/// Storage that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `items`
    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let items = items.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self {
            items: Mutex::new(items),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A poisoned map is still a valid map
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Storage for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        debug!(%key, "MemoryStore::set_item: called");
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        debug!(%key, "MemoryStore::remove_item: called");
        self.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        debug!("MemoryStore::clear: called");
        self.lock().clear();
        Ok(())
    }
}
