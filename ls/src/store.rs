//! File-backed storage
//!
//! The whole map is kept in memory and mirrored to a single JSON object on disk.
//! Every mutation re-reads the file under an exclusive lock, applies the change and
//! writes the result through a temp file + rename, so concurrent processes (CLI and
//! TUI) never observe a torn file.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use eyre::{Context, Result};
use fs2::FileExt;
use tracing::{debug, info};

use crate::Storage;

/// Persistent key/value store backed by a JSON file
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl LocalStore {
    /// Default storage file for an application (`<data_local_dir>/<app>/storage.json`)
    pub fn default_path(app_name: &str) -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(app_name)
            .join("storage.json")
    }

    /// Open (or create) the store at `path`
    ///
    /// A missing file is an empty store. A file that is not a JSON object of strings
    /// is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "LocalStore::open: called");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }

        let items = read_items(&path)?;
        info!(path = %path.display(), keys = items.len(), "Opened local store");

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Apply `mutate` to the on-disk map under an exclusive lock and refresh the cache
    fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .context("Failed to open storage lock file")?;
        lock_file.lock_exclusive().context("Failed to lock storage")?;

        let result: Result<()> = (|| {
            let mut items = read_items(&self.path)?;
            mutate(&mut items);
            write_items(&self.path, &items)?;
            *self.items.lock().unwrap_or_else(|e| e.into_inner()) = items;
            Ok(())
        })();

        // Unlock failures are harmless; the lock is dropped with the handle anyway
        let _ = FileExt::unlock(&lock_file);
        result
    }
}

impl Storage for LocalStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        debug!(%key, "LocalStore::set_item: called");
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        debug!(%key, "LocalStore::remove_item: called");
        self.update(|items| {
            items.remove(key);
        })
    }

    fn clear(&self) -> Result<()> {
        debug!("LocalStore::clear: called");
        self.update(|items| items.clear())
    }
}

fn read_items(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        debug!(path = %path.display(), "read_items: no storage file yet");
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).context("Failed to read storage file")?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&content).context(format!("Corrupt storage file {}", path.display()))
}

fn write_items(path: &Path, items: &BTreeMap<String, String>) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let content = serde_json::to_string_pretty(items)?;
    {
        let mut file = File::create(&tmp_path).context("Failed to create temp storage file")?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path).context("Failed to replace storage file")?;

    debug!(path = %path.display(), bytes = content.len(), "write_items: storage written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let store = LocalStore::open(temp.path().join("storage.json")).unwrap();
        assert!(store.get_item("token").is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("storage.json");

        let store = LocalStore::open(&path).unwrap();
        store.set_item("token", "secret-token").unwrap();
        store.set_item("user_id", "42").unwrap();
        drop(store);

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get_item("token").as_deref(), Some("secret-token"));
        assert_eq!(reopened.get_item("user_id").as_deref(), Some("42"));
    }

    #[test]
    fn test_remove_and_clear_persist() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("storage.json");

        let store = LocalStore::open(&path).unwrap();
        store.set_item("token", "t").unwrap();
        store.set_item("user_id", "1").unwrap();
        store.remove_item("token").unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert!(reopened.get_item("token").is_none());
        assert_eq!(reopened.get_item("user_id").as_deref(), Some("1"));

        reopened.clear().unwrap();
        let again = LocalStore::open(&path).unwrap();
        assert!(again.get_item("user_id").is_none());
    }

    #[test]
    fn test_writes_merge_with_other_handles() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("storage.json");

        let a = LocalStore::open(&path).unwrap();
        let b = LocalStore::open(&path).unwrap();
        a.set_item("token", "from-a").unwrap();
        b.set_item("user_id", "from-b").unwrap();

        // b re-read the file before writing, so a's key survived
        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get_item("token").as_deref(), Some("from-a"));
        assert_eq!(reopened.get_item("user_id").as_deref(), Some("from-b"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        assert!(LocalStore::open(&path).is_err());
    }

    #[test]
    fn test_default_path_uses_app_name() {
        let path = LocalStore::default_path("myapp");
        assert!(path.ends_with("myapp/storage.json"));
    }
}
