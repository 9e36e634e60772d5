//! LocalStore - persistent string key/value storage
//!
//! A small `localStorage`-style store for client state that must survive restarts
//! (bearer tokens, user ids). Values are plain strings keyed by plain strings.
//!
//! # Architecture
//!
//! ```text
//! ~/.local/share/<app>/
//! ├── storage.json        # {"token": "...", "user_id": "..."}
//! └── storage.json.lock   # fs2 advisory lock held during writes
//! ```
//!
//! # Example
//!
//! ```ignore
//! use localstore::{LocalStore, Storage};
//!
//! let store = LocalStore::open(LocalStore::default_path("pathfinder"))?;
//! store.set_item("token", "abc123")?;
//! assert_eq!(store.get_item("token").as_deref(), Some("abc123"));
//! ```

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::LocalStore;

use eyre::Result;

/// Synchronous string key/value storage
///
/// All receivers are `&self`; implementations use interior mutability so a single
/// store can be shared behind an `Arc` by every component that needs it.
pub trait Storage: Send + Sync {
    /// Get the value stored under `key`
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` (no-op if absent)
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Remove every key
    fn clear(&self) -> Result<()>;

    /// Check whether `key` is present
    fn contains(&self, key: &str) -> bool {
        self.get_item(key).is_some()
    }
}
