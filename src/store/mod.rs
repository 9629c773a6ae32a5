//! Key-value persistence seam.
//!
//! The engine owns exactly two keys: the serialized invoice set and the
//! selected-invoice id. Values are strings, matching the browser-storage
//! contract the dashboard persisted through originally.

use crate::error::Result;

pub mod memory;

pub use memory::InMemoryStore;

/// Trait for key-value store implementations.
///
/// Abstracts the persistence layer so the repository can run against browser
/// storage bridges, files, or the in-memory default interchangeably.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow concurrent access.
/// Implementations should use interior mutability (DashMap, RwLock, or external storage).
///
/// **ASYNC:** All methods are async and must be awaited.
#[allow(async_fn_in_trait)]
pub trait StateStore: Send + Sync + Clone {
    /// Retrieve the value stored under `key`.
    ///
    /// # Returns
    /// - `Ok(Some(value))` - Key present
    /// - `Ok(None)` - Key absent
    ///
    /// # Errors
    /// Returns `Err` if the underlying store fails.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `Err` if the underlying store fails (e.g. quota exhausted).
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Check whether `key` is present (optional optimization).
    ///
    /// # Errors
    /// Returns `Err` if the underlying store fails.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
