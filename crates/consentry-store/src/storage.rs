//! Storage backend trait.

use consentry_core::Result;

/// String key-value storage, the durable half of the preference store.
///
/// Backends store raw strings; encoding the consent record is the
/// [`PreferenceStore`](crate::PreferenceStore)'s job. `set` must replace the
/// whole value or leave the old one in place.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Short backend name for status reporting.
    fn backend_name(&self) -> &'static str;
}
