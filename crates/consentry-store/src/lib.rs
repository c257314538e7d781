//! Consentry Store — key-value storage backends + the consent preference slot.

pub mod file;
pub mod memory;
pub mod preference;
pub mod schema;
pub mod sqlite;
pub mod storage;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use preference::PreferenceStore;
pub use sqlite::SqliteStorage;
pub use storage::KeyValueStorage;
