//! Database schema SQL for the SQLite consent backend.

/// Key-value table holding one row per consent slot.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
