//! Admin commands — inspect or clear a visitor's stored consent.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use consentry_core::{ConsentConfig, ConsentRecord, PreferenceSet, SystemClock};
use consentry_protocol::{ConsentEngine, ExpirationPolicy, SyncBridge, TracingSink};
use consentry_store::{PreferenceStore, SqliteStorage};

use crate::state::is_valid_visitor_id;

/// What is on file for one visitor.
#[derive(Debug, Serialize)]
pub struct ConsentReport {
    pub visitor_id: String,
    pub record: Option<ConsentRecord>,
    pub expired: bool,
    pub expires_at: Option<String>,
    pub effective: PreferenceSet,
}

/// Summary of the whole database.
#[derive(Debug, Serialize)]
pub struct StorageReport {
    pub db_path: String,
    pub stored_records: i64,
}

fn engine_for(config: &ConsentConfig, storage: &SqliteStorage, visitor_id: &str) -> ConsentEngine {
    let policy = &config.policy;
    ConsentEngine::new(
        PreferenceStore::new(Arc::new(storage.scoped(visitor_id)), policy.storage_key.clone()),
        Arc::new(SyncBridge::new(Arc::new(TracingSink))),
        Arc::new(SystemClock),
        policy,
    )
}

fn check_visitor_id(visitor_id: &str) -> anyhow::Result<()> {
    if !is_valid_visitor_id(visitor_id) {
        anyhow::bail!("Invalid visitor id: {:?}", visitor_id);
    }
    Ok(())
}

pub fn open_storage(data_dir: &Path) -> anyhow::Result<(ConsentConfig, SqliteStorage)> {
    let config = ConsentConfig::from_env(data_dir)?;
    let storage = SqliteStorage::open(&config.data_paths.consent_db)?;
    Ok((config, storage))
}

pub fn storage_report(storage: &SqliteStorage) -> anyhow::Result<StorageReport> {
    Ok(StorageReport {
        db_path: storage.db_path().display().to_string(),
        stored_records: storage.count_all()?,
    })
}

/// Report a visitor's stored consent. Does not modify anything.
pub fn visitor_report(
    config: &ConsentConfig,
    storage: &SqliteStorage,
    visitor_id: &str,
) -> anyhow::Result<ConsentReport> {
    check_visitor_id(visitor_id)?;
    let engine = engine_for(config, storage, visitor_id);
    let record = engine.store().read();
    let expiry = ExpirationPolicy::new(config.policy.max_age_years);
    let expired = expiry.is_expired(record.as_ref(), chrono::Utc::now());

    Ok(ConsentReport {
        visitor_id: visitor_id.to_string(),
        expires_at: record.as_ref().map(|r| expiry.expires_at(r).to_rfc3339()),
        expired,
        record,
        effective: engine.effective_preferences(),
    })
}

/// Withdraw a visitor's consent. Returns whether a record was removed.
pub fn clear_visitor(
    config: &ConsentConfig,
    storage: &SqliteStorage,
    visitor_id: &str,
) -> anyhow::Result<bool> {
    check_visitor_id(visitor_id)?;
    let engine = engine_for(config, storage, visitor_id);
    let existed = engine.store().read().is_some();
    Ok(engine.reset() && existed)
}

pub fn print_report<T: Serialize>(report: &T) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render report: {}", e),
    }
}
